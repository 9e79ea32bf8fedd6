//! Tenant Directory
//!
//! Read-mostly registry of tenants, refreshed out-of-band. The pipeline
//! only reads from it, so implementations must be cheap to query
//! concurrently.

use crate::model::Tenant;
use parking_lot::RwLock;
use std::sync::Arc;

/// Directory of all tenants known to the installation
pub trait TenantDirectory: Send + Sync {
    /// Tenant owning the given domain, if any
    fn find_by_domain(&self, domain: &str) -> Option<Tenant>;

    /// Tenant with the given ident, if any
    fn find_by_ident(&self, ident: &str) -> Option<Tenant>;

    /// Total number of tenants
    fn count(&self) -> usize;

    /// First tenant in the directory (used for singleton installations)
    fn first(&self) -> Option<Tenant>;
}

/// In-memory tenant directory
pub struct InMemoryDirectory {
    tenants: Arc<RwLock<Vec<Tenant>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            tenants: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a directory pre-populated with the given tenants
    pub fn with_tenants(tenants: Vec<Tenant>) -> Self {
        Self {
            tenants: Arc::new(RwLock::new(tenants)),
        }
    }

    /// Register a tenant
    pub fn insert(&self, tenant: Tenant) {
        self.tenants.write().push(tenant);
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory for InMemoryDirectory {
    fn find_by_domain(&self, domain: &str) -> Option<Tenant> {
        self.tenants
            .read()
            .iter()
            .find(|t| t.domains.iter().any(|d| d == domain))
            .cloned()
    }

    fn find_by_ident(&self, ident: &str) -> Option<Tenant> {
        self.tenants.read().iter().find(|t| t.ident == ident).cloned()
    }

    fn count(&self) -> usize {
        self.tenants.read().len()
    }

    fn first(&self) -> Option<Tenant> {
        self.tenants.read().first().cloned()
    }
}
