//! External Collaborator Interfaces
//!
//! The pipeline consumes identity, membership, billing and alerting
//! through narrow traits. In-memory implementations ship alongside for
//! hosts that embed everything in one process and for tests.

use crate::model::{Membership, User, UserId};
use chrono::{NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tribe_tenant::TenantId;
use uuid::Uuid;

/// Failures reported by the identity collaborator
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The current session is no longer authorized upstream.
    /// Recovered by the pipeline, never surfaced as a crash.
    #[error("session unauthorized upstream")]
    Unauthorized,
    /// Any other collaborator failure
    #[error("identity service failure: {0}")]
    Other(String),
}

/// Identity exchange and lookup
pub trait IdentityService: Send + Sync {
    /// Exchange a one-time login token for a user id, consuming it.
    /// `None` means the token is unknown or already used.
    fn consume_login_token(&self, token: &str) -> Result<Option<UserId>, IdentityError>;

    /// Look up a user by id for an authenticated session
    fn find_user(&self, user_id: &UserId) -> Result<Option<User>, IdentityError>;
}

/// Membership lookup plus fire-and-forget page-load recording
pub trait MembershipReader: Send + Sync {
    /// Accepted membership of the user in the tenant, if any
    fn find_accepted(&self, user_id: &UserId, tenant_id: &TenantId) -> Option<Membership>;

    /// Record a page load out-of-band. Never blocks the request on
    /// success or failure.
    fn record_page_load(&self, membership_id: Uuid, host: &str);
}

/// Plan and billing facts, consumed but never computed here
pub trait PlanInfoProvider: Send + Sync {
    /// Whether the tenant's plan has expired
    fn is_plan_expired(&self, tenant_id: &TenantId) -> bool;

    /// Whether the user has open listings missing payment details
    fn has_missing_payment_info(&self, user_id: &UserId, tenant_id: &TenantId) -> bool;
}

/// Operator-facing alert sink
pub trait NotificationSink: Send + Sync {
    /// Deliver an alert with free-form context
    fn notify(&self, subject: &str, message: &str, context: serde_json::Value);
}

// =============================================================================
// In-memory implementations
// =============================================================================

#[derive(Default)]
struct IdentityState {
    users: HashMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    revoked: HashSet<UserId>,
}

/// In-memory identity service
#[derive(Default)]
pub struct MemoryIdentity {
    state: RwLock<IdentityState>,
}

impl MemoryIdentity {
    /// Create an empty identity store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user
    pub fn add_user(&self, user: User) {
        self.state.write().users.insert(user.user_id, user);
    }

    /// Issue a one-time login token for the user
    pub fn issue_token(&self, token: &str, user_id: UserId) {
        self.state.write().tokens.insert(token.to_string(), user_id);
    }

    /// Invalidate every session of the user upstream. Subsequent
    /// lookups report [`IdentityError::Unauthorized`].
    pub fn revoke_sessions(&self, user_id: UserId) {
        self.state.write().revoked.insert(user_id);
    }
}

impl IdentityService for MemoryIdentity {
    fn consume_login_token(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        // Removal makes the token single-use
        Ok(self.state.write().tokens.remove(token))
    }

    fn find_user(&self, user_id: &UserId) -> Result<Option<User>, IdentityError> {
        let state = self.state.read();
        if state.revoked.contains(user_id) {
            return Err(IdentityError::Unauthorized);
        }
        Ok(state.users.get(user_id).cloned())
    }
}

/// In-memory membership store
#[derive(Default)]
pub struct MemoryMemberships {
    memberships: RwLock<Vec<Membership>>,
    page_loads: Mutex<Vec<(Uuid, String, NaiveDate)>>,
}

impl MemoryMemberships {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a membership
    pub fn add(&self, membership: Membership) {
        self.memberships.write().push(membership);
    }

    /// Page loads recorded so far (membership id, host, date)
    pub fn recorded_page_loads(&self) -> Vec<(Uuid, String, NaiveDate)> {
        self.page_loads.lock().clone()
    }
}

impl MembershipReader for MemoryMemberships {
    fn find_accepted(&self, user_id: &UserId, tenant_id: &TenantId) -> Option<Membership> {
        self.memberships
            .read()
            .iter()
            .find(|m| m.user_id == *user_id && m.tenant_id == *tenant_id && m.is_accepted())
            .cloned()
    }

    fn record_page_load(&self, membership_id: Uuid, host: &str) {
        let today = Utc::now().date_naive();
        self.page_loads
            .lock()
            .push((membership_id, host.to_string(), today));
        // The store's own last_page_load is refreshed by the recording
        // job, kept in sync here so repeat requests skip the record.
        let mut memberships = self.memberships.write();
        if let Some(m) = memberships
            .iter_mut()
            .find(|m| m.membership_id == membership_id)
        {
            m.last_page_load = Some(today);
        }
    }
}

/// Static plan info
#[derive(Default)]
pub struct StaticPlanInfo {
    expired: RwLock<HashSet<TenantId>>,
    missing_payment: RwLock<HashSet<(UserId, TenantId)>>,
}

impl StaticPlanInfo {
    /// Everything current, nothing missing
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a tenant's plan as expired
    pub fn expire(&self, tenant_id: TenantId) {
        self.expired.write().insert(tenant_id);
    }

    /// Mark a user as missing payment details in a tenant
    pub fn mark_missing_payment(&self, user_id: UserId, tenant_id: TenantId) {
        self.missing_payment.write().insert((user_id, tenant_id));
    }
}

impl PlanInfoProvider for StaticPlanInfo {
    fn is_plan_expired(&self, tenant_id: &TenantId) -> bool {
        self.expired.read().contains(tenant_id)
    }

    fn has_missing_payment_info(&self, user_id: &UserId, tenant_id: &TenantId) -> bool {
        self.missing_payment.read().contains(&(*user_id, *tenant_id))
    }
}

/// Alert captured by [`MemorySink`]
#[derive(Debug, Clone)]
pub struct CapturedAlert {
    /// Alert subject line
    pub subject: String,
    /// Alert body
    pub message: String,
    /// Free-form context attached by the caller
    pub context: serde_json::Value,
}

/// In-memory notification sink
#[derive(Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<CapturedAlert>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts delivered so far
    pub fn alerts(&self) -> Vec<CapturedAlert> {
        self.alerts.lock().clone()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, subject: &str, message: &str, context: serde_json::Value) {
        tracing::warn!(subject = %subject, "operator alert");
        self.alerts.lock().push(CapturedAlert {
            subject: subject.to_string(),
            message: message.to_string(),
            context,
        });
    }
}
