//! User & Membership Data Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tribe_tenant::TenantId;
use uuid::Uuid;

/// User ID
pub type UserId = Uuid;

/// A platform account as the pipeline sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub user_id: UserId,
    /// Stored locale preference
    pub locale: Option<String>,
    /// Platform-wide administrator
    pub admin: bool,
    /// Organization account (eligible for exclusivity-restricted tenants)
    pub organization: bool,
    /// Tenants this user is banned in
    pub banned_in: HashSet<TenantId>,
    /// Tenants with an outstanding required email confirmation
    pub pending_confirmation_in: HashSet<TenantId>,
    /// Tenants this user administers
    pub admin_rights_in: HashSet<TenantId>,
}

impl User {
    /// Create a plain user
    pub fn new() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            locale: None,
            admin: false,
            organization: false,
            banned_in: HashSet::new(),
            pending_confirmation_in: HashSet::new(),
            admin_rights_in: HashSet::new(),
        }
    }

    /// Set the stored locale preference
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    /// Grant the platform admin flag
    pub fn as_admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// Mark as an organization account
    pub fn as_organization(mut self) -> Self {
        self.organization = true;
        self
    }

    /// Record a ban in the given tenant
    pub fn banned_in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.banned_in.insert(tenant_id);
        self
    }

    /// Record a pending required confirmation for the given tenant
    pub fn pending_confirmation(mut self, tenant_id: TenantId) -> Self {
        self.pending_confirmation_in.insert(tenant_id);
        self
    }

    /// Grant admin rights inside the given tenant
    pub fn admin_of(mut self, tenant_id: TenantId) -> Self {
        self.admin_rights_in.insert(tenant_id);
        self
    }

    /// Whether the user is banned in the tenant
    pub fn is_banned_in(&self, tenant_id: &TenantId) -> bool {
        self.banned_in.contains(tenant_id)
    }

    /// Whether joining this tenant still requires an email confirmation
    pub fn pending_email_confirmation_in(&self, tenant_id: &TenantId) -> bool {
        self.pending_confirmation_in.contains(tenant_id)
    }

    /// Platform admins administer every tenant; others need the
    /// per-tenant grant
    pub fn has_admin_rights_in(&self, tenant_id: &TenantId) -> bool {
        self.admin || self.admin_rights_in.contains(tenant_id)
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership acceptance state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    /// Join request not yet accepted
    Pending,
    /// Full member
    Accepted,
}

/// The (user, tenant) relationship record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub membership_id: Uuid,
    /// Member
    pub user_id: UserId,
    /// Tenant
    pub tenant_id: TenantId,
    /// Acceptance state
    pub status: MembershipStatus,
    /// Date of the last recorded page load, updated out-of-band
    pub last_page_load: Option<NaiveDate>,
}

impl Membership {
    /// Create an accepted membership
    pub fn accepted(user_id: UserId, tenant_id: TenantId) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            user_id,
            tenant_id,
            status: MembershipStatus::Accepted,
            last_page_load: None,
        }
    }

    /// Whether the membership is accepted
    pub fn is_accepted(&self) -> bool {
        self.status == MembershipStatus::Accepted
    }
}
