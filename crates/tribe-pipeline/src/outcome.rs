//! Step & Pipeline Outcomes
//!
//! A step either lets the request continue, terminates it with a
//! redirect, or fails fatally. Redirects are control flow here, not
//! errors: tenant canonicalization is the only permanent one, every
//! gating redirect is temporary.

use serde::{Deserialize, Serialize};
use tribe_common::GateError;

/// HTTP status a redirect should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectStatus {
    /// 301, domain canonicalization only
    MovedPermanently,
    /// 302, all gating redirects
    Found,
}

impl RedirectStatus {
    /// Numeric status code
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::MovedPermanently => 301,
            Self::Found => 302,
        }
    }
}

/// Where a terminated request is sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectTarget {
    /// Absolute or relative URL computed by the step
    Url(String),
    /// First-tenant creation page (empty installation)
    CreateTenant,
    /// No tenant matched the host
    TenantNotFound,
    /// Banned-member landing page
    BannedAccess,
    /// Join form of the current tenant
    JoinTenant,
    /// Login page
    Login,
    /// Confirmation-pending announcement page
    ConfirmationPending,
    /// Root of the current tenant
    TenantRoot,
}

impl RedirectTarget {
    /// Application path for the target
    pub fn path(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::CreateTenant => "/communities/new",
            Self::TenantNotFound => "/not_found",
            Self::BannedAccess => "/community_memberships/access_denied",
            Self::JoinTenant => "/community_memberships/new",
            Self::Login => "/login",
            Self::ConfirmationPending => "/sessions/confirmation_pending",
            Self::TenantRoot => "/",
        }
    }
}

/// A terminal pipeline exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Destination
    pub target: RedirectTarget,
    /// Status to respond with
    pub status: RedirectStatus,
}

impl Redirect {
    /// Temporary redirect (302)
    pub fn found(target: RedirectTarget) -> Self {
        Self {
            target,
            status: RedirectStatus::Found,
        }
    }

    /// Permanent redirect (301)
    pub fn permanent(target: RedirectTarget) -> Self {
        Self {
            target,
            status: RedirectStatus::MovedPermanently,
        }
    }
}

/// What one step decided
#[derive(Debug)]
pub enum StepOutcome {
    /// Proceed to the next step
    Continue,
    /// Stop the pipeline and respond with the redirect
    Terminate(Redirect),
    /// Stop the pipeline; the request must not reach the handler
    Fatal(GateError),
}

/// What the whole pipeline decided
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Context is ready for the business handler
    Proceed,
    /// Respond with the redirect, context must not reach the handler
    Redirect(Redirect),
    /// 5xx-class response after a fatal error
    ServerError(GateError),
}
