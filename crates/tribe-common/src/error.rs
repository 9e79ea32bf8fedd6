//! Error types for OpenTribe

use thiserror::Error;

/// OpenTribe gating error type
#[derive(Error, Debug)]
pub enum GateError {
    /// Negotiated locale is missing from the global allowed list.
    /// This is a configuration fault and the request must not proceed.
    #[error("locale {0} not available, check the tenant settings")]
    LocaleNotAvailable(String),

    /// Translation service failed while loading a tenant bundle
    #[error("translation fetch failed for tenant {tenant}: {reason}")]
    TranslationFetch {
        /// Tenant whose bundle was being loaded
        tenant: String,
        /// Collaborator-reported reason
        reason: String,
    },

    /// Identity service failed for a reason other than an expired session
    #[error("identity service error: {0}")]
    IdentityService(String),

    /// Configuration error
    #[error("config error: {0}")]
    ConfigError(String),
}

/// Result type for OpenTribe
pub type GateResult<T> = Result<T, GateError>;
