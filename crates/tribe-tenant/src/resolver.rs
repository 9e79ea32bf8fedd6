//! Host → Tenant Resolution
//!
//! The ladder is an ordered list of strategies, first match wins:
//!
//! 1. Exact match of the request host against a registered domain
//! 2. Strip `.{root domain}` from the host and match the remaining ident
//! 3. If the directory holds exactly one tenant, use it unconditionally
//!
//! A fixed (host, directory snapshot) pair always resolves to the same
//! tenant, so the ladder can run on every request without coordination.

use crate::directory::TenantDirectory;
use crate::model::Tenant;

/// One rung of the resolution ladder
type Strategy = fn(&dyn TenantDirectory, &str, &str) -> Option<Tenant>;

/// Ordered resolution strategies. Order is load-bearing: domain beats
/// ident beats singleton.
const STRATEGIES: [Strategy; 3] = [by_domain, by_ident, singleton];

/// Where an unresolved host should be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedHost {
    /// Installation has no tenants yet: offer to create the first one
    CreateTenant,
    /// Tenants exist but none matches this host
    NotFound,
    /// Operator-configured override target
    Redirect(String),
}

/// Resolve the tenant owning `host`, walking the strategy ladder
pub fn resolve(directory: &dyn TenantDirectory, root_domain: &str, host: &str) -> Option<Tenant> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(directory, root_domain, host))
}

/// Decide where to send a request whose host resolved to no tenant
pub fn unresolved_target(
    directory: &dyn TenantDirectory,
    override_redirect: Option<&str>,
) -> UnresolvedHost {
    if let Some(url) = override_redirect {
        return UnresolvedHost::Redirect(url.to_string());
    }
    if directory.count() == 0 {
        UnresolvedHost::CreateTenant
    } else {
        UnresolvedHost::NotFound
    }
}

/// Canonical domain to permanently redirect to, when the tenant declares
/// one and the request arrived on a different host
pub fn canonical_redirect_domain<'a>(tenant: &'a Tenant, host: &str) -> Option<&'a str> {
    match tenant.canonical_domain() {
        Some(domain) if domain != host => Some(domain),
        _ => None,
    }
}

fn by_domain(directory: &dyn TenantDirectory, _root_domain: &str, host: &str) -> Option<Tenant> {
    directory.find_by_domain(host)
}

fn by_ident(directory: &dyn TenantDirectory, root_domain: &str, host: &str) -> Option<Tenant> {
    let suffix = format!(".{root_domain}");
    let ident = host.strip_suffix(&suffix)?;
    directory.find_by_ident(ident)
}

fn singleton(directory: &dyn TenantDirectory, _root_domain: &str, _host: &str) -> Option<Tenant> {
    if directory.count() == 1 {
        directory.first()
    } else {
        None
    }
}
