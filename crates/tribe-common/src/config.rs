//! Platform configuration shared by the request pipeline.

use serde::{Deserialize, Serialize};

/// Platform-wide configuration consumed by the preprocessing pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root domain of the platform (tenant idents hang below it)
    pub root_domain: String,
    /// Redirect every plain-HTTP request to HTTPS
    pub always_use_ssl: bool,
    /// Token expected in the Via header when traffic comes through the
    /// platform proxy (such requests are already terminated upstream)
    pub proxy_via_token: String,
    /// Locales the installation ships translations for
    pub available_locales: Vec<String>,
    /// Optional override target used when no tenant matches the host
    pub tenant_not_found_redirect: Option<String>,
    /// Re-fetch tenant translations on every request.
    /// Only useful on translation test servers.
    pub refresh_translations_per_request: bool,
    /// Promotional plan pricing surfaced to views
    pub plan_pricing: PlanPricing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_domain: "opentribe.test".to_string(),
            always_use_ssl: false,
            proxy_via_token: "tribe_proxy".to_string(),
            available_locales: vec!["en".to_string()],
            tenant_not_found_redirect: None,
            refresh_translations_per_request: false,
            plan_pricing: PlanPricing::default(),
        }
    }
}

impl AppConfig {
    /// Root domain with any `:port` suffix removed.
    /// Ident matching must work against the bare host.
    pub fn root_domain_without_port(&self) -> &str {
        match self.root_domain.split_once(':') {
            Some((host, _port)) => host,
            None => &self.root_domain,
        }
    }
}

/// Promotional pricing snapshot for the paid plans
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanPricing {
    /// Checkout link for the monthly pro plan
    pub pro_monthly_link: Option<String>,
    /// Displayed monthly price
    pub pro_monthly_price: Option<String>,
    /// Checkout link for the biannual pro plan
    pub pro_biannual_link: Option<String>,
    /// Displayed biannual price
    pub pro_biannual_price: Option<String>,
}
