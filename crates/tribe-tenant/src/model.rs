//! Tenant Data Model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Tenant ID
pub type TenantId = Uuid;

/// A community: the multi-tenant organizational unit owning a domain,
/// an ident, a locale set and a membership roster.
///
/// Immutable for the duration of a request; read from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant ID
    pub tenant_id: TenantId,
    /// Slug identifier, derived from a subdomain-style host prefix
    pub ident: String,
    /// Registered domains. The first one, when present, is canonical.
    pub domains: Vec<String>,
    /// Locales this tenant supports
    pub locales: Vec<String>,
    /// Locale used when neither the user nor the request picks one
    pub default_locale: String,
    /// Only organization accounts may log in
    pub only_organizations: bool,
    /// Per-locale customization records
    pub customizations: HashMap<String, Customization>,
}

impl Tenant {
    /// Create new tenant with the given ident
    pub fn new(ident: &str, default_locale: &str) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            ident: ident.to_string(),
            domains: Vec::new(),
            locales: vec![default_locale.to_string()],
            default_locale: default_locale.to_string(),
            only_organizations: false,
            customizations: HashMap::new(),
        }
    }

    /// Register a domain (first registered becomes canonical)
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domains.push(domain.to_string());
        self
    }

    /// Replace the supported locale set
    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = locales;
        self
    }

    /// Restrict the tenant to organization accounts
    pub fn organizations_only(mut self) -> Self {
        self.only_organizations = true;
        self
    }

    /// Attach a customization record for one locale
    pub fn with_customization(mut self, customization: Customization) -> Self {
        self.customizations
            .insert(customization.locale.clone(), customization);
        self
    }

    /// Canonical domain, when one is registered
    pub fn canonical_domain(&self) -> Option<&str> {
        self.domains.first().map(String::as_str)
    }

    /// Host the tenant is reachable under: canonical domain if set,
    /// otherwise `{ident}.{root_domain}`
    pub fn full_domain(&self, root_domain: &str) -> String {
        match self.canonical_domain() {
            Some(domain) => domain.to_string(),
            None => format!("{}.{}", self.ident, root_domain),
        }
    }

    /// Whether this tenant supports the given locale
    pub fn supports_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }

    /// Customization record for the given locale
    pub fn customization_for(&self, locale: &str) -> Option<&Customization> {
        self.customizations.get(locale)
    }
}

/// Locale-specific presentation overrides for a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customization {
    /// Locale this record applies to
    pub locale: String,
    /// Display name shown in that locale
    pub name: String,
    /// Optional slogan
    pub slogan: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

impl Customization {
    /// Create a customization record for one locale
    pub fn new(locale: &str, name: &str) -> Self {
        Self {
            locale: locale.to_string(),
            name: name.to_string(),
            slogan: None,
            description: None,
        }
    }
}
