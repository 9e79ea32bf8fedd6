//! Locale Negotiation & Translation Bundles
//!
//! Negotiation precedence, first supported wins: user preference, then
//! the explicit `locale` request parameter, then the tenant default.
//! The winner must be in the global allowed-locale list; a miss is a
//! fatal configuration error, never a silent fallback.
//!
//! Tenant translation overrides are fetched once per process (or after
//! explicit invalidation) and cached as a merged [`LocaleBundle`].

use crate::model::{Tenant, TenantId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tribe_common::{GateError, GateResult};

/// Flat translation tables: locale → key → translated string.
/// Keys are opaque paths; dots inside them carry no structure here.
pub type TranslationTables = HashMap<String, HashMap<String, String>>;

/// Source of tenant-specific translation overrides
pub trait TranslationService: Send + Sync {
    /// Overrides for one tenant, keyed by locale then flat key
    fn translations_for(&self, tenant_id: TenantId) -> GateResult<TranslationTables>;
}

/// Merged translation table for one tenant
#[derive(Debug, Clone)]
pub struct LocaleBundle {
    /// Tenant the bundle belongs to
    pub tenant_id: TenantId,
    tables: TranslationTables,
}

impl LocaleBundle {
    /// Translated string for (locale, key), if the tenant overrides it
    pub fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.tables.get(locale)?.get(key).map(String::as_str)
    }

    /// Locales the bundle carries overrides for
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// Process-wide cache of tenant bundles, lazily populated.
///
/// Bundles are merged off-lock and inserted as a whole `Arc`, so
/// concurrent readers never observe a partially-merged table.
pub struct BundleCache {
    bundles: DashMap<TenantId, Arc<LocaleBundle>>,
}

impl BundleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            bundles: DashMap::new(),
        }
    }

    /// Cached bundle for the tenant, fetching and merging on first use
    pub fn get_or_fetch(
        &self,
        tenant_id: TenantId,
        service: &dyn TranslationService,
    ) -> GateResult<Arc<LocaleBundle>> {
        if let Some(bundle) = self.bundles.get(&tenant_id) {
            return Ok(Arc::clone(&bundle));
        }

        let bundle = Arc::new(Self::build(tenant_id, service)?);
        self.bundles.insert(tenant_id, Arc::clone(&bundle));
        tracing::debug!(tenant = %tenant_id, "locale bundle cached");
        Ok(bundle)
    }

    /// Drop the cached bundle so the next negotiation re-fetches it
    pub fn invalidate(&self, tenant_id: TenantId) {
        self.bundles.remove(&tenant_id);
    }

    /// Re-fetch the bundle unconditionally (translation test servers)
    pub fn refresh(
        &self,
        tenant_id: TenantId,
        service: &dyn TranslationService,
    ) -> GateResult<Arc<LocaleBundle>> {
        let bundle = Arc::new(Self::build(tenant_id, service)?);
        self.bundles.insert(tenant_id, Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Whether a bundle is cached for the tenant
    pub fn contains(&self, tenant_id: TenantId) -> bool {
        self.bundles.contains_key(&tenant_id)
    }

    fn build(tenant_id: TenantId, service: &dyn TranslationService) -> GateResult<LocaleBundle> {
        let tables = service.translations_for(tenant_id)?;
        Ok(LocaleBundle { tenant_id, tables })
    }
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Static in-memory translation source
pub struct StaticTranslations {
    tables: HashMap<TenantId, TranslationTables>,
}

impl StaticTranslations {
    /// Create an empty source
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Register one override
    pub fn insert(&mut self, tenant_id: TenantId, locale: &str, key: &str, value: &str) {
        self.tables
            .entry(tenant_id)
            .or_default()
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}

impl Default for StaticTranslations {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationService for StaticTranslations {
    fn translations_for(&self, tenant_id: TenantId) -> GateResult<TranslationTables> {
        Ok(self.tables.get(&tenant_id).cloned().unwrap_or_default())
    }
}

/// Pick a locale, first non-empty and tenant-supported wins:
/// user preference, then request parameter, then tenant default.
pub fn select_locale(
    user_locale: Option<&str>,
    param_locale: Option<&str>,
    tenant_locales: &[String],
    tenant_default: &str,
) -> String {
    let supported = |locale: &&str| tenant_locales.iter().any(|l| l == *locale);

    let user = user_locale.filter(supported);
    let param = param_locale.filter(supported);

    user.or(param).unwrap_or(tenant_default).to_string()
}

/// Negotiate the working locale and validate it against the global
/// allowed list. A tenant-less request negotiates against an empty
/// locale set with an `en` default.
pub fn negotiate(
    user_locale: Option<&str>,
    param_locale: Option<&str>,
    tenant: Option<&Tenant>,
    available_locales: &[String],
) -> GateResult<String> {
    let empty: Vec<String> = Vec::new();
    let (tenant_locales, tenant_default) = match tenant {
        Some(t) => (&t.locales, t.default_locale.as_str()),
        None => (&empty, "en"),
    };

    let locale = select_locale(user_locale, param_locale, tenant_locales, tenant_default);

    if !available_locales.iter().any(|l| *l == locale) {
        return Err(GateError::LocaleNotAvailable(locale));
    }

    Ok(locale)
}
