//! OpenTribe Tenant - tenant directory, host resolution and locale negotiation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     TENANT RESOLUTION                        │
//! │                                                              │
//! │   request host ──► by-domain ──► by-ident ──► singleton     │
//! │                      │             │             │           │
//! │                      └──── first match wins ─────┘           │
//! │                                                              │
//! │  ┌────────────────────┐      ┌─────────────────────────┐    │
//! │  │  TENANT DIRECTORY  │      │   LOCALE NEGOTIATION    │    │
//! │  │  read-mostly store │      │ user ► param ► default  │    │
//! │  └────────────────────┘      └────────────┬────────────┘    │
//! │                                           │                  │
//! │                              ┌────────────▼────────────┐    │
//! │                              │  BUNDLE CACHE (per      │    │
//! │                              │  tenant, copy-on-write) │    │
//! │                              └─────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod locale;
pub mod model;
pub mod resolver;

pub use directory::{InMemoryDirectory, TenantDirectory};
pub use locale::{BundleCache, LocaleBundle, StaticTranslations, TranslationService};
pub use model::{Customization, Tenant, TenantId};
pub use resolver::UnresolvedHost;
