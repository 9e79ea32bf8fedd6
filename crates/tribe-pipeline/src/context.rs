//! Request-Scoped Context
//!
//! Everything a request accumulates while walking the pipeline lives on
//! [`RequestContext`], owned exclusively by that request. Values that
//! older designs kept in ambient globals (correlation id, outbound mail
//! target) are fields here instead, so interleaved requests cannot leak
//! into each other.

use crate::event::CorrelationId;
use crate::model::{Membership, User};
use crate::session::FlashMessage;
use serde::{Deserialize, Serialize};
use tribe_common::PlanPricing;
use tribe_tenant::{Customization, Tenant};

/// Immutable facts about the inbound request
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Request host (including a non-standard port, when present)
    pub host: String,
    /// Request path, without the query string
    pub path: String,
    /// Query parameters in arrival order
    pub query: Vec<(String, String)>,
    /// Whether the request arrived over TLS
    pub secure: bool,
    /// Via header value, when the request passed a proxy
    pub via: Option<String>,
}

impl RequestInfo {
    /// Describe a plain GET request
    pub fn new(host: &str, path: &str) -> Self {
        Self {
            host: host.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            secure: false,
            via: None,
        }
    }

    /// Append a query parameter
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Mark the request as arriving over TLS
    pub fn over_tls(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Record the Via header
    pub fn with_via(mut self, via: &str) -> Self {
        self.via = Some(via.to_string());
        self
    }

    /// First value of the named query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL scheme implied by the transport
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Path plus query string
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let pairs: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}?{}", self.path, pairs.join("&"))
    }

    /// Path plus query string with one parameter removed.
    /// Used to strip a consumed login token out of the URL.
    pub fn full_path_without_param(&self, name: &str) -> String {
        let pairs: Vec<String> = self
            .query
            .iter()
            .filter(|(k, _)| k != name)
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if pairs.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, pairs.join("&"))
        }
    }
}

/// Outbound mail link target for this request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailTarget {
    /// Host mail links should point at
    pub host: String,
    /// Whether links should use https
    pub secure: bool,
}

/// Mutable per-request state threaded through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The inbound request
    pub request: RequestInfo,
    /// Tenant owning the host, once resolved
    pub tenant: Option<Tenant>,
    /// Authenticated user, once fetched
    pub user: Option<User>,
    /// Accepted membership of the user in the tenant
    pub membership: Option<Membership>,
    /// Negotiated working locale
    pub locale: Option<String>,
    /// Tenant customization record for the negotiated locale
    pub customization: Option<Customization>,
    /// Per-request correlation id for downstream calls
    pub correlation_id: Option<CorrelationId>,
    /// Where outbound mail generated during this request should link
    pub mail_target: Option<MailTarget>,
    /// Promotional plan pricing snapshot
    pub plan_pricing: Option<PlanPricing>,
    /// User administers the current tenant
    pub is_admin: bool,
    /// Current tenant's plan has expired
    pub plan_expired: bool,
    /// Messages shown on this response only (no redirect hop)
    pub flash_now: Vec<FlashMessage>,
    /// Analytics event popped from the session for the frontend
    pub analytics_event: Option<serde_json::Value>,
    /// Path to return to after a locale switch
    pub return_to: Option<String>,
}

impl RequestContext {
    /// Fresh context for one inbound request
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request,
            tenant: None,
            user: None,
            membership: None,
            locale: None,
            customization: None,
            correlation_id: None,
            mail_target: None,
            plan_pricing: None,
            is_admin: false,
            plan_expired: false,
            flash_now: Vec::new(),
            analytics_event: None,
            return_to: None,
        }
    }

    /// Whether a user is signed in
    pub fn logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Root URL of the current tenant in the negotiated locale
    pub fn root_url(&self) -> String {
        match &self.locale {
            Some(locale) => format!(
                "{}://{}/{}",
                self.request.scheme(),
                self.request.host,
                locale
            ),
            None => format!("{}://{}/", self.request.scheme(), self.request.host),
        }
    }
}
