//! Per-Request Correlation Ids
//!
//! Every request gets an opaque id combining a deterministic
//! fingerprint of its parameters with a microsecond timestamp, so even
//! an identical retried request produces a distinct id. The id lives on
//! the [`RequestContext`](crate::context::RequestContext) only and is
//! handed to every downstream call made while serving the request.

use crate::context::RequestInfo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tribe_common::Timestamp;

/// Opaque per-request identifier propagated to downstream services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Build the id for a request at the given instant
    pub fn generate(request: &RequestInfo, at: Timestamp) -> Self {
        Self(format!("{}_{}", fingerprint(request), at.epoch_label()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic fingerprint of the request path and parameters.
/// Parameters are sorted first so arrival order does not matter.
pub fn fingerprint(request: &RequestInfo) -> String {
    let mut pairs: Vec<String> = request
        .query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(request.path.as_bytes());
    hasher.update(b"?");
    hasher.update(pairs.join("&").as_bytes());

    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
