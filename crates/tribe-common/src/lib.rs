//! OpenTribe Common - shared types for the request preprocessing pipeline
//!
//! This crate provides the pieces every pipeline crate needs:
//! - Error taxonomy
//! - Platform configuration
//! - Microsecond timestamps for correlation ids

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;

pub use config::{AppConfig, PlanPricing};
pub use error::{GateError, GateResult};

/// Microsecond epoch timestamp used to make correlation ids unique
/// across retries of an otherwise identical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get current timestamp (microseconds since epoch)
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;
        Self(micros)
    }

    /// Build from a raw microsecond value
    #[inline(always)]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Get microseconds value
    #[inline(always)]
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// `seconds.micros` label, the suffix appended to correlation ids
    pub fn epoch_label(&self) -> String {
        format!("{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_monotonic_enough() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_micros(100));
        let t2 = Timestamp::now();

        assert!(t2.as_micros() > t1.as_micros());
    }

    #[test]
    fn test_epoch_label_pads_micros() {
        let ts = Timestamp::from_micros(1_700_000_000_000_042);
        assert_eq!(ts.epoch_label(), "1700000000.000042");
    }
}
