//! Cache TTL derivation from credential expiry
//!
//! The authoritative TTL of a cached credential or profile is the time left
//! until the credential expires. Expiry values arrive as epoch seconds,
//! fractional epoch seconds, epoch milliseconds or RFC 3339 timestamps and
//! are normalised to seconds before the subtraction.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ports::ttl;

/// Epoch values above this are read as milliseconds (year 5138 in seconds)
const MILLIS_THRESHOLD: f64 = 1e11;

/// Outcome of TTL derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Cache for this long
    Cache(Duration),
    /// Credential already expired; do not cache
    Skip,
}

impl CacheTtl {
    /// The duration, if caching applies
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Cache(ttl) => Some(ttl),
            Self::Skip => None,
        }
    }
}

/// Normalise an epoch timestamp to seconds
#[must_use]
pub fn normalize_epoch(timestamp: f64) -> f64 {
    if timestamp > MILLIS_THRESHOLD {
        timestamp / 1000.0
    } else {
        timestamp
    }
}

/// Parse an expiry value: a numeric epoch or an RFC 3339 timestamp
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_expiry(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(epoch) = raw.parse::<f64>() {
        return epoch.is_finite().then(|| normalize_epoch(epoch));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis() as f64 / 1000.0)
}

/// Whole seconds left until `expires_at`, both in epoch seconds
///
/// Negative when the expiry lies in the past.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn remaining_secs(expires_at: f64, now: f64) -> i64 {
    (normalize_epoch(expires_at) - now).floor() as i64
}

/// Current time in fractional epoch seconds
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn now_epoch() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Derives cache TTLs, falling back to a default when expiry is unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    default_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(ttl::DEFAULT_PROFILE)
    }
}

impl TtlPolicy {
    /// Create a policy with the given fallback TTL
    #[must_use]
    pub const fn new(default_ttl: Duration) -> Self {
        Self { default_ttl }
    }

    /// Fallback TTL used when expiry is unknown
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Derive the TTL for a credential expiring at `expires_at`
    #[must_use]
    pub fn derive(&self, expires_at: Option<f64>) -> CacheTtl {
        self.derive_at(expires_at, now_epoch())
    }

    /// Derive the TTL relative to an explicit `now`
    #[must_use]
    pub fn derive_at(&self, expires_at: Option<f64>, now: f64) -> CacheTtl {
        let Some(expires_at) = expires_at else {
            return CacheTtl::Cache(self.default_ttl);
        };
        match u64::try_from(remaining_secs(expires_at, now)) {
            Ok(secs) if secs > 0 => CacheTtl::Cache(Duration::from_secs(secs)),
            _ => CacheTtl::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn future_expiry_yields_remaining_time() {
        let ttl = TtlPolicy::default().derive_at(Some(NOW + 300.0), NOW);
        assert_eq!(ttl, CacheTtl::Cache(Duration::from_secs(300)));
    }

    #[test]
    fn live_clock_is_within_a_second() {
        let expires_at = now_epoch() + 300.0;
        let secs = TtlPolicy::default()
            .derive(Some(expires_at))
            .duration()
            .unwrap()
            .as_secs();
        assert!((299..=300).contains(&secs), "got {secs}");
    }

    #[test]
    fn past_expiry_is_not_cached() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.derive_at(Some(NOW - 10.0), NOW), CacheTtl::Skip);
        assert_eq!(policy.derive_at(Some(NOW), NOW), CacheTtl::Skip);
        assert!(remaining_secs(NOW - 10.0, NOW) < 0);
    }

    #[test]
    fn unknown_expiry_uses_default() {
        let policy = TtlPolicy::new(Duration::from_secs(42));
        assert_eq!(policy.derive_at(None, NOW), CacheTtl::Cache(Duration::from_secs(42)));
    }

    #[test]
    fn millisecond_epochs_are_normalised() {
        let ttl = TtlPolicy::default().derive_at(Some((NOW + 120.0) * 1000.0), NOW);
        assert_eq!(ttl, CacheTtl::Cache(Duration::from_secs(120)));
    }

    #[test]
    fn fractional_remaining_time_rounds_down() {
        assert_eq!(remaining_secs(NOW + 0.9, NOW), 0);
        assert_eq!(TtlPolicy::default().derive_at(Some(NOW + 0.9), NOW), CacheTtl::Skip);
        assert_eq!(remaining_secs(NOW + 59.5, NOW), 59);
    }

    #[test]
    fn parse_expiry_accepts_numbers_and_timestamps() {
        assert_eq!(parse_expiry("1700000000"), Some(NOW));
        assert_eq!(parse_expiry(" 1700000000000 "), Some(NOW));
        assert_eq!(parse_expiry("1700000000.5"), Some(NOW + 0.5));
        assert_eq!(parse_expiry("2023-11-14T22:13:20Z"), Some(NOW));
        assert_eq!(parse_expiry(""), None);
        assert_eq!(parse_expiry("soon"), None);
        assert_eq!(parse_expiry("NaN"), None);
    }
}
