use serde::Serialize;
use std::time::Duration;

/// Where a cached value sits relative to its thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Younger than the soft threshold: serve as is
    Fresh,
    /// Between soft and hard: serve and refresh in the background
    Stale,
    /// At or past the hard threshold: wait for a new collection
    Expired,
}

/// Soft and hard age thresholds for one cached kind. `None` disables a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub soft_ttl: Option<Duration>,
    pub hard_ttl: Option<Duration>,
}

impl FreshnessPolicy {
    pub fn new(soft_ttl: Duration, hard_ttl: Duration) -> Self {
        Self {
            soft_ttl: Some(soft_ttl),
            hard_ttl: Some(hard_ttl),
        }
    }

    /// Valid until explicitly invalidated
    pub fn forever() -> Self {
        Self {
            soft_ttl: None,
            hard_ttl: None,
        }
    }

    /// Hard expiry only, no background refresh
    pub fn expiring(hard_ttl: Duration) -> Self {
        Self {
            soft_ttl: None,
            hard_ttl: Some(hard_ttl),
        }
    }

    pub fn classify(&self, age: Duration) -> Freshness {
        if matches!(self.hard_ttl, Some(hard) if age >= hard) {
            return Freshness::Expired;
        }
        match self.soft_ttl {
            Some(soft) if age >= soft => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(45), Duration::from_secs(60))
    }
}

/// How cached error snapshots age.
///
/// By default an error occupies the entry exactly like a success, so a
/// failing collector is not retried until the regular threshold passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub cache_errors_independently: bool,
    pub error_ttl: Duration,
}

impl ErrorPolicy {
    /// Policy that applies to an entry holding an error
    pub fn effective(&self, regular: FreshnessPolicy) -> FreshnessPolicy {
        if self.cache_errors_independently {
            FreshnessPolicy::expiring(self.error_ttl)
        } else {
            regular
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            cache_errors_independently: false,
            error_ttl: Duration::from_secs(5),
        }
    }
}
