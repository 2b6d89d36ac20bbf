pub mod linux;
pub mod macos;
pub mod windows;

pub use linux::LinuxCollector;
pub use macos::MacosCollector;
pub use windows::WindowsCollector;

use crate::{
    error::Result,
    metrics::MetricsCollector,
    model::{not_available, Identity, Stats},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;

/// Platform-specific source of raw host facts.
///
/// Accessors never fail: a query that cannot be answered yields `"N/A"` for
/// that field alone. Only [`Collector::stats`] and [`Collector::identity`]
/// report aggregate failures, which the cache turns into error snapshots.
/// Every method may block on external utilities.
pub trait Collector: Send + Sync {
    fn architecture(&self) -> String;

    fn platform(&self) -> String;

    fn os_name(&self) -> String;

    fn os_version(&self) -> String;

    /// Kernel release, where the platform has a meaningful one
    fn kernel(&self) -> Option<String> {
        None
    }

    fn stats(&self) -> Result<Stats>;

    /// Best-effort aggregation of the identity accessors
    fn identity(&self) -> Result<Identity> {
        Ok(Identity {
            architecture: self.architecture(),
            platform: self.platform(),
            os_name: self.os_name(),
            os_version: Some(self.os_version()),
            kernel: self.kernel(),
        })
    }
}

/// Operating system family the process runs on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Other(String),
}

impl Platform {
    /// Parses identifiers as reported by `std::env::consts::OS` and common aliases
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "linux" => Self::Linux,
            "windows" | "win32" => Self::Windows,
            "macos" | "darwin" => Self::MacOs,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Self::from_id(std::env::consts::OS)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Other(id) => id,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning shared by all platform collectors
#[derive(Debug, Clone, Copy)]
pub struct CollectorOptions {
    /// Limit for each external utility invocation
    pub command_timeout: Duration,
    /// Interval between the two network samples used for throughput
    pub network_sample: Duration,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(2),
            network_sample: Duration::from_millis(200),
        }
    }
}

/// The one place a platform is mapped to its collector.
///
/// Returns `None` when no variant exists for `platform`; callers report that
/// as an unsupported-platform snapshot. Construction does no I/O.
pub fn create_collector(
    platform: &Platform,
    options: &CollectorOptions,
) -> Option<Arc<dyn Collector>> {
    match platform {
        Platform::Linux => Some(Arc::new(LinuxCollector::new(options))),
        Platform::Windows => Some(Arc::new(WindowsCollector::new(options))),
        Platform::MacOs => Some(Arc::new(MacosCollector::new(options))),
        Platform::Other(id) => {
            debug!(platform = %id, "no collector for platform");
            None
        }
    }
}

/// Degrades a failed field query to `"N/A"`
pub(crate) fn field_or_na(field: &'static str, result: Result<String>) -> String {
    result.unwrap_or_else(|e| {
        debug!(field, error = %e, "field unavailable");
        not_available()
    })
}

/// sysinfo state created on first use, so building a collector stays free
pub(crate) struct LazyMetrics {
    sample: Duration,
    inner: Mutex<Option<MetricsCollector>>,
}

impl LazyMetrics {
    pub(crate) fn new(sample: Duration) -> Self {
        Self {
            sample,
            inner: Mutex::new(None),
        }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut MetricsCollector) -> R) -> R {
        let mut guard = self.inner.lock();
        let metrics = guard.get_or_insert_with(|| MetricsCollector::new(self.sample));
        f(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_ids() {
        assert_eq!(Platform::from_id("linux"), Platform::Linux);
        assert_eq!(Platform::from_id("win32"), Platform::Windows);
        assert_eq!(Platform::from_id("Windows"), Platform::Windows);
        assert_eq!(Platform::from_id("darwin"), Platform::MacOs);
        assert_eq!(
            Platform::from_id("freebsd"),
            Platform::Other("freebsd".to_string())
        );
        assert_eq!(Platform::from_id("darwin").to_string(), "macos");
    }

    #[test]
    fn test_factory_selects_a_variant_per_family() {
        let options = CollectorOptions::default();
        for platform in [Platform::Linux, Platform::Windows, Platform::MacOs] {
            assert!(create_collector(&platform, &options).is_some());
        }
    }

    #[test]
    fn test_factory_yields_none_for_unknown_platforms() {
        let options = CollectorOptions::default();
        assert!(create_collector(&Platform::from_id("plan9"), &options).is_none());
    }

    #[test]
    fn test_field_failure_degrades_to_na() {
        let failed = Err(crate::CoreError::field("osName", "boom"));
        assert_eq!(field_or_na("osName", failed), "N/A");
        assert_eq!(field_or_na("osName", Ok("Debian".to_string())), "Debian");
    }
}
