use super::{
    policy::{ErrorPolicy, FreshnessPolicy},
    refreshing::{CacheSettings, CacheStatus, CollectFn, FailureMessages, RefreshingCache},
};
use crate::{
    config::Config,
    error::CoreError,
    model::{
        Identity, IdentitySnapshot, Snapshot, Stats, StatsSnapshot, IDENTITY_FAILURE_MESSAGE,
        IDENTITY_TIMEOUT_MESSAGE, STATS_FAILURE_MESSAGE, STATS_TIMEOUT_MESSAGE,
        UNSUPPORTED_PLATFORM_MESSAGE,
    },
    platform::{create_collector, Collector, CollectorOptions, Platform},
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Cache behaviour shared by both kinds. Identity never goes stale on its own.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub stats_policy: FreshnessPolicy,
    pub errors: ErrorPolicy,
    pub collect_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            stats_policy: FreshnessPolicy::default(),
            errors: ErrorPolicy::default(),
            collect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub platform: String,
    pub supported: bool,
    pub identity: CacheStatus,
    pub stats: CacheStatus,
}

/// Entry point for everything that serves host telemetry.
///
/// Owns one [`RefreshingCache`] per snapshot kind in front of a single
/// collector chosen at construction.
pub struct CacheCoordinator {
    platform: Platform,
    supported: bool,
    identity: RefreshingCache<Identity>,
    stats: RefreshingCache<Stats>,
}

impl CacheCoordinator {
    /// `collector` is `None` when the platform has no implementation; both
    /// kinds then cache an unsupported-platform error.
    pub fn new(
        platform: Platform,
        collector: Option<Arc<dyn Collector>>,
        config: CoordinatorConfig,
    ) -> Self {
        let identity_settings = CacheSettings {
            policy: FreshnessPolicy::forever(),
            errors: config.errors,
            collect_timeout: config.collect_timeout,
        };
        let stats_settings = CacheSettings {
            policy: config.stats_policy,
            errors: config.errors,
            collect_timeout: config.collect_timeout,
        };

        Self {
            supported: collector.is_some(),
            identity: RefreshingCache::new(
                "identity",
                identity_settings,
                FailureMessages {
                    failed: IDENTITY_FAILURE_MESSAGE,
                    timed_out: IDENTITY_TIMEOUT_MESSAGE,
                },
                identity_source(&platform, collector.clone()),
            ),
            stats: RefreshingCache::new(
                "stats",
                stats_settings,
                FailureMessages {
                    failed: STATS_FAILURE_MESSAGE,
                    timed_out: STATS_TIMEOUT_MESSAGE,
                },
                stats_source(collector),
            ),
            platform,
        }
    }

    /// Selects the collector for `platform` and wraps it
    pub fn for_platform(
        platform: Platform,
        options: &CollectorOptions,
        config: CoordinatorConfig,
    ) -> Self {
        let collector = create_collector(&platform, options);
        Self::new(platform, collector, config)
    }

    /// Coordinator for the platform and thresholds described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self::for_platform(
            config.platform(),
            &config.collector_options(),
            CoordinatorConfig::from(config),
        )
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub async fn get_identity(&self) -> IdentitySnapshot {
        self.identity.get().await
    }

    pub async fn get_stats(&self) -> StatsSnapshot {
        self.stats.get().await
    }

    pub fn invalidate_identity(&self) {
        self.identity.invalidate();
    }

    /// Populates both caches concurrently. Never fails; error snapshots are logged.
    pub async fn warm_up(&self) {
        let (identity, stats) = tokio::join!(self.get_identity(), self.get_stats());
        match (identity.error_message(), stats.error_message()) {
            (None, None) => info!(platform = %self.platform, "telemetry caches warmed"),
            (identity_error, stats_error) => warn!(
                platform = %self.platform,
                identity_error,
                stats_error,
                "telemetry caches warmed with errors"
            ),
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            platform: self.platform.to_string(),
            supported: self.supported,
            identity: self.identity.status(),
            stats: self.stats.status(),
        }
    }

    pub fn identity_cache(&self) -> &RefreshingCache<Identity> {
        &self.identity
    }

    pub fn stats_cache(&self) -> &RefreshingCache<Stats> {
        &self.stats
    }
}

fn identity_source(
    platform: &Platform,
    collector: Option<Arc<dyn Collector>>,
) -> CollectFn<Identity> {
    match collector {
        Some(collector) => Arc::new(move || match collector.identity() {
            Ok(identity) => Snapshot::Ready(identity),
            Err(e) => {
                warn!(error = %e, "identity collection failed");
                Snapshot::error(IDENTITY_FAILURE_MESSAGE)
            }
        }),
        None => {
            warn!(error = %CoreError::unsupported_platform(platform.as_str()), "no collector available");
            let platform = platform.to_string();
            Arc::new(move || Snapshot::error_on_platform(UNSUPPORTED_PLATFORM_MESSAGE, platform.clone()))
        }
    }
}

fn stats_source(collector: Option<Arc<dyn Collector>>) -> CollectFn<Stats> {
    match collector {
        Some(collector) => Arc::new(move || match collector.stats() {
            Ok(stats) => Snapshot::Ready(stats),
            Err(e) => {
                warn!(error = %e, "stats collection failed");
                Snapshot::error(STATS_FAILURE_MESSAGE)
            }
        }),
        None => Arc::new(|| Snapshot::error(UNSUPPORTED_PLATFORM_MESSAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Result,
        model::{ErrorSnapshot, NOT_AVAILABLE},
    };
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCollector {
        identity_calls: AtomicUsize,
        stats_calls: AtomicUsize,
        fail_stats: bool,
    }

    impl FakeCollector {
        fn failing() -> Self {
            Self {
                fail_stats: true,
                ..Self::default()
            }
        }
    }

    impl Collector for FakeCollector {
        fn architecture(&self) -> String {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            "x86_64".to_string()
        }

        fn platform(&self) -> String {
            "Linux".to_string()
        }

        fn os_name(&self) -> String {
            "Debian GNU/Linux 12 (bookworm)".to_string()
        }

        fn os_version(&self) -> String {
            NOT_AVAILABLE.to_string()
        }

        fn stats(&self) -> Result<Stats> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            if self.fail_stats {
                return Err(CoreError::snapshot("top exploded"));
            }
            Ok(Stats::default())
        }
    }

    fn coordinator(collector: &Arc<FakeCollector>) -> CacheCoordinator {
        let collector: Arc<dyn Collector> = collector.clone();
        CacheCoordinator::new(Platform::Linux, Some(collector), CoordinatorConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stats_demand_runs_one_collection() {
        let fake = Arc::new(FakeCollector::default());
        let coordinator = coordinator(&fake);

        let results = join_all((0..25).map(|_| coordinator.get_stats())).await;

        assert_eq!(fake.stats_calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| *r == Snapshot::Ready(Stats::default())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_platform_is_cached_as_error() {
        let coordinator = CacheCoordinator::for_platform(
            Platform::from_id("haiku"),
            &CollectorOptions::default(),
            CoordinatorConfig::default(),
        );

        let stats = coordinator.get_stats().await;
        assert_eq!(
            stats,
            Snapshot::Error(ErrorSnapshot {
                error: UNSUPPORTED_PLATFORM_MESSAGE.to_string(),
                platform: None,
            })
        );
        assert!(coordinator.stats_cache().fetched_at().is_some());

        let identity = coordinator.get_identity().await;
        assert_eq!(
            identity,
            Snapshot::Error(ErrorSnapshot {
                error: UNSUPPORTED_PLATFORM_MESSAGE.to_string(),
                platform: Some("haiku".to_string()),
            })
        );

        let status = coordinator.status();
        assert!(!status.supported);
        assert!(status.stats.holds_error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_error_obeys_stats_thresholds() {
        let coordinator = CacheCoordinator::new(
            Platform::from_id("haiku"),
            None,
            CoordinatorConfig::default(),
        );
        coordinator.get_stats().await;
        let first = coordinator.stats_cache().fetched_at().unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        coordinator.get_stats().await;
        assert_eq!(coordinator.stats_cache().fetched_at(), Some(first));

        tokio::time::advance(Duration::from_secs(31)).await;
        coordinator.get_stats().await;
        assert!(coordinator.stats_cache().fetched_at().unwrap() > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_stats_are_cached_without_recollecting() {
        let fake = Arc::new(FakeCollector::failing());
        let coordinator = coordinator(&fake);

        let first = coordinator.get_stats().await;
        assert_eq!(first.error_message(), Some(STATS_FAILURE_MESSAGE));

        tokio::time::advance(Duration::from_secs(44)).await;
        let again = coordinator.get_stats().await;
        assert_eq!(again, first);
        assert_eq!(fake.stats_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_is_kept_until_invalidated() {
        let fake = Arc::new(FakeCollector::default());
        let coordinator = coordinator(&fake);

        let identity = coordinator.get_identity().await;
        let ready = identity.ready().unwrap();
        assert_eq!(ready.architecture, "x86_64");
        assert_eq!(ready.os_version.as_deref(), Some(NOT_AVAILABLE));
        let first = coordinator.identity_cache().fetched_at().unwrap();

        tokio::time::advance(Duration::from_secs(86_400)).await;
        coordinator.get_identity().await;
        assert_eq!(fake.identity_calls.load(Ordering::SeqCst), 1);

        coordinator.invalidate_identity();
        coordinator.get_identity().await;
        assert_eq!(fake.identity_calls.load(Ordering::SeqCst), 2);
        assert!(coordinator.identity_cache().fetched_at().unwrap() > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kinds_are_tracked_independently() {
        let fake = Arc::new(FakeCollector::default());
        let coordinator = coordinator(&fake);
        coordinator.get_identity().await;

        assert!(!coordinator.status().stats.populated);
        coordinator.get_stats().await;
        coordinator.invalidate_identity();
        let status = coordinator.status();
        assert!(!status.identity.populated);
        assert!(status.stats.populated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_populates_both_kinds() {
        let fake = Arc::new(FakeCollector::default());
        let coordinator = coordinator(&fake);

        // A request racing the warm-up joins the same collections
        let (_, stats) = tokio::join!(coordinator.warm_up(), coordinator.get_stats());
        assert!(!stats.is_error());
        assert_eq!(fake.stats_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.identity_calls.load(Ordering::SeqCst), 1);

        let status = coordinator.status();
        assert!(status.identity.populated);
        assert!(status.stats.populated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_tolerates_failures() {
        let fake = Arc::new(FakeCollector::failing());
        let coordinator = coordinator(&fake);
        coordinator.warm_up().await;
        assert!(coordinator.status().stats.holds_error);
        assert!(!coordinator.status().identity.holds_error);
    }
}
