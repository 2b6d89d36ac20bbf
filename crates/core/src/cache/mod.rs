//! Caching layer between request handlers and the platform collectors.

pub mod coordinator;
pub mod policy;
pub mod refreshing;

pub use coordinator::{CacheCoordinator, CoordinatorConfig, CoordinatorStatus};
pub use policy::{ErrorPolicy, Freshness, FreshnessPolicy};
pub use refreshing::{CacheSettings, CacheStatus, FailureMessages, RefreshActivity, RefreshingCache};
