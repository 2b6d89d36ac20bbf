pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod metrics;
pub mod model;
pub mod platform;

pub use cache::{CacheCoordinator, CoordinatorConfig, CoordinatorStatus};
pub use config::{CliConfig, Config};
pub use error::{CoreError, Result};
pub use model::*;
pub use platform::{create_collector, Collector, CollectorOptions, Platform};
