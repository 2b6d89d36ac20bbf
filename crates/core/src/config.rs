use crate::{
    cache::{CoordinatorConfig, ErrorPolicy, FreshnessPolicy},
    error::{CoreError, Result},
    platform::{CollectorOptions, Platform},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,

    pub port: u16,

    /// Age after which cached stats are served while a refresh runs
    pub stats_soft_ttl_secs: u64,

    /// Age after which cached stats are no longer served
    pub stats_hard_ttl_secs: u64,

    /// Upper bound for one snapshot collection
    pub collect_timeout_secs: u64,

    /// Upper bound for each external utility
    pub command_timeout_ms: u64,

    /// Window between the two network samples
    pub network_sample_ms: u64,

    /// Give cached errors their own short lifetime
    pub cache_errors_independently: bool,

    pub error_ttl_secs: u64,

    /// Platform identifier overriding detection
    pub platform: Option<String>,

    /// tracing filter directive; `RUST_LOG` takes precedence
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            stats_soft_ttl_secs: 45,
            stats_hard_ttl_secs: 60,
            collect_timeout_secs: 10,
            command_timeout_ms: 2000,
            network_sample_ms: 200,
            cache_errors_independently: false,
            error_ttl_secs: 5,
            platform: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in order of preference:
    /// 1. CLI arguments override everything
    /// 2. JSON config file if specified
    /// 3. Default config file locations
    /// 4. Built-in defaults
    pub fn load(cli_config: Option<&CliConfig>, json_path: Option<&PathBuf>) -> Result<Self> {
        Self::load_layered(&Self::default_config_paths(), cli_config, json_path)
    }

    fn load_layered(
        default_paths: &[PathBuf],
        cli_config: Option<&CliConfig>,
        json_path: Option<&PathBuf>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(layer) = Self::first_readable(default_paths) {
            config.merge(layer);
        }

        if let Some(path) = json_path {
            config.merge(ConfigLayer::read(path)?);
        }

        if let Some(cli) = cli_config {
            config.apply_cli_overrides(cli);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific JSON file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge(ConfigLayer::read(path)?);
        Ok(config)
    }

    /// A broken file in a default location is skipped, not fatal
    fn first_readable(paths: &[PathBuf]) -> Option<ConfigLayer> {
        for path in paths.iter().filter(|p| p.exists()) {
            match ConfigLayer::read(path) {
                Ok(layer) => {
                    debug!(path = %path.display(), "loaded configuration");
                    return Some(layer);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }
        None
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("hostscope").join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".hostscope.json"));
        }

        paths.push(PathBuf::from("hostscope.json"));

        paths
    }

    /// Applies every key the layer actually sets, default-valued or not
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(host) = layer.host {
            self.host = host;
        }
        if let Some(port) = layer.port {
            self.port = port;
        }
        if let Some(secs) = layer.stats_soft_ttl_secs {
            self.stats_soft_ttl_secs = secs;
        }
        if let Some(secs) = layer.stats_hard_ttl_secs {
            self.stats_hard_ttl_secs = secs;
        }
        if let Some(secs) = layer.collect_timeout_secs {
            self.collect_timeout_secs = secs;
        }
        if let Some(ms) = layer.command_timeout_ms {
            self.command_timeout_ms = ms;
        }
        if let Some(ms) = layer.network_sample_ms {
            self.network_sample_ms = ms;
        }
        if let Some(flag) = layer.cache_errors_independently {
            self.cache_errors_independently = flag;
        }
        if let Some(secs) = layer.error_ttl_secs {
            self.error_ttl_secs = secs;
        }
        if let Some(platform) = layer.platform {
            self.platform = Some(platform);
        }
        if let Some(filter) = layer.log_filter {
            self.log_filter = filter;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &CliConfig) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(platform) = &cli.platform {
            self.platform = Some(platform.clone());
        }
        if cli.cache_errors_independently {
            self.cache_errors_independently = true;
        }
        if let Some(filter) = &cli.log_filter {
            self.log_filter = filter.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(CoreError::config("Port must not be 0"));
        }

        if self.stats_hard_ttl_secs == 0 {
            return Err(CoreError::config("Stats hard threshold must be positive"));
        }

        if self.stats_soft_ttl_secs >= self.stats_hard_ttl_secs {
            return Err(CoreError::config(format!(
                "Stats soft threshold ({}s) must be below the hard threshold ({}s)",
                self.stats_soft_ttl_secs, self.stats_hard_ttl_secs
            )));
        }

        for (name, value) in [
            ("collect_timeout_secs", self.collect_timeout_secs),
            ("command_timeout_ms", self.command_timeout_ms),
            ("network_sample_ms", self.network_sample_ms),
            ("error_ttl_secs", self.error_ttl_secs),
        ] {
            if value == 0 {
                return Err(CoreError::config(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured override, otherwise the platform the process runs on
    pub fn platform(&self) -> Platform {
        self.platform
            .as_deref()
            .map(Platform::from_id)
            .unwrap_or_else(Platform::current)
    }

    pub fn stats_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(
            Duration::from_secs(self.stats_soft_ttl_secs),
            Duration::from_secs(self.stats_hard_ttl_secs),
        )
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy {
            cache_errors_independently: self.cache_errors_independently,
            error_ttl: Duration::from_secs(self.error_ttl_secs),
        }
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs)
    }

    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            network_sample: Duration::from_millis(self.network_sample_ms),
        }
    }
}

impl From<&Config> for CoordinatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            stats_policy: config.stats_policy(),
            errors: config.error_policy(),
            collect_timeout: config.collect_timeout(),
        }
    }
}

/// One JSON config file. Keys absent from the file stay `None` and leave
/// the layer below untouched.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    host: Option<String>,
    port: Option<u16>,
    stats_soft_ttl_secs: Option<u64>,
    stats_hard_ttl_secs: Option<u64>,
    collect_timeout_secs: Option<u64>,
    command_timeout_ms: Option<u64>,
    network_sample_ms: Option<u64>,
    cache_errors_independently: Option<bool>,
    error_ttl_secs: Option<u64>,
    platform: Option<String>,
    log_filter: Option<String>,
}

impl ConfigLayer {
    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            CoreError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }
}

/// Values parsed from the command line and environment
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub platform: Option<String>,
    pub cache_errors_independently: bool,
    pub log_filter: Option<String>,
}
