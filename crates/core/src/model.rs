use serde::{Deserialize, Serialize};

/// Placeholder for any metric the platform cannot report
pub const NOT_AVAILABLE: &str = "N/A";

pub const UNSUPPORTED_PLATFORM_MESSAGE: &str =
    "Unsupported platform or missing collector implementation.";
pub const IDENTITY_FAILURE_MESSAGE: &str = "Failed to collect system info.";
pub const STATS_FAILURE_MESSAGE: &str = "Failed to collect system stats.";
pub const IDENTITY_TIMEOUT_MESSAGE: &str = "Timed out collecting system info.";
pub const STATS_TIMEOUT_MESSAGE: &str = "Timed out collecting system stats.";

pub(crate) fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Host identity. Stable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub architecture: String,
    pub platform: String,
    pub os_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStats {
    pub usage: String,
    pub temperature: String,
    pub cores: String,
}

/// Used/total/percentage triple shared by memory, swap and disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub used: String,
    pub total: String,
    pub usage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub download: String,
    pub upload: String,
    pub active: String,
}

/// One pass over the host's resource usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub cpu: CpuStats,
    pub memory: UsageStats,
    pub swap: UsageStats,
    pub disk: UsageStats,
    pub network: NetworkStats,
}

impl Default for CpuStats {
    fn default() -> Self {
        Self {
            usage: not_available(),
            temperature: not_available(),
            cores: not_available(),
        }
    }
}

impl Default for UsageStats {
    fn default() -> Self {
        Self {
            used: not_available(),
            total: not_available(),
            usage: not_available(),
        }
    }
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            download: not_available(),
            upload: not_available(),
            active: not_available(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            cpu: CpuStats::default(),
            memory: UsageStats::default(),
            swap: UsageStats::default(),
            disk: UsageStats::default(),
            network: NetworkStats::default(),
        }
    }
}

/// Payload served in place of a snapshot when collection was impossible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSnapshot {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Result of one collection pass, either the record itself or an error payload.
///
/// Serialized untagged: clients see the bare record or `{ "error": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot<T> {
    Error(ErrorSnapshot),
    Ready(T),
}

impl<T> Snapshot<T> {
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self::Error(ErrorSnapshot {
            error: message.into(),
            platform: None,
        })
    }

    pub fn error_on_platform<S: Into<String>, P: Into<String>>(message: S, platform: P) -> Self {
        Self::Error(ErrorSnapshot {
            error: message.into(),
            platform: Some(platform.into()),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(err) => Some(&err.error),
            Self::Ready(_) => None,
        }
    }
}

pub type IdentitySnapshot = Snapshot<Identity>;
pub type StatsSnapshot = Snapshot<Stats>;
