use std::time::Duration;
use thiserror::Error;

/// Core errors for the telemetry collectors and cache
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to collect {field}: {reason}")]
    FieldCollection { field: &'static str, reason: String },

    #[error("Snapshot collection failed: {0}")]
    SnapshotCollection(String),

    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn unsupported_platform<S: Into<String>>(platform: S) -> Self {
        Self::UnsupportedPlatform(platform.into())
    }

    pub fn field<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::FieldCollection {
            field,
            reason: reason.into(),
        }
    }

    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        Self::SnapshotCollection(msg.into())
    }

    pub fn command<P: Into<String>, S: Into<String>>(program: P, reason: S) -> Self {
        Self::Command {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
