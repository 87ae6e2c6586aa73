//! Error types shared by the drainwatch crates.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A metric or alarm backend rejected or failed a call.
///
/// Never retried inside drainwatch; retry policy belongs to the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors building a [`crate::TimeWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window end {end} does not follow start {start}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors loading a drainwatch config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid collector settings: {reason}")]
    InvalidCollector { reason: String },

    #[error("invalid alarm {name:?}: {reason}")]
    InvalidAlarm { name: String, reason: String },
}
