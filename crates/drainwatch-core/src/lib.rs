//! drainwatch-core — shared building blocks for drainwatch.
//!
//! Holds the request-scoped value types, the UTC time-window helpers used to
//! chunk metric queries, the [`MetricBackend`] seam that CloudWatch (or a
//! test double) sits behind, and the `drainwatch.toml` config parser.

pub mod backend;
pub mod config;
pub mod error;
pub mod types;
pub mod window;

pub use backend::{BackendFuture, MetricBackend};
pub use config::{AlarmConfig, CollectorConfig, CollectorSettings, DrainwatchConfig};
pub use error::{BackendError, ConfigError, WindowError};
pub use types::*;
pub use window::TimeWindow;
