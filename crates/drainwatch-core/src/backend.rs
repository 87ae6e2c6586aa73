//! The metric/alarm backend seam.
//!
//! Production code plugs a CloudWatch client in here; tests use the
//! in-memory backend from `drainwatch-metrics`.

use std::future::Future;
use std::pin::Pin;

use crate::error::BackendError;
use crate::types::{AlarmSpec, MetricPoint, MetricQuery};

/// Boxed future returned by [`MetricBackend`] calls.
pub type BackendFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Capability to register alarms and query metric series.
pub trait MetricBackend: Send + Sync {
    /// Create or replace a metric alarm.
    fn put_alarm<'a>(&'a self, spec: &'a AlarmSpec) -> BackendFuture<'a, ()>;

    /// Fetch the series for `query.window` at `query.period_secs` resolution.
    ///
    /// Returns an empty series, not an error, when there is no data.
    fn query_series<'a>(&'a self, query: &'a MetricQuery) -> BackendFuture<'a, Vec<MetricPoint>>;
}
