//! In-memory [`MetricBackend`] — replays recorded series and captures alarms.
//!
//! Used as the test double for the aggregator, collector, and alarm
//! provisioner, and for dry runs against series exported from CloudWatch.
//! Failures can be armed per resource or per alarm to exercise abort paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use drainwatch_core::window::align_to_period_start;
use drainwatch_core::{
    AlarmSpec, BackendError, BackendFuture, Dimension, MetricBackend, MetricPoint, MetricQuery,
    Statistic, TimeWindow,
};

/// A recorded series, as stored in a JSON replay file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSeries {
    pub dimension: Dimension,
    pub metric: String,
    pub points: Vec<MetricPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    dimension: Dimension,
    metric: String,
}

/// A query failure armed for one dimension value.
#[derive(Debug)]
struct ArmedFailure {
    /// Queries allowed to succeed before the failure fires.
    remaining_ok: usize,
    error: BackendError,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    series: Mutex<HashMap<SeriesKey, Vec<MetricPoint>>>,
    queries: Mutex<Vec<MetricQuery>>,
    alarms: Mutex<Vec<AlarmSpec>>,
    query_failures: Mutex<HashMap<String, ArmedFailure>>,
    alarm_failures: Mutex<HashMap<String, BackendError>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every query by `latency`, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Build a backend from a JSON array of [`RecordedSeries`].
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let recorded: Vec<RecordedSeries> = serde_json::from_str(json)?;
        let mut series = HashMap::new();
        for r in recorded {
            let key = SeriesKey {
                dimension: r.dimension,
                metric: r.metric,
            };
            series.entry(key).or_insert_with(Vec::new).extend(r.points);
        }
        Ok(Self {
            series: Mutex::new(series),
            ..Self::default()
        })
    }

    /// Append datapoints to the series for `(dimension, metric)`.
    pub async fn insert_series(
        &self,
        dimension: Dimension,
        metric: &str,
        points: impl IntoIterator<Item = MetricPoint>,
    ) {
        let key = SeriesKey {
            dimension,
            metric: metric.to_string(),
        };
        self.series
            .lock()
            .await
            .entry(key)
            .or_default()
            .extend(points);
    }

    /// Let `succeed_first` queries for `dimension_value` through, then fail with `error`.
    pub async fn fail_queries_for(
        &self,
        dimension_value: &str,
        succeed_first: usize,
        error: BackendError,
    ) {
        self.query_failures.lock().await.insert(
            dimension_value.to_string(),
            ArmedFailure {
                remaining_ok: succeed_first,
                error,
            },
        );
    }

    /// Reject `put_alarm` for the alarm named `alarm_name`.
    pub async fn fail_alarm(&self, alarm_name: &str, error: BackendError) {
        self.alarm_failures
            .lock()
            .await
            .insert(alarm_name.to_string(), error);
    }

    /// Every query received, in arrival order.
    pub async fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().await.clone()
    }

    /// Queries received for one dimension value, in arrival order.
    pub async fn queries_for(&self, dimension_value: &str) -> Vec<MetricQuery> {
        self.queries
            .lock()
            .await
            .iter()
            .filter(|q| q.dimension.value == dimension_value)
            .cloned()
            .collect()
    }

    /// Every alarm accepted, in submission order.
    pub async fn alarms(&self) -> Vec<AlarmSpec> {
        self.alarms.lock().await.clone()
    }

    /// Highest number of queries that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Queries currently running. Cancelled queries are no longer counted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn run_query(&self, query: &MetricQuery) -> Result<Vec<MetricPoint>, BackendError> {
        self.queries.lock().await.push(query.clone());

        if let Some(armed) = self
            .query_failures
            .lock()
            .await
            .get_mut(&query.dimension.value)
        {
            if armed.remaining_ok == 0 {
                return Err(armed.error.clone());
            }
            armed.remaining_ok -= 1;
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = SeriesKey {
            dimension: query.dimension.clone(),
            metric: query.metric_name.clone(),
        };
        let series = self.series.lock().await;
        let Some(points) = series.get(&key) else {
            return Ok(Vec::new());
        };

        let in_window = points
            .iter()
            .filter(|p| query.window.contains(p.timestamp))
            .copied();
        Ok(bucket(in_window, &query.window, query.period_secs, query.statistic))
    }
}

/// Counts one running query; released on drop so aborted queries are not leaked.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MetricBackend for InMemoryBackend {
    fn put_alarm<'a>(&'a self, spec: &'a AlarmSpec) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            if let Some(err) = self.alarm_failures.lock().await.get(&spec.alarm_name) {
                return Err(err.clone());
            }
            self.alarms.lock().await.push(spec.clone());
            Ok(())
        })
    }

    fn query_series<'a>(&'a self, query: &'a MetricQuery) -> BackendFuture<'a, Vec<MetricPoint>> {
        Box::pin(async move {
            let _guard = InFlightGuard::enter(&self.in_flight, &self.peak_in_flight);
            self.run_query(query).await
        })
    }
}

/// Roll raw points up into `period_secs` buckets, the way CloudWatch reports them.
///
/// Buckets are epoch-aligned, but a bucket that begins before `window`
/// is keyed at `window.start()` so every returned timestamp lies inside
/// the queried range.
fn bucket(
    points: impl Iterator<Item = MetricPoint>,
    window: &TimeWindow,
    period_secs: u64,
    statistic: Statistic,
) -> Vec<MetricPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for p in points {
        let start = align_to_period_start(p.timestamp, period_secs as i64).max(window.start());
        buckets.entry(start).or_default().push(p.value);
    }

    buckets
        .into_iter()
        .map(|(timestamp, values)| {
            let n = values.len() as f64;
            let value = match statistic {
                Statistic::Sum => values.iter().sum(),
                Statistic::SampleCount => n,
                Statistic::Average => values.iter().sum::<f64>() / n,
                Statistic::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
                Statistic::Maximum => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            MetricPoint::new(timestamp, value)
        })
        .collect()
}
