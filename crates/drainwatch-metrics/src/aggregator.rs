//! Windowed metric aggregation — walks a range one UTC day at a time.
//!
//! The backend is queried once per day-sized chunk, each chunk clipped to
//! the decommission cutoff. Loop termination depends only on time
//! comparisons, never on the backend running out of data.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use drainwatch_core::window::{self, TimeWindow};
use drainwatch_core::{
    Dimension, MetricBackend, MetricPoint, MetricQuery, ResourceStatistics, Statistic,
};

use crate::error::{CollectError, CollectResult};

/// Which metric a [`MetricWindowAggregator`] reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTarget {
    pub dimension_name: String,
    pub metric_name: String,
    pub namespace: String,
}

/// Points and running total gathered over every chunk of one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowedSeries {
    pub points: BTreeMap<String, f64>,
    /// Sum of every value merged, even when a later chunk overwrote a key.
    pub total: f64,
    /// Number of backend queries issued.
    pub chunks: usize,
}

impl WindowedSeries {
    /// Merge one chunk's points and return the chunk's sum.
    fn merge(&mut self, points: &[MetricPoint]) -> f64 {
        let mut sum = 0.0;
        for p in points {
            self.points
                .insert(window::format_timestamp(p.timestamp), p.value);
            sum += p.value;
        }
        self.total += sum;
        self.chunks += 1;
        sum
    }

    pub fn into_statistics(self, resource_name: impl Into<String>) -> ResourceStatistics {
        ResourceStatistics {
            resource_name: resource_name.into(),
            points: self.points,
            total: self.total,
        }
    }
}

/// Sums a metric for one resource over `[range_start, cutoff]`.
#[derive(Clone)]
pub struct MetricWindowAggregator {
    backend: Arc<dyn MetricBackend>,
    target: MetricTarget,
    period: Duration,
}

impl MetricWindowAggregator {
    pub fn new(backend: Arc<dyn MetricBackend>, target: MetricTarget, period: Duration) -> Self {
        Self {
            backend,
            target,
            period,
        }
    }

    pub fn target(&self) -> &MetricTarget {
        &self.target
    }

    /// Collect the `Sum` series for `resource_key` from `range_start` up to `cutoff`.
    ///
    /// Returns an empty series without calling the backend when
    /// `range_start` is not strictly before `cutoff`. A backend failure on
    /// any chunk discards everything gathered so far for this resource.
    pub async fn collect_windowed(
        &self,
        resource_key: &str,
        range_start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> CollectResult<WindowedSeries> {
        let mut series = WindowedSeries::default();
        if !window::before(range_start, cutoff) {
            debug!(resource = %resource_key, %range_start, %cutoff, "empty window, nothing to collect");
            return Ok(series);
        }

        let mut start = range_start;
        loop {
            let mut chunk_end = window::day_end(start);
            if window::before(cutoff, chunk_end) {
                debug!(resource = %resource_key, %cutoff, %chunk_end, "clipping chunk to cutoff");
                chunk_end = cutoff;
            }
            if !window::before(start, chunk_end) {
                break;
            }

            let query = self.query(resource_key, TimeWindow::new(start, chunk_end)?);
            let points = self
                .backend
                .query_series(&query)
                .await
                .map_err(|source| CollectError::Backend {
                    resource: resource_key.to_string(),
                    source,
                })?;

            let chunk_sum = series.merge(&points);
            debug!(
                resource = %resource_key,
                id = %query.id,
                %start,
                end = %chunk_end,
                points = points.len(),
                chunk_sum,
                "collected chunk"
            );

            start = chunk_end + chrono::Duration::seconds(1);
            if !window::before(start, cutoff) {
                break;
            }
        }

        debug!(
            resource = %resource_key,
            chunks = series.chunks,
            total = series.total,
            "finished gathering metrics"
        );
        Ok(series)
    }

    fn query(&self, resource_key: &str, window: TimeWindow) -> MetricQuery {
        MetricQuery {
            id: window::query_id(window.start()),
            dimension: Dimension::new(&self.target.dimension_name, resource_key),
            metric_name: self.target.metric_name.clone(),
            namespace: self.target.namespace.clone(),
            statistic: Statistic::Sum,
            window,
            period_secs: self.period.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use drainwatch_core::{AlarmSpec, BackendError, BackendFuture};

    use crate::memory::InMemoryBackend;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn lb_target() -> MetricTarget {
        MetricTarget {
            dimension_name: "LoadBalancer".to_string(),
            metric_name: "RequestCount".to_string(),
            namespace: "AWS/ApplicationELB".to_string(),
        }
    }

    fn aggregator(backend: Arc<dyn MetricBackend>) -> MetricWindowAggregator {
        MetricWindowAggregator::new(backend, lb_target(), Duration::from_secs(3600))
    }

    /// Returns the same canned points for every query.
    struct Repeating {
        points: Vec<MetricPoint>,
        calls: Mutex<usize>,
    }

    impl MetricBackend for Repeating {
        fn put_alarm<'a>(&'a self, _spec: &'a AlarmSpec) -> BackendFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn query_series<'a>(&'a self, _query: &'a MetricQuery) -> BackendFuture<'a, Vec<MetricPoint>> {
            *self.calls.lock().unwrap() += 1;
            let points = self.points.clone();
            Box::pin(async move { Ok(points) })
        }
    }

    #[tokio::test]
    async fn start_at_or_after_cutoff_makes_no_calls() {
        let backend = Arc::new(InMemoryBackend::new());
        let agg = aggregator(backend.clone());
        let t = at("2024-01-01T12:00:00Z");

        let same = agg.collect_windowed("app/web/1", t, t).await.unwrap();
        let after = agg
            .collect_windowed("app/web/1", t + chrono::Duration::hours(1), t)
            .await
            .unwrap();

        assert_eq!(same, WindowedSeries::default());
        assert_eq!(after, WindowedSeries::default());
        assert!(backend.queries().await.is_empty());
    }

    #[tokio::test]
    async fn splits_at_midnight_and_clips_to_cutoff() {
        let backend = Arc::new(InMemoryBackend::new());
        let agg = aggregator(backend.clone());

        let series = agg
            .collect_windowed("app/web/1", at("2024-01-01T23:00:00Z"), at("2024-01-02T02:00:00Z"))
            .await
            .unwrap();

        let queries = backend.queries().await;
        assert_eq!(series.chunks, 2);
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].window.start(), at("2024-01-01T23:00:00Z"));
        assert_eq!(queries[0].window.end(), at("2024-01-01T23:59:59Z"));
        assert_eq!(queries[1].window.start(), at("2024-01-02T00:00:00Z"));
        assert_eq!(queries[1].window.end(), at("2024-01-02T02:00:00Z"));
        assert_eq!(queries[0].id, "m20240101230000");
        assert_eq!(queries[0].period_secs, 3600);
        assert_eq!(queries[0].statistic, Statistic::Sum);
    }

    #[tokio::test]
    async fn cutoff_on_day_end_is_single_chunk() {
        let backend = Arc::new(InMemoryBackend::new());
        let agg = aggregator(backend.clone());

        let series = agg
            .collect_windowed("app/web/1", at("2024-01-01T08:00:00Z"), at("2024-01-01T23:59:59Z"))
            .await
            .unwrap();
        assert_eq!(series.chunks, 1);
    }

    #[tokio::test]
    async fn iterations_stay_within_bound() {
        let backend = Arc::new(InMemoryBackend::new());
        let agg = aggregator(backend.clone());
        let cases = [
            ("2024-01-01T00:00:00Z", "2024-01-08T00:00:00Z"),
            ("2024-01-01T13:37:00Z", "2024-01-05T00:00:01Z"),
            ("2024-01-01T23:59:59Z", "2024-01-02T00:00:00Z"),
            ("2024-02-27T06:00:00Z", "2024-03-02T18:30:00Z"),
        ];

        for (start, cutoff) in cases {
            let (start, cutoff) = (at(start), at(cutoff));
            let series = agg.collect_windowed("app/web/1", start, cutoff).await.unwrap();
            let secs = (cutoff - start).num_seconds();
            let bound = (secs + window::DAY_SECS - 1) / window::DAY_SECS + 1;
            assert!(series.chunks as i64 <= bound, "{start} → {cutoff}: {} chunks", series.chunks);
        }
    }

    #[tokio::test]
    async fn sums_across_chunks() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .insert_series(
                Dimension::new("LoadBalancer", "app/web/1"),
                "RequestCount",
                vec![
                    MetricPoint::new(at("2024-01-01T22:00:00Z"), 1.0),
                    MetricPoint::new(at("2024-01-01T23:00:00Z"), 10.0),
                    MetricPoint::new(at("2024-01-02T01:00:00Z"), 5.0),
                    MetricPoint::new(at("2024-01-02T03:00:00Z"), 99.0),
                ],
            )
            .await;
        let agg = aggregator(backend);

        let series = agg
            .collect_windowed("app/web/1", at("2024-01-01T23:00:00Z"), at("2024-01-02T02:00:00Z"))
            .await
            .unwrap();

        assert_eq!(series.total, 15.0);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points["2024-01-01T23:00:00Z"], 10.0);
        assert_eq!(series.points["2024-01-02T01:00:00Z"], 5.0);
    }

    #[tokio::test]
    async fn total_counts_overwritten_keys() {
        let backend = Arc::new(Repeating {
            points: vec![MetricPoint::new(at("2024-01-01T00:00:00Z"), 4.0)],
            calls: Mutex::new(0),
        });
        let agg = aggregator(backend.clone());

        let series = agg
            .collect_windowed("app/web/1", at("2024-01-01T00:00:00Z"), at("2024-01-03T12:00:00Z"))
            .await
            .unwrap();

        assert_eq!(*backend.calls.lock().unwrap(), 3);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.total, 12.0);
    }

    #[tokio::test]
    async fn backend_failure_discards_partial_result() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .fail_queries_for("app/web/1", 1, BackendError::Throttled("rate exceeded".into()))
            .await;
        let agg = aggregator(backend.clone());

        let err = agg
            .collect_windowed("app/web/1", at("2024-01-01T00:00:00Z"), at("2024-01-04T00:00:00Z"))
            .await
            .unwrap_err();

        match err {
            CollectError::Backend { resource, source } => {
                assert_eq!(resource, "app/web/1");
                assert_eq!(source, BackendError::Throttled("rate exceeded".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.queries().await.len(), 2);
    }
}
