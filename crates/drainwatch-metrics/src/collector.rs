//! Request statistics for load balancers and target groups being drained.
//!
//! Each resource is aggregated on its own task with its own window cursor;
//! a bounded semaphore limits how many hit the backend at once. Finished
//! resources are merged into the report by a single loop, so no entry is
//! ever written twice or half-written.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use drainwatch_core::{CollectorSettings, MetricBackend, StatisticsReport};

use crate::aggregator::{MetricTarget, MetricWindowAggregator};
use crate::error::{CollectError, CollectResult};

/// The kinds of routing resource whose request counts indicate live traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    TargetGroup,
    LoadBalancer,
}

impl ResourceKind {
    pub fn dimension_name(&self) -> &'static str {
        match self {
            ResourceKind::TargetGroup => "TargetGroup",
            ResourceKind::LoadBalancer => "LoadBalancer",
        }
    }

    pub fn metric_name(&self) -> &'static str {
        match self {
            ResourceKind::TargetGroup => "RequestCountPerTarget",
            ResourceKind::LoadBalancer => "RequestCount",
        }
    }

    /// CloudWatch dimension value for a fully-qualified ARN.
    ///
    /// `arn:…:targetgroup/web/abc` → `targetgroup/web/abc`,
    /// `arn:…:loadbalancer/app/web/abc` → `app/web/abc`.
    /// Identifiers without the delimiter are returned unchanged.
    pub fn short_name<'a>(&self, identifier: &'a str) -> &'a str {
        match self {
            ResourceKind::TargetGroup => identifier
                .rsplit_once(':')
                .map_or(identifier, |(_, name)| name),
            ResourceKind::LoadBalancer => identifier
                .split_once('/')
                .map_or(identifier, |(_, name)| name),
        }
    }
}

/// Builds a [`StatisticsReport`] per resource kind.
pub struct ResourceStatisticsCollector {
    backend: Arc<dyn MetricBackend>,
    namespace: String,
    period: Duration,
    max_concurrency: usize,
}

impl ResourceStatisticsCollector {
    /// Create a collector with default settings.
    pub fn new(backend: Arc<dyn MetricBackend>) -> Self {
        Self::from_settings(backend, &CollectorSettings::default())
    }

    pub fn from_settings(backend: Arc<dyn MetricBackend>, settings: &CollectorSettings) -> Self {
        Self {
            backend,
            namespace: settings.namespace.clone(),
            period: settings.period,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    /// Limit how many resources are collected at once. `1` is sequential.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// The aggregator used for one kind of resource.
    pub fn aggregator(&self, kind: ResourceKind) -> MetricWindowAggregator {
        MetricWindowAggregator::new(
            self.backend.clone(),
            MetricTarget {
                dimension_name: kind.dimension_name().to_string(),
                metric_name: kind.metric_name().to_string(),
                namespace: self.namespace.clone(),
            },
            self.period,
        )
    }

    pub async fn collect_target_groups<S: AsRef<str>>(
        &self,
        arns: &[S],
        range_start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> CollectResult<StatisticsReport> {
        self.collect_all(ResourceKind::TargetGroup, arns, range_start, cutoff)
            .await
    }

    pub async fn collect_load_balancers<S: AsRef<str>>(
        &self,
        arns: &[S],
        range_start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> CollectResult<StatisticsReport> {
        self.collect_all(ResourceKind::LoadBalancer, arns, range_start, cutoff)
            .await
    }

    /// Collect request statistics for every identifier over `[range_start, cutoff]`.
    ///
    /// Every requested resource gets an entry, with `total` zero when the
    /// backend had no data. The first failing resource aborts the rest and
    /// its error is returned instead of a report.
    pub async fn collect_all<S: AsRef<str>>(
        &self,
        kind: ResourceKind,
        identifiers: &[S],
        range_start: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> CollectResult<StatisticsReport> {
        let mut seen = HashSet::new();
        let names: Vec<String> = identifiers
            .iter()
            .map(|id| kind.short_name(id.as_ref()).to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for name in names {
            let aggregator = self.aggregator(kind);
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| CollectError::Worker(e.to_string()))?;
                debug!(
                    resource = %name,
                    kind = ?kind,
                    metric = %aggregator.target().metric_name,
                    "collecting request statistics"
                );
                let series = aggregator
                    .collect_windowed(&name, range_start, cutoff)
                    .await?;
                Ok::<_, CollectError>(series.into_statistics(name))
            });
        }

        let mut report = StatisticsReport::new();
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| CollectError::Worker(e.to_string()))
                .and_then(|r| r);
            match result {
                Ok(stats) => report.insert(stats),
                Err(e) => {
                    warn!(kind = ?kind, error = %e, "aborting statistics collection");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        info!(
            kind = ?kind,
            resources = report.len(),
            total = report.grand_total(),
            "request statistics collected"
        );
        Ok(report)
    }
}
