//! Value types shared across drainwatch crates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// Symbolic action name → backend policy identifier (ARN).
pub type ActionResolutionTable = HashMap<String, String>;

/// CloudWatch statistic applied to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    SampleCount,
    Average,
    Sum,
    Minimum,
    Maximum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::SampleCount => "SampleCount",
            Statistic::Average => "Average",
            Statistic::Sum => "Sum",
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an alarm compares its statistic against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
    LessThanLowerOrGreaterThanUpperThreshold,
    LessThanLowerThreshold,
    GreaterThanUpperThreshold,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThanOrEqualToThreshold => "GreaterThanOrEqualToThreshold",
            Self::GreaterThanThreshold => "GreaterThanThreshold",
            Self::LessThanThreshold => "LessThanThreshold",
            Self::LessThanOrEqualToThreshold => "LessThanOrEqualToThreshold",
            Self::LessThanLowerOrGreaterThanUpperThreshold => {
                "LessThanLowerOrGreaterThanUpperThreshold"
            }
            Self::LessThanLowerThreshold => "LessThanLowerThreshold",
            Self::GreaterThanUpperThreshold => "GreaterThanUpperThreshold",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-owned alarm template, not yet bound to a scaling group.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDefinition {
    pub name: String,
    pub metric: String,
    pub namespace: String,
    pub statistic: Statistic,
    pub comparison_operator: ComparisonOperator,
    pub threshold: f64,
    pub period: Duration,
    pub evaluation_periods: u32,
    /// Symbolic action names, resolved through an [`ActionResolutionTable`].
    pub actions: Vec<String>,
}

/// Name/value pair scoping a metric query or alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Concrete alarm request submitted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub action_arns: Vec<String>,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: Statistic,
    pub comparison_operator: ComparisonOperator,
    pub threshold: f64,
    pub period_secs: u64,
    pub evaluation_periods: u32,
    pub dimension: Dimension,
}

/// A single datapoint of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One metric-data query over a single window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub id: String,
    pub dimension: Dimension,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: Statistic,
    pub window: TimeWindow,
    pub period_secs: u64,
}

/// Request statistics for one resource over its whole window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatistics {
    pub resource_name: String,
    /// RFC 3339 timestamp → value, chronological by key.
    pub points: BTreeMap<String, f64>,
    /// Running sum of every value received, including overwritten keys.
    pub total: f64,
}

impl ResourceStatistics {
    pub fn empty(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            points: BTreeMap::new(),
            total: 0.0,
        }
    }

    /// True when the resource saw at most `threshold` requests.
    pub fn is_idle(&self, threshold: f64) -> bool {
        self.total <= threshold
    }
}

/// Short resource name → statistics, built once per collection call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsReport {
    resources: BTreeMap<String, ResourceStatistics>,
}

impl StatisticsReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource's finished statistics, replacing any prior entry.
    pub fn insert(&mut self, stats: ResourceStatistics) {
        self.resources.insert(stats.resource_name.clone(), stats);
    }

    pub fn get(&self, resource_name: &str) -> Option<&ResourceStatistics> {
        self.resources.get(resource_name)
    }

    pub fn contains(&self, resource_name: &str) -> bool {
        self.resources.contains_key(resource_name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceStatistics> {
        self.resources.values()
    }

    /// Sum of every resource's total.
    pub fn grand_total(&self) -> f64 {
        self.resources.values().map(|r| r.total).sum()
    }

    /// Names of resources whose total is at most `threshold`.
    pub fn idle_resources(&self, threshold: f64) -> Vec<&str> {
        self.resources
            .values()
            .filter(|r| r.is_idle(threshold))
            .map(|r| r.resource_name.as_str())
            .collect()
    }

    /// Absorb another report; entries in `other` win on key collision.
    pub fn extend(&mut self, other: StatisticsReport) {
        self.resources.extend(other.resources);
    }
}
