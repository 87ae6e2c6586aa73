//! drainwatch.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{AlarmDefinition, ComparisonOperator, Statistic};
use crate::window::HOUR_SECS;

pub const DEFAULT_NAMESPACE: &str = "AWS/ApplicationELB";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrainwatchConfig {
    pub collector: Option<CollectorConfig>,
    #[serde(default)]
    pub alarms: Vec<AlarmConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub namespace: Option<String>,
    pub period: Option<String>,
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    pub name: String,
    pub metric: String,
    pub namespace: String,
    pub statistic: Statistic,
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    pub period: String,
    pub evaluation_periods: u32,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Resolved collector settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSettings {
    pub namespace: String,
    pub period: Duration,
    pub max_concurrency: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            period: Duration::from_secs(HOUR_SECS as u64),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl DrainwatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn collector_settings(&self) -> Result<CollectorSettings, ConfigError> {
        let mut settings = CollectorSettings::default();
        let Some(raw) = &self.collector else {
            return Ok(settings);
        };
        if let Some(ns) = &raw.namespace {
            settings.namespace = ns.clone();
        }
        if let Some(period) = &raw.period {
            let period = parse_duration(period)?;
            check_period(period).map_err(|reason| ConfigError::InvalidCollector {
                reason: format!("period {reason}"),
            })?;
            settings.period = period;
        }
        if let Some(n) = raw.max_concurrency {
            settings.max_concurrency = n.max(1);
        }
        Ok(settings)
    }

    /// Validate and convert every `[[alarms]]` entry, in file order.
    pub fn alarm_definitions(&self) -> Result<Vec<AlarmDefinition>, ConfigError> {
        self.alarms.iter().map(AlarmConfig::to_definition).collect()
    }
}

impl std::str::FromStr for DrainwatchConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl AlarmConfig {
    pub fn to_definition(&self) -> Result<AlarmDefinition, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAlarm {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.metric.trim().is_empty() {
            return Err(invalid("metric must not be empty"));
        }
        if self.evaluation_periods == 0 {
            return Err(invalid("evaluation_periods must be at least 1"));
        }

        let period = parse_duration(&self.period)?;
        check_period(period).map_err(|reason| invalid(&format!("period {reason}")))?;

        Ok(AlarmDefinition {
            name: self.name.clone(),
            metric: self.metric.clone(),
            namespace: self.namespace.clone(),
            statistic: self.statistic,
            comparison_operator: self.comparison,
            threshold: self.threshold,
            period,
            evaluation_periods: self.evaluation_periods,
            actions: self.actions.clone(),
        })
    }
}

/// Parse a duration string like "30s", "5m", "1h", or bare seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let (digits, unit) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 60 * 60),
        Some(_) => (s, 1),
        None => return Err(invalid()),
    };
    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    let secs = n.checked_mul(unit).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}

/// CloudWatch accepts 10s and 30s high-resolution periods, otherwise whole minutes.
fn check_period(period: Duration) -> Result<(), &'static str> {
    let secs = period.as_secs();
    if period.subsec_nanos() == 0 && (secs == 10 || secs == 30 || (secs > 0 && secs % 60 == 0)) {
        Ok(())
    } else {
        Err("must be 10s, 30s, or a multiple of 60s")
    }
}
