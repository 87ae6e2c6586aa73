//! Time-window helpers for chunked metric queries.
//!
//! CloudWatch caps how many datapoints a single `GetMetricData` call may
//! return, so windows are walked one calendar day (UTC) at a time. All
//! ordering decisions go through [`before`].

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;

pub const HOUR_SECS: i64 = 60 * 60;
pub const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Returns true iff `b` strictly follows `a`.
pub fn before(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    b.signed_duration_since(a) > Duration::zero()
}

/// Start of the epoch-aligned bucket of `period_secs` that contains `t`.
///
/// Sub-second precision is dropped. A non-positive period returns `t`.
pub fn align_to_period_start(t: DateTime<Utc>, period_secs: i64) -> DateTime<Utc> {
    if period_secs <= 0 {
        return t;
    }
    let secs = t.timestamp();
    let aligned = secs - secs.rem_euclid(period_secs);
    Utc.timestamp_opt(aligned, 0).single().unwrap_or(t)
}

/// Last second of the UTC day containing `t`.
pub fn day_end(t: DateTime<Utc>) -> DateTime<Utc> {
    align_to_period_start(t + Duration::seconds(DAY_SECS), DAY_SECS) - Duration::seconds(1)
}

/// RFC 3339 with second precision and a `Z` suffix, so keys sort chronologically.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Metric-data query id for a chunk starting at `t`.
///
/// CloudWatch ids must start with a lowercase letter.
pub fn query_id(t: DateTime<Utc>) -> String {
    format!("m{}", t.format("%Y%m%d%H%M%S"))
}

/// A closed `[start, end]` query range with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if !before(start, end) {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `t` lies within the window, both ends inclusive.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        !before(t, self.start) && !before(self.end, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn before_is_strict() {
        let t = at("2024-01-01T00:00:00Z");
        assert!(before(t, t + Duration::seconds(1)));
        assert!(!before(t, t));
        assert!(!before(t + Duration::seconds(1), t));
    }

    #[test]
    fn align_to_day() {
        let t = at("2024-03-10T17:42:13Z");
        assert_eq!(align_to_period_start(t, DAY_SECS), at("2024-03-10T00:00:00Z"));
        assert_eq!(align_to_period_start(t, HOUR_SECS), at("2024-03-10T17:00:00Z"));
    }

    #[test]
    fn align_exact_boundary_is_identity() {
        let t = at("2024-03-10T00:00:00Z");
        assert_eq!(align_to_period_start(t, DAY_SECS), t);
    }

    #[test]
    fn align_drops_subseconds() {
        let t = at("2024-03-10T00:00:00.750Z");
        assert_eq!(align_to_period_start(t, DAY_SECS), at("2024-03-10T00:00:00Z"));
    }

    #[test]
    fn align_zero_period_returns_input() {
        let t = at("2024-03-10T05:06:07Z");
        assert_eq!(align_to_period_start(t, 0), t);
    }

    #[test]
    fn day_end_of_midday_and_midnight() {
        assert_eq!(day_end(at("2024-01-01T23:00:00Z")), at("2024-01-01T23:59:59Z"));
        assert_eq!(day_end(at("2024-01-02T00:00:00Z")), at("2024-01-02T23:59:59Z"));
        assert_eq!(day_end(at("2024-02-29T12:00:00Z")), at("2024-02-29T23:59:59Z"));
    }

    #[test]
    fn formatting() {
        let t = at("2024-01-02T03:04:05Z");
        assert_eq!(format_timestamp(t), "2024-01-02T03:04:05Z");
        assert_eq!(query_id(t), "m20240102030405");
    }

    #[test]
    fn window_rejects_empty_and_inverted() {
        let t = at("2024-01-01T00:00:00Z");
        assert!(TimeWindow::new(t, t).is_err());
        assert!(TimeWindow::new(t + Duration::seconds(1), t).is_err());
        assert!(TimeWindow::new(t, t + Duration::seconds(1)).is_ok());
    }

    #[test]
    fn window_contains_is_inclusive() {
        let start = at("2024-01-01T00:00:00Z");
        let end = at("2024-01-01T23:59:59Z");
        let w = TimeWindow::new(start, end).unwrap();
        assert!(w.contains(start));
        assert!(w.contains(end));
        assert!(!w.contains(end + Duration::seconds(1)));
        assert!(!w.contains(start - Duration::seconds(1)));
    }
}
