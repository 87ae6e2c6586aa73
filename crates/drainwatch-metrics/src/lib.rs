//! drainwatch-metrics — did a draining resource still receive traffic?
//!
//! Sums the ALB request-count metric of each load balancer or target group
//! over a window that ends at the resource's decommission deadline.
//!
//! # Architecture
//!
//! ```text
//! ResourceStatisticsCollector
//!   ├── collect_all() ← one task per resource, bounded by a semaphore
//!   └── MetricWindowAggregator
//!         └── collect_windowed() → one MetricBackend query per UTC day,
//!                                   last chunk clipped to the cutoff
//!
//! InMemoryBackend
//!   └── replayed series + captured alarms, for tests and dry runs
//! ```

pub mod aggregator;
pub mod collector;
pub mod error;
pub mod memory;

pub use aggregator::{MetricTarget, MetricWindowAggregator, WindowedSeries};
pub use collector::{ResourceKind, ResourceStatisticsCollector};
pub use error::{CollectError, CollectResult};
pub use memory::InMemoryBackend;
