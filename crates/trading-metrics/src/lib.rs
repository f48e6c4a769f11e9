//! Performance metrics for the trend engine.
//!
//! [`MetricsTracker`] folds closed trades and equity snapshots in O(1) per
//! event; [`recompute`] derives the same figures from full history.

mod report;
mod stats;
mod tracker;

pub use report::PerformanceReport;
pub use stats::RunningStats;
pub use tracker::{recompute, EquityPoint, MetricValue, MetricsSnapshot, MetricsTracker};

/// Default annualization for per-period returns.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;
