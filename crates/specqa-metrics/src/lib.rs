//! specqa-metrics
//!
//! Rolling-window query metrics. Totals are cumulative for the life of the
//! collector; latency and component statistics cover only the retained
//! window.

pub mod collector;
pub mod stats;

pub use collector::{MetricsCollector, QueryRecord, QuerySample};
pub use stats::{
    CacheSummary, ComponentStats, LatencyStats, MetricsSummary, Overview, TimeSeries, TokenSummary,
};
