//! Metrics aggregator: bounded per-metric-type time series,
//! percentile summaries, downsampling, and a Prometheus export surface.

pub mod aggregator;
pub mod prometheus_export;
pub mod range;
pub mod types;

pub use aggregator::{AggregatorConfig, MetricsAggregator};
pub use prometheus_export::export as export_prometheus;
pub use range::TimeRange;
pub use types::{AlignedSeries, Breakdown, Bucket, MetricFilters, Summary, TimeSeries};
