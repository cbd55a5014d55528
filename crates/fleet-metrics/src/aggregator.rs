//! Bounded per-metric-type time-series store.
//!
//! Each `MetricType` gets its own ring (capacity 500,000, oldest evicted on
//! overflow) guarded by its own lock, so appends to `response_time` never
//! contend with reads of `tokens_per_second`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use fleet_types::{MetricMetadata, MetricPoint, MetricType};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::range::TimeRange;
use crate::types::{AlignedSeries, Breakdown, Bucket, MetricFilters, Summary, TimeSeries};

/// Ring capacity per metric type.
pub const RING_CAPACITY: usize = 500_000;

#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub max_retention: chrono::Duration,
    pub cleanup_interval: StdDuration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_retention: chrono::Duration::days(30),
            cleanup_interval: StdDuration::from_secs(3600),
        }
    }
}

struct Ring {
    points: RwLock<VecDeque<MetricPoint>>,
}

impl Ring {
    fn new() -> Self {
        Self { points: RwLock::new(VecDeque::with_capacity(1024)) }
    }

    fn push(&self, point: MetricPoint) {
        let mut guard = self.points.write();
        if guard.len() >= RING_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(point);
    }

    fn snapshot(&self) -> Vec<MetricPoint> {
        self.points.read().iter().cloned().collect()
    }

    fn evict_older_than(&self, cutoff: chrono::DateTime<Utc>) -> usize {
        let mut guard = self.points.write();
        let before = guard.len();
        while let Some(front) = guard.front() {
            if front.timestamp < cutoff {
                guard.pop_front();
            } else {
                break;
            }
        }
        before - guard.len()
    }
}

pub struct MetricsAggregator {
    config: AggregatorConfig,
    rings: HashMap<MetricType, Ring>,
}

impl MetricsAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let rings = MetricType::ALL.into_iter().map(|t| (t, Ring::new())).collect();
        Self { config, rings }
    }

    fn ring(&self, metric_type: MetricType) -> &Ring {
        self.rings.get(&metric_type).expect("every MetricType variant has a ring")
    }

    /// `Record`: O(1) append.
    pub fn record(&self, metric_type: MetricType, value: f64, metadata: MetricMetadata) {
        self.ring(metric_type).push(MetricPoint { metric_type, timestamp: Utc::now(), value, metadata });
    }

    fn filtered_in_range(&self, metric_type: MetricType, range: TimeRange, filters: &MetricFilters) -> Vec<MetricPoint> {
        let cutoff = Utc::now() - range.window();
        self.ring(metric_type)
            .snapshot()
            .into_iter()
            .filter(|p| p.timestamp >= cutoff && filters.matches(p))
            .collect()
    }

    /// Raw, un-bucketed points in `range` matching `filters`, metadata intact.
    /// Used by routing analytics (`/metrics/routing`), which needs
    /// the per-point `tier`/`query_mode` tags that `query`'s `Bucket`
    /// projection strips.
    pub fn raw_points(&self, metric_type: MetricType, range: TimeRange, filters: &MetricFilters) -> Vec<MetricPoint> {
        self.filtered_in_range(metric_type, range, filters)
    }

    /// `Query`.
    pub fn query(&self, metric_type: MetricType, range: TimeRange, filters: &MetricFilters) -> TimeSeries {
        let points = self.filtered_in_range(metric_type, range, filters);
        let buckets = match range.bucket_width() {
            None => points.into_iter().map(|p| Bucket { timestamp: p.timestamp, value: p.value }).collect(),
            Some(width) => downsample(points, width),
        };
        TimeSeries { metric_type, points: buckets }
    }

    /// `Summary`.
    pub fn summary(&self, metric_type: MetricType, range: TimeRange, filters: &MetricFilters) -> Summary {
        let values = self.filtered_in_range(metric_type, range, filters).into_iter().map(|p| p.value).collect();
        Summary::from_values(values)
    }

    /// `Comparison`: aligned buckets across several metric types for a
    /// multi-line chart. Uses each type's own downsampling rule for `range`,
    /// then unions the bucket timestamps.
    pub fn comparison(&self, metric_types: &[MetricType], range: TimeRange) -> AlignedSeries {
        let filters = MetricFilters::default();
        let per_type: Vec<(MetricType, Vec<Bucket>)> = metric_types
            .iter()
            .map(|t| (*t, self.query(*t, range, &filters).points))
            .collect();

        let mut timestamps: Vec<chrono::DateTime<Utc>> =
            per_type.iter().flat_map(|(_, points)| points.iter().map(|b| b.timestamp)).collect();
        timestamps.sort();
        timestamps.dedup();

        let mut series = HashMap::new();
        for (metric_type, points) in &per_type {
            let by_ts: HashMap<chrono::DateTime<Utc>, f64> = points.iter().map(|b| (b.timestamp, b.value)).collect();
            let row = timestamps.iter().map(|ts| by_ts.get(ts).copied()).collect();
            series.insert(metric_type.as_str().to_string(), row);
        }

        AlignedSeries { timestamps, series }
    }

    /// `Breakdown`: per-model summaries for one metric type.
    pub fn breakdown(&self, metric_type: MetricType, range: TimeRange) -> Breakdown {
        let points = self.filtered_in_range(metric_type, range, &MetricFilters::default());
        let mut by_model: HashMap<String, Vec<f64>> = HashMap::new();
        for point in points {
            let key = point.metadata.model_id.clone().unwrap_or_else(|| "unknown".to_string());
            by_model.entry(key).or_default().push(point.value);
        }
        let per_model = by_model.into_iter().map(|(model, values)| (model, Summary::from_values(values))).collect();
        Breakdown { metric_type, per_model }
    }

    fn sweep(&self) {
        let cutoff = Utc::now() - self.config.max_retention;
        let mut total = 0;
        for metric_type in MetricType::ALL {
            total += self.ring(metric_type).evict_older_than(cutoff);
        }
        if total > 0 {
            debug!(evicted = total, "metrics TTL sweep evicted stale samples");
        }
    }

    /// Background TTL cleanup loop (hourly, removes samples
    /// older than `max_retention`).
    pub fn start_cleanup(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.cleanup_interval;
        info!(?interval, "starting metrics TTL cleanup loop");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

/// Buckets `points` into fixed-width windows starting at each bucket's
/// aligned start ("bucket timestamp is bucket start; bucket
/// value is mean").
fn downsample(mut points: Vec<MetricPoint>, width: chrono::Duration) -> Vec<Bucket> {
    points.sort_by_key(|p| p.timestamp);
    let width_ms = width.num_milliseconds().max(1);

    let mut buckets: Vec<(i64, Vec<f64>)> = Vec::new();
    for point in points {
        let bucket_start_ms = (point.timestamp.timestamp_millis() / width_ms) * width_ms;
        match buckets.last_mut() {
            Some((start, values)) if *start == bucket_start_ms => values.push(point.value),
            _ => buckets.push((bucket_start_ms, vec![point.value])),
        }
    }

    buckets
        .into_iter()
        .map(|(start_ms, values)| Bucket {
            timestamp: chrono::DateTime::from_timestamp_millis(start_ms).unwrap_or_else(Utc::now),
            value: values.iter().sum::<f64>() / values.len() as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> MetricsAggregator {
        MetricsAggregator::new(AggregatorConfig::default())
    }

    #[test]
    fn record_then_query_returns_the_point() {
        let agg = aggregator();
        agg.record(MetricType::ResponseTime, 120.0, MetricMetadata::default());
        let series = agg.query(MetricType::ResponseTime, TimeRange::OneHour, &MetricFilters::default());
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].value, 120.0);
    }

    #[test]
    fn ring_evicts_oldest_on_overflow() {
        let agg = aggregator();
        for i in 0..(RING_CAPACITY + 10) {
            agg.record(MetricType::ModelLoad, i as f64, MetricMetadata::default());
        }
        let ring = agg.ring(MetricType::ModelLoad);
        assert_eq!(ring.points.read().len(), RING_CAPACITY);
        assert_eq!(ring.points.read().front().unwrap().value, 10.0);
    }

    #[test]
    fn filters_restrict_to_matching_metadata() {
        let agg = aggregator();
        agg.record(
            MetricType::ResponseTime,
            1.0,
            MetricMetadata { model_id: Some("model-a".to_string()), ..Default::default() },
        );
        agg.record(
            MetricType::ResponseTime,
            2.0,
            MetricMetadata { model_id: Some("model-b".to_string()), ..Default::default() },
        );
        let filters = MetricFilters { model_id: Some("model-a".to_string()), ..Default::default() };
        let series = agg.query(MetricType::ResponseTime, TimeRange::OneHour, &filters);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].value, 1.0);
    }

    #[test]
    fn breakdown_groups_by_model() {
        let agg = aggregator();
        agg.record(
            MetricType::TokensPerSecond,
            10.0,
            MetricMetadata { model_id: Some("model-a".to_string()), ..Default::default() },
        );
        agg.record(
            MetricType::TokensPerSecond,
            20.0,
            MetricMetadata { model_id: Some("model-a".to_string()), ..Default::default() },
        );
        agg.record(
            MetricType::TokensPerSecond,
            99.0,
            MetricMetadata { model_id: Some("model-b".to_string()), ..Default::default() },
        );
        let breakdown = agg.breakdown(MetricType::TokensPerSecond, TimeRange::OneHour);
        assert_eq!(breakdown.per_model.len(), 2);
        assert_eq!(breakdown.per_model["model-a"].avg, 15.0);
    }

    #[test]
    fn comparison_aligns_multiple_metric_types() {
        let agg = aggregator();
        agg.record(MetricType::ResponseTime, 1.0, MetricMetadata::default());
        agg.record(MetricType::CacheHitRate, 0.9, MetricMetadata::default());
        let aligned = agg.comparison(&[MetricType::ResponseTime, MetricType::CacheHitRate], TimeRange::OneHour);
        assert_eq!(aligned.series.len(), 2);
    }

    #[test]
    fn downsample_groups_points_into_mean_buckets() {
        let width = chrono::Duration::minutes(10);
        let base = Utc::now();
        let points = vec![
            MetricPoint { metric_type: MetricType::ResponseTime, timestamp: base, value: 10.0, metadata: MetricMetadata::default() },
            MetricPoint {
                metric_type: MetricType::ResponseTime,
                timestamp: base + chrono::Duration::seconds(30),
                value: 20.0,
                metadata: MetricMetadata::default(),
            },
        ];
        let buckets = downsample(points, width);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].value, 15.0);
    }

    #[test]
    fn sweep_evicts_samples_older_than_retention() {
        let config = AggregatorConfig { max_retention: chrono::Duration::seconds(0), ..AggregatorConfig::default() };
        let agg = MetricsAggregator::new(config);
        agg.record(MetricType::ResponseTime, 1.0, MetricMetadata::default());
        agg.sweep();
        let series = agg.query(MetricType::ResponseTime, TimeRange::ThirtyDays, &MetricFilters::default());
        assert!(series.points.is_empty());
    }
}
