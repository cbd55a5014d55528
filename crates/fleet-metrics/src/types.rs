//! Query-result shapes returned by the aggregator for the `/timeseries*`
//! endpoints.

use std::collections::HashMap;

use fleet_types::{MetricPoint, MetricType};
use serde::Serialize;

/// A single downsampled or raw bucket.
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub metric_type: MetricType,
    pub points: Vec<Bucket>,
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Summary {
    /// Percentiles computed by sort over the filtered window.
    pub fn from_values(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Summary::default();
        }
        values.sort_by(|a, b| a.partial_cmp(b).expect("metric values are never NaN"));
        let min = values[0];
        let max = values[values.len() - 1];
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Summary {
            min,
            max,
            avg,
            p50: percentile(&values, 0.50),
            p95: percentile(&values, 0.95),
            p99: percentile(&values, 0.99),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignedSeries {
    pub timestamps: Vec<chrono::DateTime<chrono::Utc>>,
    /// One row per requested metric type, aligned to `timestamps` by index.
    pub series: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub metric_type: MetricType,
    pub per_model: HashMap<String, Summary>,
}

/// Filters applied to a `Query`/`Summary`/`Breakdown` call.
#[derive(Debug, Clone, Default)]
pub struct MetricFilters {
    pub model_id: Option<String>,
    pub tier: Option<String>,
    pub query_mode: Option<String>,
}

impl MetricFilters {
    pub fn matches(&self, point: &MetricPoint) -> bool {
        if let Some(model_id) = &self.model_id {
            if point.metadata.model_id.as_deref() != Some(model_id.as_str()) {
                return false;
            }
        }
        if let Some(tier) = &self.tier {
            if point.metadata.tier.as_deref() != Some(tier.as_str()) {
                return false;
            }
        }
        if let Some(query_mode) = &self.query_mode {
            if point.metadata.query_mode.as_deref() != Some(query_mode.as_str()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_empty_is_all_zero() {
        let s = Summary::from_values(vec![]);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.p99, 0.0);
    }

    #[test]
    fn summary_percentiles_match_sorted_rank() {
        let s = Summary::from_values((1..=100).map(|v| v as f64).collect());
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 100.0);
        assert_eq!(s.p50, 51.0);
        assert_eq!(s.p99, 99.0);
    }
}
