//! Prometheus text-format export, alongside the `/timeseries*` JSON REST
//! surface (ambient observability alongside the query API).

use fleet_types::MetricType;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::aggregator::MetricsAggregator;
use crate::range::TimeRange;
use crate::types::MetricFilters;

/// Renders a fresh snapshot of every metric type's 1h summary (plus
/// per-model breakdown) as Prometheus text format. A new `Registry` is
/// built on every call rather than kept as long-lived global state, since
/// the aggregator itself is already the source of truth.
pub fn export(aggregator: &MetricsAggregator) -> String {
    let registry = Registry::new();
    let filters = MetricFilters::default();

    for metric_type in MetricType::ALL {
        let summary = aggregator.summary(metric_type, TimeRange::OneHour, &filters);
        let name = format!("fleetctl_{}", metric_type.as_str());

        for (suffix, value) in [
            ("_min", summary.min),
            ("_max", summary.max),
            ("_avg", summary.avg),
            ("_p50", summary.p50),
            ("_p95", summary.p95),
            ("_p99", summary.p99),
        ] {
            let gauge = match Gauge::with_opts(Opts::new(format!("{name}{suffix}"), format!("{} ({suffix} over 1h)", metric_type.as_str()))) {
                Ok(g) => g,
                Err(e) => {
                    warn!(metric = metric_type.as_str(), error = %e, "failed to build prometheus gauge");
                    continue;
                }
            };
            gauge.set(value);
            if let Err(e) = registry.register(Box::new(gauge)) {
                warn!(metric = metric_type.as_str(), error = %e, "failed to register prometheus gauge");
            }
        }

        let breakdown = aggregator.breakdown(metric_type, TimeRange::OneHour);
        for (model_id, summary) in breakdown.per_model {
            let opts = Opts::new(format!("{name}_avg_by_model"), format!("{} average over 1h by model", metric_type.as_str()))
                .const_label("model_id", model_id);
            let gauge = match Gauge::with_opts(opts) {
                Ok(g) => g,
                Err(e) => {
                    warn!(metric = metric_type.as_str(), error = %e, "failed to build per-model prometheus gauge");
                    continue;
                }
            };
            gauge.set(summary.avg);
            if let Err(e) = registry.register(Box::new(gauge)) {
                warn!(metric = metric_type.as_str(), error = %e, "failed to register per-model prometheus gauge");
            }
        }
    }

    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "failed to encode prometheus metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorConfig;
    use fleet_types::MetricMetadata;

    #[test]
    fn export_includes_every_metric_type() {
        let agg = MetricsAggregator::new(AggregatorConfig::default());
        agg.record(MetricType::ResponseTime, 42.0, MetricMetadata::default());
        let text = export(&agg);
        assert!(text.contains("fleetctl_response_time_avg"));
    }
}
