//! Routing analytics (`/metrics/routing`).
//!
//! `decisionMatrix` buckets the `MetricType::ComplexityScore` time series
//! (recorded once per query by `Orchestrator::run_pipeline`) by the floor of
//! the score crossed with the tier that was actually selected, recovering
//! the score/tier pairing from each point's `metadata.tier`.
//! `accuracyMetrics` comes straight from `Orchestrator::routing_stats`.
//! `modelAvailability` is computed directly from the registry and manager,
//! since it reflects current state rather than history.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use fleet_metrics::{MetricFilters, TimeRange};
use fleet_types::{MetricType, Tier};
use serde::Serialize;

use crate::json::CamelJson;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct DecisionBucket {
    pub complexity: u32,
    pub tier: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelAvailability {
    pub tier: String,
    pub available: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingAnalytics {
    pub decision_matrix: Vec<DecisionBucket>,
    pub accuracy_metrics: fleet_orchestrator::RoutingStats,
    pub model_availability: Vec<ModelAvailability>,
}

pub async fn get_routing_analytics(State(state): State<Arc<AppState>>) -> CamelJson<RoutingAnalytics> {
    let points = state.metrics.raw_points(MetricType::ComplexityScore, TimeRange::ThirtyDays, &MetricFilters::default());

    let mut buckets: HashMap<(u32, String), (usize, f64)> = HashMap::new();
    for point in &points {
        let tier = point.metadata.tier.clone().unwrap_or_else(|| "unknown".to_string());
        let bucket = point.value.floor().clamp(0.0, 10.0) as u32;
        let entry = buckets.entry((bucket, tier)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += point.value;
    }
    let mut decision_matrix: Vec<DecisionBucket> = buckets
        .into_iter()
        .map(|((complexity, tier), (count, sum))| DecisionBucket { complexity, tier, count, avg_score: sum / count as f64 })
        .collect();
    decision_matrix.sort_by(|a, b| a.complexity.cmp(&b.complexity).then_with(|| a.tier.cmp(&b.tier)));

    let model_availability = [Tier::Fast, Tier::Balanced, Tier::Powerful]
        .into_iter()
        .map(|tier| {
            let models = state.registry.list_enabled().into_iter().filter(|m| m.effective_tier() == tier).collect::<Vec<_>>();
            let available = models.iter().filter(|m| state.manager.is_ready(&m.id)).count();
            ModelAvailability { tier: tier.as_str().to_string(), available, total: models.len() }
        })
        .collect();

    CamelJson(RoutingAnalytics {
        decision_matrix,
        accuracy_metrics: state.orchestrator.routing_stats(),
        model_availability,
    })
}
