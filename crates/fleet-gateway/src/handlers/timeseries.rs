//! Time-series query endpoints (`/timeseries*`).

use std::sync::Arc;

use axum::extract::{Query, State};
use fleet_metrics::{MetricFilters, TimeRange};
use fleet_types::{FleetError, MetricType};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::json::CamelJson;
use crate::state::AppState;

fn parse_metric(s: &str) -> Result<MetricType, ApiError> {
    MetricType::parse(s).ok_or_else(|| ApiError(FleetError::Validation(format!("unknown metric: {s}"))))
}

fn parse_range(s: &str) -> Result<TimeRange, ApiError> {
    TimeRange::parse(s).ok_or_else(|| ApiError(FleetError::Validation(format!("unknown range: {s}"))))
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub metric: String,
    pub range: String,
    pub model: Option<String>,
    pub tier: Option<String>,
    #[serde(rename = "queryMode")]
    pub query_mode: Option<String>,
}

pub async fn get_series(State(state): State<Arc<AppState>>, Query(q): Query<SeriesQuery>) -> ApiResult<CamelJson<fleet_metrics::TimeSeries>> {
    let metric = parse_metric(&q.metric)?;
    let range = parse_range(&q.range)?;
    let filters = MetricFilters { model_id: q.model, tier: q.tier, query_mode: q.query_mode };
    Ok(CamelJson(state.metrics.query(metric, range, &filters)))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub metric: String,
    pub range: String,
}

pub async fn get_summary(State(state): State<Arc<AppState>>, Query(q): Query<SummaryQuery>) -> ApiResult<CamelJson<fleet_metrics::Summary>> {
    let metric = parse_metric(&q.metric)?;
    let range = parse_range(&q.range)?;
    Ok(CamelJson(state.metrics.summary(metric, range, &MetricFilters::default())))
}

#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    pub metrics: String,
    pub range: String,
}

pub async fn get_comparison(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ComparisonQuery>,
) -> ApiResult<CamelJson<fleet_metrics::AlignedSeries>> {
    let range = parse_range(&q.range)?;
    let metric_types = q
        .metrics
        .split(',')
        .map(|s| parse_metric(s.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CamelJson(state.metrics.comparison(&metric_types, range)))
}

#[derive(Debug, Deserialize)]
pub struct BreakdownQuery {
    pub metric: String,
    pub range: String,
}

pub async fn get_model_breakdown(
    State(state): State<Arc<AppState>>,
    Query(q): Query<BreakdownQuery>,
) -> ApiResult<CamelJson<fleet_metrics::Breakdown>> {
    let metric = parse_metric(&q.metric)?;
    let range = parse_range(&q.range)?;
    Ok(CamelJson(state.metrics.breakdown(metric, range)))
}

/// `GET /metrics` — Prometheus text-format scrape target, alongside the
/// JSON `/timeseries*` surface above.
pub async fn get_prometheus_export(State(state): State<Arc<AppState>>) -> impl axum::response::IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        fleet_metrics::export_prometheus(&state.metrics),
    )
}
