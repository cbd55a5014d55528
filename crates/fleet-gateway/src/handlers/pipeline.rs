//! Pipeline status and aggregate stats (`/pipeline/*`).

use std::sync::Arc;

use axum::extract::{Path, State};
use fleet_pipeline::PipelineStats;
use fleet_types::{FleetError, Pipeline};

use crate::error::{ApiError, ApiResult};
use crate::json::CamelJson;
use crate::state::AppState;

pub async fn get_status(State(state): State<Arc<AppState>>, Path(query_id): Path<String>) -> ApiResult<CamelJson<Pipeline>> {
    state.tracker.get(&query_id).map(CamelJson).ok_or_else(|| ApiError(FleetError::NotFound(query_id)))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> CamelJson<PipelineStats> {
    CamelJson(state.tracker.stats())
}
