//! Context allocation lookup and aggregate stats (`/context/*`).

use std::sync::Arc;

use axum::extract::{Path, State};
use fleet_context::AllocatorStats;
use fleet_types::{ContextAllocation, FleetError};

use crate::error::{ApiError, ApiResult};
use crate::json::CamelJson;
use crate::state::AppState;

pub async fn get_allocation(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<String>,
) -> ApiResult<CamelJson<ContextAllocation>> {
    state.allocator.get(&query_id).map(CamelJson).ok_or_else(|| ApiError(FleetError::NotFound(query_id)))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> CamelJson<AllocatorStats> {
    CamelJson(state.allocator.stats())
}
