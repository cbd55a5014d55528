//! `POST /query`: the only endpoint that drives the six-stage
//! pipeline. Validation errors and no-model-available both surface as
//! their mapped status directly from `Orchestrator::process_query`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use fleet_orchestrator::QueryRequest;

use crate::error::ApiResult;
use crate::json::CamelJson;
use crate::state::AppState;

pub async fn submit_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<CamelJson<fleet_orchestrator::QueryResponse>> {
    let response = state.orchestrator.process_query(request).await?;
    Ok(CamelJson(response))
}
