//! Health and readiness check endpoints.
//!
//! GET /health - liveness probe (server is up)
//! GET /ready  - readiness probe (registry has at least been loaded)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Readiness is a lightweight check that the registry lock is reachable,
/// reporting how many models are currently known and enabled.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models = state.registry.list_all();
    let enabled = models.iter().filter(|m| m.enabled).count();
    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "models": models.len(), "enabled": enabled })),
    )
}

pub fn health_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;
    axum::Router::new().route("/health", get(health)).route("/ready", get(ready))
}
