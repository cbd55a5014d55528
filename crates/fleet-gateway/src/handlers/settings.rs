//! Runtime settings CRUD and introspection (`/settings*`).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use fleet_settings::PutOutcome;
use fleet_types::RuntimeSettings;
use serde::Serialize;

use crate::error::ApiResult;
use crate::json::CamelJson;
use crate::state::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> CamelJson<RuntimeSettings> {
    CamelJson(state.settings.get())
}

#[derive(Debug, Serialize)]
pub struct PutOutcomeBody {
    pub settings: RuntimeSettings,
    pub restart_required: Vec<&'static str>,
}

impl From<PutOutcome> for PutOutcomeBody {
    fn from(outcome: PutOutcome) -> Self {
        Self { settings: outcome.settings, restart_required: outcome.restart_required }
    }
}

pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RuntimeSettings>,
) -> ApiResult<CamelJson<PutOutcomeBody>> {
    let outcome = state.settings.put(body).await?;
    Ok(CamelJson(outcome.into()))
}

pub async fn reset_settings(State(state): State<Arc<AppState>>) -> ApiResult<CamelJson<PutOutcomeBody>> {
    let outcome = state.settings.reset().await?;
    Ok(CamelJson(outcome.into()))
}

pub async fn validate_settings(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<RuntimeSettings>,
) -> CamelJson<serde_json::Value> {
    match state.settings.validate_candidate(&candidate) {
        Ok(()) => CamelJson(serde_json::json!({ "valid": true })),
        Err(err) => CamelJson(serde_json::json!({ "valid": false, "message": err.to_string() })),
    }
}

pub async fn import_settings(
    State(state): State<Arc<AppState>>,
    Json(value): Json<serde_json::Value>,
) -> ApiResult<CamelJson<PutOutcomeBody>> {
    let outcome = state.settings.import(value).await?;
    Ok(CamelJson(outcome.into()))
}

pub async fn export_settings(State(state): State<Arc<AppState>>) -> CamelJson<serde_json::Value> {
    CamelJson(state.settings.export())
}

pub async fn vram_estimate(State(state): State<Arc<AppState>>) -> CamelJson<fleet_settings::vram::VramEstimate> {
    let models = state.registry.list_enabled();
    CamelJson(fleet_settings::vram::estimate(&models))
}

pub async fn schema(State(_state): State<Arc<AppState>>) -> CamelJson<serde_json::Value> {
    CamelJson(fleet_settings::schema::describe())
}
