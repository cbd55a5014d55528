//! Model registry, server lifecycle, tier/thinking/enabled overrides, and
//! profile CRUD (`/models/*`).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use fleet_registry::{persistence, Profile};
use fleet_types::{MetricMetadata, MetricType, Tier};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::json::CamelJson;
use crate::state::AppState;

async fn persist_registry(state: &AppState) -> Result<(), ApiError> {
    let snapshot = state.registry.snapshot();
    persistence::save(&state.registry_path, &snapshot).await?;
    Ok(())
}

pub async fn get_registry(State(state): State<Arc<AppState>>) -> CamelJson<fleet_types::ModelRegistrySnapshot> {
    CamelJson(state.registry.snapshot())
}

pub async fn rescan(State(state): State<Arc<AppState>>) -> ApiResult<CamelJson<serde_json::Value>> {
    let added = state.registry.rescan().await?;
    persist_registry(&state).await?;
    Ok(CamelJson(serde_json::json!({ "added": added })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBody {
    pub tier: Option<Tier>,
}

pub async fn update_tier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<TierBody>,
) -> ApiResult<CamelJson<serde_json::Value>> {
    state.registry.update_tier(&id, body.tier)?;
    persist_registry(&state).await?;
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingBody {
    pub thinking: Option<bool>,
}

pub async fn update_thinking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ThinkingBody>,
) -> ApiResult<CamelJson<serde_json::Value>> {
    state.registry.update_thinking(&id, body.thinking)?;
    persist_registry(&state).await?;
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledBody {
    pub enabled: bool,
}

/// `PUT /models/{id}/enabled`: toggling `enabled` also starts or
/// stops the backing inference server. The model-load time is recorded
/// against `MetricType::ModelLoad` the same way a direct
/// `POST /models/servers/{id}/start` would.
pub async fn update_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<EnabledBody>,
) -> ApiResult<CamelJson<serde_json::Value>> {
    state.registry.toggle_enabled(&id, body.enabled)?;
    persist_registry(&state).await?;

    if body.enabled {
        if let Some(model) = state.registry.get(&id) {
            let started = Instant::now();
            state.manager.start(&model).await?;
            state.metrics.record(
                MetricType::ModelLoad,
                started.elapsed().as_millis() as f64,
                MetricMetadata { model_id: Some(id.clone()), ..Default::default() },
            );
        }
    } else {
        state.manager.stop(&id).await?;
    }
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}

pub async fn list_servers(State(state): State<Arc<AppState>>) -> CamelJson<Vec<fleet_inference::ServerStatus>> {
    CamelJson(state.manager.list_status())
}

pub async fn start_server(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<CamelJson<fleet_inference::ServerStatus>> {
    let model = state.registry.get(&id).ok_or_else(|| ApiError(fleet_types::FleetError::NotFound(id.clone())))?;
    let started = Instant::now();
    let status = state.manager.start(&model).await?;
    state.metrics.record(
        MetricType::ModelLoad,
        started.elapsed().as_millis() as f64,
        MetricMetadata { model_id: Some(id), ..Default::default() },
    );
    Ok(CamelJson(status))
}

pub async fn stop_server(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<CamelJson<serde_json::Value>> {
    state.manager.stop(&id).await?;
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}

pub async fn start_all(State(state): State<Arc<AppState>>) -> CamelJson<serde_json::Value> {
    let models = state.registry.list_enabled();
    let results = state.manager.start_all(&models).await;
    let summary: Vec<_> = results
        .into_iter()
        .map(|(id, result)| serde_json::json!({ "model_id": id, "ok": result.is_ok() }))
        .collect();
    CamelJson(serde_json::json!({ "results": summary }))
}

pub async fn stop_all(State(state): State<Arc<AppState>>) -> CamelJson<serde_json::Value> {
    let results = state.manager.stop_all().await;
    let summary: Vec<_> = results
        .into_iter()
        .map(|(id, result)| serde_json::json!({ "model_id": id, "ok": result.is_ok() }))
        .collect();
    CamelJson(serde_json::json!({ "results": summary }))
}

pub async fn list_by_tier(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
) -> ApiResult<CamelJson<Vec<fleet_types::Model>>> {
    let tier = Tier::parse(&tier).ok_or_else(|| ApiError(fleet_types::FleetError::Validation(format!("unknown tier: {tier}"))))?;
    let models = state.registry.list_all().into_iter().filter(|m| m.effective_tier() == tier).collect();
    Ok(CamelJson(models))
}

pub async fn list_profiles(State(state): State<Arc<AppState>>) -> CamelJson<Vec<Profile>> {
    CamelJson(state.profiles.list())
}

pub async fn get_profile(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> ApiResult<CamelJson<Profile>> {
    state.profiles.get(&name).map(CamelJson).ok_or_else(|| ApiError(fleet_types::FleetError::NotFound(name)))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub name: String,
    pub enabled_model_ids: Vec<String>,
    #[serde(default)]
    pub tier_config: fleet_types::TierThresholds,
    #[serde(default)]
    pub default_mode_knobs: fleet_registry::ProfileModeKnobs,
}

impl From<ProfileBody> for Profile {
    fn from(body: ProfileBody) -> Self {
        Profile {
            name: body.name,
            enabled_model_ids: body.enabled_model_ids,
            tier_config: body.tier_config,
            default_mode_knobs: body.default_mode_knobs,
        }
    }
}

pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProfileBody>,
) -> ApiResult<CamelJson<serde_json::Value>> {
    let profile: Profile = body.into();
    fleet_registry::profile::apply(&profile, &state.registry)?;
    persist_registry(&state).await?;
    state.profiles.put(profile).await?;
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}

pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<CamelJson<serde_json::Value>> {
    let removed = state.profiles.delete(&name).await?;
    if !removed {
        return Err(ApiError(fleet_types::FleetError::NotFound(name)));
    }
    Ok(CamelJson(serde_json::json!({ "ok": true })))
}
