//! Axum router assembly: `/api`-prefixed REST routes, `/ws/events`,
//! and the top-level `/health`/`/ready` probes, wrapped in CORS,
//! compression, trace, and rate-limit layers.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{context, health, models, pipeline, query, routing, settings, timeseries, ws};
use crate::middleware;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_host: "127.0.0.1".to_string(), port: 8000 }
    }
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/query", post(query::submit_query))
        .route("/models/registry", get(models::get_registry))
        .route("/models/rescan", post(models::rescan))
        .route("/models/{id}/tier", put(models::update_tier))
        .route("/models/{id}/thinking", put(models::update_thinking))
        .route("/models/{id}/enabled", put(models::update_enabled))
        .route("/models/servers", get(models::list_servers))
        .route("/models/servers/start-all", post(models::start_all))
        .route("/models/servers/stop-all", post(models::stop_all))
        .route("/models/servers/{id}/start", post(models::start_server))
        .route("/models/servers/{id}/stop", post(models::stop_server))
        .route("/models/tiers/{tier}", get(models::list_by_tier))
        .route("/models/profiles", get(models::list_profiles).post(models::put_profile))
        .route("/models/profiles/{name}", get(models::get_profile).delete(models::delete_profile))
        .route("/pipeline/status/{query_id}", get(pipeline::get_status))
        .route("/pipeline/stats", get(pipeline::get_stats))
        .route("/context/allocation/{query_id}", get(context::get_allocation))
        .route("/context/stats", get(context::get_stats))
        .route("/timeseries", get(timeseries::get_series))
        .route("/timeseries/summary", get(timeseries::get_summary))
        .route("/timeseries/comparison", get(timeseries::get_comparison))
        .route("/timeseries/models", get(timeseries::get_model_breakdown))
        .route("/metrics", get(timeseries::get_prometheus_export))
        .route("/metrics/routing", get(routing::get_routing_analytics))
        .route("/settings", get(settings::get_settings).put(settings::put_settings))
        .route("/settings/reset", post(settings::reset_settings))
        .route("/settings/validate", post(settings::validate_settings))
        .route("/settings/import", post(settings::import_settings))
        .route("/settings/export", get(settings::export_settings))
        .route("/settings/vram-estimate", get(settings::vram_estimate))
        .route("/settings/schema", get(settings::schema))
}

/// Builds the full `Router`, ready for `axum::serve`. The caller is
/// responsible for `.into_make_service_with_connect_info::<SocketAddr>()`
/// since the rate-limit layer needs the peer address.
pub fn build_router(state: Arc<AppState>, _config: &ServerConfig) -> Router {
    let api = api_router().layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit));

    Router::new()
        .nest("/api", api)
        .route("/ws/events", get(ws::ws_events))
        .merge(health::health_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
