//! Shared application state for the control-plane server.

use std::sync::Arc;

use fleet_context::Allocator;
use fleet_events::EventBus;
use fleet_inference::Manager;
use fleet_metrics::MetricsAggregator;
use fleet_orchestrator::Orchestrator;
use fleet_pipeline::Tracker;
use fleet_registry::{ProfileStore, Registry};
use fleet_settings::SettingsStore;

use crate::middleware::RateLimiter;

/// State shared across all request handlers. Kept as a plain struct
/// (not `Clone`) and threaded through as `State<Arc<AppState>>`, matching
/// the one handler this crate started from.
pub struct AppState {
    pub registry: Arc<Registry>,
    pub manager: Arc<Manager>,
    pub orchestrator: Arc<Orchestrator>,
    pub tracker: Arc<Tracker>,
    pub events: Arc<EventBus>,
    pub metrics: Arc<MetricsAggregator>,
    pub allocator: Arc<Allocator>,
    pub settings: Arc<SettingsStore>,
    pub profiles: Arc<ProfileStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub registry_path: std::path::PathBuf,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        manager: Arc<Manager>,
        orchestrator: Arc<Orchestrator>,
        tracker: Arc<Tracker>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsAggregator>,
        allocator: Arc<Allocator>,
        settings: Arc<SettingsStore>,
        profiles: Arc<ProfileStore>,
        rate_limiter: Arc<RateLimiter>,
        registry_path: std::path::PathBuf,
    ) -> Self {
        Self {
            registry,
            manager,
            orchestrator,
            tracker,
            events,
            metrics,
            allocator,
            settings,
            profiles,
            rate_limiter,
            registry_path,
        }
    }
}
