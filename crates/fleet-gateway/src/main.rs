//! fleetctl gateway — entry point.
//!
//! Loads runtime settings (file + env overlay), constructs every
//! orchestration crate, spawns background cleanup tasks, and serves the
//! axum router built in [`server`](fleet_gateway::server).
//!
//! # Environment variables
//!
//! | Variable                 | Default               |
//! |---------------------------|------------------------|
//! | `SCAN_PATH`               | `./models`             |
//! | `INFERENCE_BINARY_PATH`   | `llama-server`          |
//! | `PORT_RANGE_START`/`_END` | `8100`/`8199`           |
//! | `MAX_STARTUP_SECONDS`     | `120`                   |
//! | `CONCURRENT_STARTS`       | `true`                  |
//! | `LOG_LEVEL`               | `info`                  |
//! | `BIND_HOST`               | `127.0.0.1`             |
//! | `DATA_DIR`                | `./data`                |
//! | `GATEWAY_PORT`            | `8000`                  |
//! | `CGRAG_ENDPOINT`          | *(none, CGRAG disabled)*|
//!
//! # Exit codes
//! 0 clean shutdown, 1 config/validation error, 2 dependency unavailable
//! (inference binary missing from `$PATH` and not an existing file).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fleet_context::{Allocator, AllocatorConfig};
use fleet_events::EventBus;
use fleet_gateway::server::{build_router, ServerConfig};
use fleet_gateway::state::AppState;
use fleet_gateway::RateLimiter;
use fleet_inference::{Manager, ManagerConfig};
use fleet_metrics::{AggregatorConfig, MetricsAggregator};
use fleet_orchestrator::{HttpCgragClient, Orchestrator};
use fleet_pipeline::{Tracker, TrackerConfig};
use fleet_registry::{persistence, ProfileStore, Registry};
use fleet_settings::SettingsStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Exit code 2 (dependency unavailable) requires the inference binary to be
/// resolvable either as a bare command on `$PATH` or as an existing file path.
fn binary_available(binary_path: &str) -> bool {
    if Path::new(binary_path).is_file() {
        return true;
    }
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(binary_path).is_file())
    })
}

#[tokio::main]
async fn main() {
    let log_level = env_or("LOG_LEVEL", "info");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("fleet_gateway={log_level},fleet_orchestrator={log_level}")))
        .init();

    let data_dir = PathBuf::from(env_or("DATA_DIR", "./data"));
    if let Err(err) = tokio::fs::create_dir_all(&data_dir).await {
        error!(error = %err, "failed to create data directory");
        std::process::exit(1);
    }
    let registry_path = data_dir.join("model_registry.json");
    let settings_path = data_dir.join("runtime_settings.json");
    let profiles_path = data_dir.join("profiles.json");

    let settings = match SettingsStore::load(settings_path).await {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "invalid runtime settings");
            std::process::exit(1);
        }
    };
    let runtime_settings = settings.get();

    if !binary_available(&runtime_settings.binary_path) {
        error!(binary = %runtime_settings.binary_path, "inference binary not found on PATH or as a file");
        std::process::exit(2);
    }

    let registry = match persistence::load(&registry_path).await {
        Ok(Some(snapshot)) => Arc::new(Registry::from_snapshot(snapshot)),
        Ok(None) => Arc::new(Registry::new(
            runtime_settings.scan_path.clone(),
            runtime_settings.port_range,
            runtime_settings.tier_thresholds,
        )),
        Err(err) => {
            error!(error = %err, "failed to load model registry, starting empty");
            Arc::new(Registry::new(
                runtime_settings.scan_path.clone(),
                runtime_settings.port_range,
                runtime_settings.tier_thresholds,
            ))
        }
    };
    if let Err(err) = registry.rescan().await {
        warn!(error = %err, "initial registry scan failed");
    }
    if let Err(err) = persistence::save(&registry_path, &registry.snapshot()).await {
        warn!(error = %err, "failed to persist registry after initial scan");
    }

    let profiles = match ProfileStore::load(profiles_path).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(error = %err, "failed to load profile store");
            std::process::exit(1);
        }
    };

    let manager_config = ManagerConfig::default()
        .with_binary_path(runtime_settings.binary_path.clone())
        .with_bind_host(env_or("BIND_HOST", "127.0.0.1"));
    let manager_config = match manager_config.with_max_startup_seconds(env_parsed("MAX_STARTUP_SECONDS", 120)) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "invalid MAX_STARTUP_SECONDS");
            std::process::exit(1);
        }
    };
    let mut manager_config = manager_config;
    manager_config.concurrent_starts = env_parsed("CONCURRENT_STARTS", true);
    let manager = Arc::new(Manager::new(manager_config));

    let events = Arc::new(EventBus::new());
    let tracker = Arc::new(Tracker::new(TrackerConfig::default(), events.clone()));
    let metrics = Arc::new(MetricsAggregator::new(AggregatorConfig::default()));
    let allocator = Arc::new(Allocator::new(AllocatorConfig::default()));
    let settings = Arc::new(settings);

    let mut orchestrator = Orchestrator::new(
        registry.clone(),
        manager.clone(),
        tracker.clone(),
        events.clone(),
        metrics.clone(),
        allocator.clone(),
        settings.clone(),
    );
    if let Ok(endpoint) = std::env::var("CGRAG_ENDPOINT") {
        orchestrator = orchestrator.with_cgrag_client(Arc::new(HttpCgragClient::new(endpoint, Duration::from_secs(30))));
    }
    let orchestrator = Arc::new(orchestrator);

    tracker.clone().start_cleanup();
    metrics.clone().start_cleanup();
    allocator.clone().start_cleanup();

    let rate_limiter = Arc::new(RateLimiter::new(
        env_parsed("RATE_LIMIT_MAX_REQUESTS", 600u64),
        Duration::from_secs(env_parsed("RATE_LIMIT_WINDOW_SECONDS", 60u64)),
    ));

    let state = Arc::new(AppState::new(
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
    ));

    let server_config =
        ServerConfig { bind_host: env_or("BIND_HOST", "127.0.0.1"), port: env_parsed("GATEWAY_PORT", 8000u16) };

    let app = build_router(state, &server_config);
    let addr = format!("{}:{}", server_config.bind_host, server_config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %addr, "failed to bind gateway listener");
            std::process::exit(1);
        }
    };
    info!(addr = %addr, "fleetctl gateway listening");

    let make_service = app.into_make_service_with_connect_info::<std::net::SocketAddr>();
    if let Err(err) = axum::serve(listener, make_service).await {
        error!(error = %err, "gateway server error");
        std::process::exit(1);
    }

    std::process::exit(0);
}
