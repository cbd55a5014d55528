//! Inference server process manager.
//!
//! `Manager` owns at most one subprocess handle per `model_id`
//! (invariant: exactly one handle per model). `Start` blocks until the
//! model reports ready or `max_startup_seconds` elapses; a background task
//! per handle watches for unexpected process exit and removes the entry.

use chrono::Utc;
use dashmap::DashMap;
use fleet_types::Model;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::client::InferenceClient;
use crate::config::ManagerConfig;
use crate::error::InferenceError;
use crate::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerState {
    Starting,
    Ready,
    Stopping,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerStatus {
    pub model_id: String,
    pub pid: u32,
    pub port: u16,
    pub started_at: chrono::DateTime<Utc>,
    pub state: ServerState,
}

struct Handle {
    model_id: String,
    pid: u32,
    port: u16,
    started_at: chrono::DateTime<Utc>,
    state: ServerState,
    child: Child,
}

pub struct Manager {
    config: ManagerConfig,
    client: InferenceClient,
    readiness_pattern: Regex,
    handles: Arc<DashMap<String, Arc<Mutex<Handle>>>>,
}

impl Manager {
    pub fn new(config: ManagerConfig) -> Self {
        let readiness_pattern = Regex::new(&format!("(?i){}", config.readiness_pattern))
            .unwrap_or_else(|_| Regex::new("(?i)listening on").expect("fallback regex is valid"));
        Self {
            config,
            client: InferenceClient::new(),
            readiness_pattern,
            handles: Arc::new(DashMap::new()),
        }
    }

    pub fn status(&self, model_id: &str) -> Option<ServerStatus> {
        let handle = self.handles.get(model_id)?.clone();
        // Best-effort snapshot; a concurrent stop could race this, which is
        // fine since the caller is reading a point-in-time view.
        let guard = handle.try_lock().ok()?;
        Some(ServerStatus {
            model_id: guard.model_id.clone(),
            pid: guard.pid,
            port: guard.port,
            started_at: guard.started_at,
            state: guard.state,
        })
    }

    pub fn is_ready(&self, model_id: &str) -> bool {
        self.status(model_id).is_some_and(|s| s.state == ServerState::Ready)
    }

    pub fn list_status(&self) -> Vec<ServerStatus> {
        self.handles
            .iter()
            .filter_map(|entry| {
                let guard = entry.value().try_lock().ok()?;
                Some(ServerStatus {
                    model_id: guard.model_id.clone(),
                    pid: guard.pid,
                    port: guard.port,
                    started_at: guard.started_at,
                    state: guard.state,
                })
            })
            .collect()
    }

    /// `Start`: idempotent. Blocks until ready or `max_startup_seconds`.
    pub async fn start(&self, model: &Model) -> Result<ServerStatus, InferenceError> {
        if let Some(existing) = self.status(&model.id) {
            return Ok(existing);
        }

        let mut child = process::spawn(model, &self.config)?;
        let pid = child.id().unwrap_or(0);
        let started_at = Utc::now();

        match process::wait_for_readiness(&model.id, &mut child, &self.readiness_pattern, self.config.max_startup_seconds).await {
            Ok(()) => {
                let handle = Arc::new(Mutex::new(Handle {
                    model_id: model.id.clone(),
                    pid,
                    port: model.port,
                    started_at,
                    state: ServerState::Ready,
                    child,
                }));
                self.handles.insert(model.id.clone(), handle.clone());
                spawn_exit_watcher(model.id.clone(), handle, self.handles.clone());
                info!(model_id = %model.id, pid, port = model.port, "inference server ready");
                Ok(ServerStatus {
                    model_id: model.id.clone(),
                    pid,
                    port: model.port,
                    started_at,
                    state: ServerState::Ready,
                })
            }
            Err(e) => {
                warn!(model_id = %model.id, error = %e, "inference server failed to become ready, killing");
                let _ = child.kill().await;
                Err(e)
            }
        }
    }

    /// `Stop`: SIGTERM, wait up to `grace_seconds`, then SIGKILL. Always
    /// removes the handle, even if the model was never running.
    pub async fn stop(&self, model_id: &str) -> Result<(), InferenceError> {
        let Some((_, handle)) = self.handles.remove(model_id) else {
            return Ok(());
        };
        let mut guard = handle.lock().await;
        guard.state = ServerState::Stopping;
        process::graceful_shutdown(model_id, &mut guard.child, self.config.grace_seconds).await;
        Ok(())
    }

    /// `StartAll`: concurrent or sequential per `config.concurrent_starts`.
    /// One model's failure never aborts the others.
    pub async fn start_all(&self, models: &[Model]) -> Vec<(String, Result<ServerStatus, InferenceError>)> {
        if self.config.concurrent_starts {
            let futures = models.iter().map(|m| async move { (m.id.clone(), self.start(m).await) });
            futures::future::join_all(futures).await
        } else {
            let mut results = Vec::with_capacity(models.len());
            for model in models {
                results.push((model.id.clone(), self.start(model).await));
            }
            results
        }
    }

    /// `StopAll`: concurrent stops with grace.
    pub async fn stop_all(&self) -> Vec<(String, Result<(), InferenceError>)> {
        let ids: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        let futures = ids.into_iter().map(|id| async move {
            let result = self.stop(&id).await;
            (id, result)
        });
        futures::future::join_all(futures).await
    }

    /// `Call`: OpenAI-compatible chat completion against the running model.
    pub async fn call(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<(String, u32), InferenceError> {
        let status = self
            .status(model_id)
            .ok_or_else(|| InferenceError::NotRunning(model_id.to_string()))?;
        if status.state != ServerState::Ready {
            return Err(InferenceError::NotReady(model_id.to_string()));
        }

        self.client
            .call(
                model_id,
                &self.config.bind_host,
                status.port,
                prompt,
                max_tokens,
                temperature,
                Duration::from_secs(self.config.call_timeout_seconds),
            )
            .await
    }
}

/// Watches a running child for unexpected exit and removes its handle,
/// 's "READY → (removed) on observed process exit".
fn spawn_exit_watcher(model_id: String, handle: Arc<Mutex<Handle>>, handles: Arc<DashMap<String, Arc<Mutex<Handle>>>>) {
    tokio::spawn(async move {
        let status = {
            let mut guard = handle.lock().await;
            guard.child.wait().await
        };
        match status {
            Ok(exit_status) if exit_status.success() => {
                info!(model_id = %model_id, "inference server exited");
            }
            Ok(exit_status) => {
                error!(model_id = %model_id, code = ?exit_status.code(), "inference server crashed");
            }
            Err(e) => {
                error!(model_id = %model_id, error = %e, "error waiting on inference server process");
            }
        }
        handles.remove(&model_id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model(id: &str, port: u16) -> Model {
        Model {
            id: id.to_string(),
            path: "/dev/null".to_string(),
            family: "test".to_string(),
            version: "1".to_string(),
            size_params: 1.0,
            quantization: fleet_types::Quantization::Q4KM,
            is_thinking: false,
            thinking_override: None,
            is_coder: false,
            is_instruct: true,
            assigned_tier: fleet_types::Tier::Fast,
            tier_override: None,
            port,
            enabled: true,
            missing_file_warning: None,
        }
    }

    #[tokio::test]
    async fn start_fails_fast_when_binary_missing() {
        let config = ManagerConfig::default().with_binary_path("/nonexistent/llama-server-binary");
        let manager = Manager::new(config);
        let model = test_model("test-model", 19999);
        let result = manager.start(&model).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stop_on_unknown_model_is_a_no_op() {
        let manager = Manager::new(ManagerConfig::default());
        let result = manager.stop("never-started").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn call_on_unknown_model_is_not_running() {
        let manager = Manager::new(ManagerConfig::default());
        let result = manager.call("never-started", "hi", 10, 0.5).await;
        assert!(matches!(result, Err(InferenceError::NotRunning(_))));
    }
}
