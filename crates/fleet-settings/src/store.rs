//! Runtime settings store.
//!
//! A single in-memory `RuntimeSettings`, validated on load and on every
//! `put`, persisted with atomic rewrite. Fields named in
//! `RuntimeSettings::RESTART_REQUIRED_FIELDS` are applied in-memory
//! immediately but flagged so the UI can prompt for a restart — 
//! is explicit that the change still takes effect now, just not for
//! already-running subprocesses.

use std::path::PathBuf;

use fleet_types::RuntimeSettings;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::env;
use crate::error::SettingsError;
use crate::persistence;
use crate::validate;

#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub settings: RuntimeSettings,
    pub restart_required: Vec<&'static str>,
}

pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<RuntimeSettings>,
}

impl SettingsStore {
    /// Loads `path` if present, applies the env var overlay (exact-name
    /// vars first, then the generic `FLEET__` layer), validates, and falls
    /// back to defaults on any validation failure rather than refusing to
    /// start.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let mut settings = persistence::load(&path).await?.unwrap_or_default();
        env::apply_named_vars(&mut settings);
        env::apply_prefixed_overlay(&mut settings);

        if let Err(e) = validate::validate(&settings) {
            warn!(error = %e, "loaded settings failed validation, falling back to defaults");
            settings = RuntimeSettings::default();
        }

        info!(scan_path = %settings.scan_path, port_range = ?settings.port_range, "runtime settings loaded");
        Ok(Self { path, settings: RwLock::new(settings) })
    }

    pub fn get(&self) -> RuntimeSettings {
        self.settings.read().clone()
    }

    /// `Put`: validate, compute the restart-required diff against the
    /// current settings, persist atomically, then apply in-memory.
    pub async fn put(&self, new_settings: RuntimeSettings) -> Result<PutOutcome, SettingsError> {
        validate::validate(&new_settings)?;

        let restart_required = {
            let current = self.settings.read();
            current.restart_required_changes(&new_settings).to_vec()
        };

        persistence::save(&self.path, &new_settings).await?;
        *self.settings.write() = new_settings.clone();

        if !restart_required.is_empty() {
            warn!(fields = ?restart_required, "settings change requires a restart to fully take effect");
        }

        Ok(PutOutcome { settings: new_settings, restart_required })
    }

    pub async fn reset(&self) -> Result<PutOutcome, SettingsError> {
        self.put(RuntimeSettings::default()).await
    }

    pub fn validate_candidate(&self, candidate: &RuntimeSettings) -> Result<(), SettingsError> {
        validate::validate(candidate)
    }

    pub fn export(&self) -> serde_json::Value {
        serde_json::to_value(self.get()).expect("RuntimeSettings always serializes")
    }

    pub async fn import(&self, value: serde_json::Value) -> Result<PutOutcome, SettingsError> {
        let parsed: RuntimeSettings =
            serde_json::from_value(value).map_err(|e| SettingsError::Validation(format!("malformed settings document: {e}")))?;
        self.put(parsed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_falls_back_to_defaults_when_no_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("runtime_settings.json")).await.unwrap();
        assert_eq!(store.get().scan_path, RuntimeSettings::default().scan_path);
    }

    #[tokio::test]
    async fn put_persists_and_flags_restart_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("runtime_settings.json")).await.unwrap();

        let mut updated = store.get();
        updated.scan_path = "/new/path".to_string();
        updated.cgrag_token_budget = 8000;
        let outcome = store.put(updated).await.unwrap();

        assert_eq!(outcome.restart_required, vec!["scan_path"]);
        assert_eq!(store.get().scan_path, "/new/path");
        assert_eq!(store.get().cgrag_token_budget, 8000);
    }

    #[tokio::test]
    async fn put_rejects_invalid_settings_without_mutating_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("runtime_settings.json")).await.unwrap();

        let mut invalid = store.get();
        invalid.cgrag_token_budget = 0;
        let result = store.put(invalid).await;

        assert!(result.is_err());
        assert_eq!(store.get().cgrag_token_budget, RuntimeSettings::default().cgrag_token_budget);
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("runtime_settings.json")).await.unwrap();
        let mut updated = store.get();
        updated.cgrag_token_budget = 1;
        store.put(updated).await.unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.get().cgrag_token_budget, RuntimeSettings::default().cgrag_token_budget);
    }

    #[tokio::test]
    async fn export_then_import_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("runtime_settings.json")).await.unwrap();
        let exported = store.export();
        let outcome = store.import(exported).await.unwrap();
        assert_eq!(outcome.settings.scan_path, RuntimeSettings::default().scan_path);
    }

    #[tokio::test]
    async fn reload_after_put_observes_the_persisted_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_settings.json");
        let store = SettingsStore::load(&path).await.unwrap();
        let mut updated = store.get();
        updated.cgrag_token_budget = 12345;
        store.put(updated).await.unwrap();

        let reloaded = SettingsStore::load(&path).await.unwrap();
        assert_eq!(reloaded.get().cgrag_token_budget, 12345);
    }
}
