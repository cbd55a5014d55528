//! Profile CRUD: a named, persisted triple
//! `(enabled_model_ids[], tier_config, default_mode_knobs)`. Loading a
//! profile sets `enabled` on exactly the ids it names and clears it on
//! every other model.
//!
//! Grounded on the same atomic-rewrite persistence pattern as
//! [`crate::persistence`] and `fleet-settings::store::SettingsStore`: an
//! in-memory `HashMap` behind a `parking_lot::RwLock`, rewritten to disk in
//! full on every mutation.

use std::collections::HashMap;
use std::path::PathBuf;

use fleet_types::TierThresholds;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::registry::Registry;

/// Per-mode generation knobs a profile can pin, mirroring the tunables on
/// `QueryRequest` (`fleet-orchestrator`) that make sense to fix ahead of
/// time for a given hardware/use-case profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileModeKnobs {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub council_adversarial: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub enabled_model_ids: Vec<String>,
    #[serde(default)]
    pub tier_config: TierThresholds,
    #[serde(default)]
    pub default_mode_knobs: ProfileModeKnobs,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileStoreSnapshot {
    profiles: HashMap<String, Profile>,
}

pub struct ProfileStore {
    state: RwLock<ProfileStoreSnapshot>,
    path: PathBuf,
}

impl ProfileStore {
    /// Loads `path` if present, otherwise starts empty (first `save` creates
    /// the file).
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| RegistryError::Persistence(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProfileStoreSnapshot::default(),
            Err(e) => return Err(RegistryError::Persistence(e.to_string())),
        };
        Ok(Self { state: RwLock::new(snapshot), path })
    }

    pub fn list(&self) -> Vec<Profile> {
        self.state.read().profiles.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Profile> {
        self.state.read().profiles.get(name).cloned()
    }

    pub async fn put(&self, profile: Profile) -> Result<(), RegistryError> {
        {
            let mut state = self.state.write();
            state.profiles.insert(profile.name.clone(), profile);
        }
        self.persist().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, RegistryError> {
        let removed = {
            let mut state = self.state.write();
            state.profiles.remove(name).is_some()
        };
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    async fn persist(&self) -> Result<(), RegistryError> {
        let snapshot = { self.state.read().profiles.clone() };
        let json = serde_json::to_vec_pretty(&ProfileStoreSnapshot { profiles: snapshot })
            .map_err(|e| RegistryError::Persistence(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await.map_err(|e| RegistryError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| RegistryError::Persistence(e.to_string()))?;
        Ok(())
    }
}

/// Applies `profile` to `registry`: enables exactly `enabled_model_ids`,
/// disables every other known model. Unknown ids in the profile are
/// skipped rather than erroring, since a profile may outlive a rescan that
/// dropped a model.
pub fn apply(profile: &Profile, registry: &Registry) -> Result<(), RegistryError> {
    let wanted: std::collections::HashSet<&str> = profile.enabled_model_ids.iter().map(String::as_str).collect();
    for model in registry.list_all() {
        let should_enable = wanted.contains(model.id.as_str());
        if model.enabled != should_enable {
            registry.toggle_enabled(&model.id, should_enable)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::TierThresholds;

    fn sample_profile() -> Profile {
        Profile {
            name: "coding".to_string(),
            enabled_model_ids: vec!["model-a".to_string()],
            tier_config: TierThresholds::default(),
            default_mode_knobs: ProfileModeKnobs::default(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load(dir.path().join("profiles.json")).await.unwrap();
        store.put(sample_profile()).await.unwrap();
        let loaded = store.get("coding").unwrap();
        assert_eq!(loaded.enabled_model_ids, vec!["model-a".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        let store = ProfileStore::load(&path).await.unwrap();
        store.put(sample_profile()).await.unwrap();
        assert!(store.delete("coding").await.unwrap());
        assert!(store.get("coding").is_none());

        let reloaded = ProfileStore::load(&path).await.unwrap();
        assert!(reloaded.get("coding").is_none());
    }

    #[tokio::test]
    async fn missing_store_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load(dir.path().join("nope.json")).await.unwrap();
        assert!(store.list().is_empty());
    }
}
