//! Atomic JSON persistence for `runtime_settings.json`.
//!
//! Mirrors `fleet-registry`'s write-to-temp + rename pattern: a crash
//! mid-write never leaves a truncated settings file on disk, and a reload
//! after a clean write is bit-identical to what was written.

use fleet_types::RuntimeSettings;
use std::path::Path;

use crate::error::SettingsError;

pub async fn load(path: &Path) -> Result<Option<RuntimeSettings>, SettingsError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let settings = serde_json::from_slice(&bytes).map_err(|e| SettingsError::Persistence(e.to_string()))?;
            Ok(Some(settings))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SettingsError::Persistence(e.to_string())),
    }
}

pub async fn save(path: &Path, settings: &RuntimeSettings) -> Result<(), SettingsError> {
    let json = serde_json::to_vec_pretty(settings).map_err(|e| SettingsError::Persistence(e.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(|e| SettingsError::Persistence(e.to_string()))?;
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| SettingsError::Persistence(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_settings.json");
        let settings = RuntimeSettings::default();
        save(&path, &settings).await.unwrap();
        let loaded = load(&path).await.unwrap().expect("file should exist");
        assert_eq!(loaded.scan_path, settings.scan_path);
        assert_eq!(loaded.port_range, settings.port_range);
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reload_is_bit_identical_canonical_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_settings.json");
        let settings = RuntimeSettings::default();
        save(&path, &settings).await.unwrap();
        let first = tokio::fs::read(&path).await.unwrap();
        let loaded = load(&path).await.unwrap().unwrap();
        save(&path, &loaded).await.unwrap();
        let second = tokio::fs::read(&path).await.unwrap();
        assert_eq!(first, second);
    }
}
