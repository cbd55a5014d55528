//! Atomic JSON persistence for the registry file.
//!
//! Writes go to a sibling temp file and then `rename` into place so a crash
//! mid-write never leaves a truncated registry file on disk.

use fleet_types::ModelRegistrySnapshot;
use std::path::Path;

use crate::error::RegistryError;

pub async fn load(path: &Path) -> Result<Option<ModelRegistrySnapshot>, RegistryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let snapshot = serde_json::from_slice(&bytes)
                .map_err(|e| RegistryError::Persistence(e.to_string()))?;
            Ok(Some(snapshot))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RegistryError::Persistence(e.to_string())),
    }
}

pub async fn save(path: &Path, snapshot: &ModelRegistrySnapshot) -> Result<(), RegistryError> {
    let json = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| RegistryError::Persistence(e.to_string()))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| RegistryError::Persistence(e.to_string()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| RegistryError::Persistence(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::TierThresholds;
    use std::collections::HashMap;

    fn sample() -> ModelRegistrySnapshot {
        ModelRegistrySnapshot {
            models: HashMap::new(),
            scan_path: "/models".to_string(),
            port_range: (8100, 8200),
            tier_thresholds: TierThresholds::default(),
            last_scan_at: None,
        }
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        save(&path, &sample()).await.unwrap();
        let loaded = load(&path).await.unwrap().expect("file should exist");
        assert_eq!(loaded.scan_path, "/models");
        assert_eq!(loaded.port_range, (8100, 8200));
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load(&path).await.unwrap().is_none());
    }
}
