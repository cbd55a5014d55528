//! In-memory model registry.
//!
//! Holds the full set of discovered models behind a single
//! [`parking_lot::RwLock`]. Readers never block on I/O: `discover`/`rescan`
//! do their filesystem walk before taking the write lock, then apply the
//! result in one step.

use chrono::Utc;
use fleet_types::{Model, ModelRegistrySnapshot, Quantization, Tier, TierThresholds};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::discovery::{self, ParsedFilename};
use crate::error::RegistryError;

struct RegistryState {
    models: HashMap<String, Model>,
    scan_path: String,
    port_range: (u16, u16),
    tier_thresholds: TierThresholds,
    last_scan_at: Option<chrono::DateTime<Utc>>,
}

pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    pub fn new(scan_path: impl Into<String>, port_range: (u16, u16), tier_thresholds: TierThresholds) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                models: HashMap::new(),
                scan_path: scan_path.into(),
                port_range,
                tier_thresholds,
                last_scan_at: None,
            }),
        }
    }

    pub fn from_snapshot(snapshot: ModelRegistrySnapshot) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                models: snapshot.models,
                scan_path: snapshot.scan_path,
                port_range: snapshot.port_range,
                tier_thresholds: snapshot.tier_thresholds,
                last_scan_at: snapshot.last_scan_at,
            }),
        }
    }

    pub fn snapshot(&self) -> ModelRegistrySnapshot {
        let state = self.state.read();
        ModelRegistrySnapshot {
            models: state.models.clone(),
            scan_path: state.scan_path.clone(),
            port_range: state.port_range,
            tier_thresholds: state.tier_thresholds,
            last_scan_at: state.last_scan_at,
        }
    }

    pub fn get(&self, id: &str) -> Option<Model> {
        self.state.read().models.get(id).cloned()
    }

    pub fn list_enabled(&self) -> Vec<Model> {
        self.state
            .read()
            .models
            .values()
            .filter(|m| m.enabled)
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<Model> {
        self.state.read().models.values().cloned().collect()
    }

    /// `Discover`: walk `scan_path` for `.gguf` files not already registered
    /// (matched by absolute path) and add them. Already-known paths are left
    /// untouched so user overrides (`tier_override`, `enabled`, ...) survive
    /// repeated discovery. The walk result is tie-broken by `(file size,
    /// path)` before id assignment, then new models are sorted by id before
    /// port allocation, so both id collisions and port assignment are
    /// reproducible run to run regardless of filesystem iteration order.
    /// Returns the number of newly registered models.
    pub async fn discover(&self) -> Result<usize, RegistryError> {
        let scan_path = self.state.read().scan_path.clone();
        let found = walk_gguf_files(Path::new(&scan_path)).await?;
        let found = sort_by_size_then_path(found).await;

        let mut state = self.state.write();
        let known_paths: std::collections::HashSet<String> =
            state.models.values().map(|m| m.path.clone()).collect();

        let mut candidates = Vec::new();
        for path in found {
            let path_str = path.to_string_lossy().to_string();
            if known_paths.contains(&path_str) {
                continue;
            }
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let Some(parsed) = discovery::parse_filename(&filename) else {
                continue;
            };
            let id = unique_id(&parsed, &state.models, &candidates);
            candidates.push((id, filename, path_str, parsed));
        }
        // Deterministic tie-break and reproducible port assignment both key
        // off sorted id order.
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let added = candidates.len();
        for (id, filename, path_str, parsed) in candidates {
            let is_thinking = discovery::looks_like_thinking(&filename);
            let tier = assign_tier(is_thinking, parsed.size_params, parsed.quantization, &state.tier_thresholds);
            let port = allocate_port(&state.models, state.port_range)?;
            let model = Model {
                id: id.clone(),
                path: path_str,
                family: parsed.family,
                version: parsed.version,
                size_params: parsed.size_params,
                quantization: parsed.quantization,
                is_thinking,
                thinking_override: None,
                is_coder: discovery::looks_like_coder(&filename),
                is_instruct: discovery::looks_like_instruct(&filename),
                assigned_tier: tier,
                tier_override: parsed.tier_suffix,
                port,
                enabled: false,
                missing_file_warning: None,
            };
            state.models.insert(id, model);
        }
        state.last_scan_at = Some(Utc::now());
        Ok(added)
    }

    /// `Rescan`: re-walk `scan_path`, register any newly appeared files (same
    /// as `discover`), and for already-registered models whose backing file
    /// is gone: keep the entry with `missing_file_warning` set if `enabled`,
    /// otherwise drop it.
    pub async fn rescan(&self) -> Result<usize, RegistryError> {
        let added = self.discover().await?;

        let mut state = self.state.write();
        let mut to_drop = Vec::new();
        for (id, model) in state.models.iter_mut() {
            let exists = Path::new(&model.path).exists();
            if exists {
                model.missing_file_warning = None;
                continue;
            }
            if model.enabled {
                model.missing_file_warning = Some(format!("backing file not found: {}", model.path));
            } else {
                to_drop.push(id.clone());
            }
        }
        for id in to_drop {
            state.models.remove(&id);
        }
        state.last_scan_at = Some(Utc::now());
        Ok(added)
    }

    pub fn update_tier(&self, id: &str, tier_override: Option<Tier>) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let model = state
            .models
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        model.tier_override = tier_override;
        Ok(())
    }

    /// `UpdateThinking`: setting `thinking=true` with no tier
    /// override in effect also reassigns `assigned_tier` to `POWERFUL`, same
    /// as `AssignTier` would for a thinking model discovered fresh.
    pub fn update_thinking(&self, id: &str, thinking_override: Option<bool>) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let model = state
            .models
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        model.thinking_override = thinking_override;
        if thinking_override == Some(true) && model.tier_override.is_none() {
            model.assigned_tier = Tier::Powerful;
        }
        Ok(())
    }

    pub fn toggle_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let model = state
            .models
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        model.enabled = enabled;
        Ok(())
    }
}

/// `AssignTier`: `POWERFUL` if `is_thinking` or
/// `size_params >= powerful_min`; else `FAST` if `size_params < fast_max`
/// and the quantization is in the low-bit family; else `BALANCED`. This is
/// the formula for `assigned_tier` only — `tier_override` (user-set, or
/// seeded from an explicit filename suffix) always wins when reading a
/// model's effective tier.
fn assign_tier(is_thinking: bool, size_params: f64, quantization: Quantization, thresholds: &TierThresholds) -> Tier {
    if is_thinking || size_params >= thresholds.powerful_min {
        Tier::Powerful
    } else if size_params < thresholds.fast_max && quantization.is_low_bit() {
        Tier::Fast
    } else {
        Tier::Balanced
    }
}

/// spec.md §4.1: "Duplicate parses → deterministic tie-break by file size
/// then path." `read_dir` order is not guaranteed stable across
/// runs/platforms, so the walk result is re-sorted by `(file size, path)`
/// before ids are assigned — the same duplicate set then ties-break
/// identically every time, independent of filesystem iteration order.
async fn sort_by_size_then_path(found: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut sized: Vec<(u64, PathBuf)> = Vec::with_capacity(found.len());
    for path in found {
        let len = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        sized.push((len, path));
    }
    sized.sort_by(|(len_a, path_a), (len_b, path_b)| len_a.cmp(len_b).then_with(|| path_a.cmp(path_b)));
    sized.into_iter().map(|(_, path)| path).collect()
}

/// Builds a stable id from family/version/size/quant, tie-breaking
/// collisions (against both the existing registry and other candidates in
/// the same discovery batch) with a numeric suffix. Collision order within
/// a batch follows `sort_by_size_then_path`'s deterministic ordering.
fn unique_id(parsed: &ParsedFilename, existing: &HashMap<String, Model>, batch: &[(String, String, String, ParsedFilename)]) -> String {
    let base = format!(
        "{}-{}-{}b-{}",
        parsed.family,
        parsed.version,
        parsed.size_params,
        parsed.quantization.as_str().to_ascii_lowercase()
    )
    .to_ascii_lowercase();

    let taken = |candidate: &str| {
        existing.contains_key(candidate) || batch.iter().any(|(id, ..)| id == candidate)
    };

    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// `AllocatePort`: first port in `port_range` (inclusive) not already held by
/// another registered model.
fn allocate_port(existing: &HashMap<String, Model>, port_range: (u16, u16)) -> Result<u16, RegistryError> {
    let used: std::collections::HashSet<u16> = existing.values().map(|m| m.port).collect();
    for port in port_range.0..=port_range.1 {
        if !used.contains(&port) {
            return Ok(port);
        }
    }
    Err(RegistryError::PortRangeExhausted(port_range.0, port_range.1))
}

async fn walk_gguf_files(root: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(RegistryError::ScanPath(e.to_string())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::ScanPath(e.to_string()))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| RegistryError::ScanPath(e.to_string()))?;
            if file_type.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gguf")) {
                out.push(path);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, b"").await.unwrap();
    }

    #[tokio::test]
    async fn discover_registers_new_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("deepseek-r1-8b-q4_k_m-powerful.gguf")).await;
        touch(&dir.path().join("nested/llama-3.1-4b-q4_k_m.gguf")).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8200), TierThresholds::default());
        let added = registry.discover().await.unwrap();
        assert_eq!(added, 2);

        let models = registry.list_all();
        assert_eq!(models.len(), 2);
        assert!(models.iter().all(|m| !m.enabled), "discovered models start disabled");
        let powerful = models.iter().find(|m| m.family == "deepseek").unwrap();
        // size_params=8 is below powerful_min, but is_thinking (from "r1")
        // forces POWERFUL per the AssignTier formula; the filename's
        // trailing "-powerful" additionally seeds tier_override.
        assert_eq!(powerful.assigned_tier, Tier::Powerful);
        assert_eq!(powerful.tier_override, Some(Tier::Powerful));
        let fast = models.iter().find(|m| m.family == "llama").unwrap();
        assert_eq!(fast.assigned_tier, Tier::Fast);
    }

    #[tokio::test]
    async fn discover_is_idempotent_for_known_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("llama-3.1-4b-q4_k_m.gguf")).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8200), TierThresholds::default());
        registry.discover().await.unwrap();
        registry.update_tier("llama-3.1-4b-q4_k_m", Some(Tier::Powerful)).unwrap();

        let added = registry.discover().await.unwrap();
        assert_eq!(added, 0, "re-running discover must not touch known models");
        let model = registry.get("llama-3.1-4b-q4_k_m").unwrap();
        assert_eq!(model.tier_override, Some(Tier::Powerful));
    }

    /// spec.md §4.1: duplicate parses tie-break by file size then path,
    /// not by filesystem walk order. Two files that parse to the same base
    /// id must always resolve the same way — smaller file keeps the bare
    /// id, the larger gets the `-2` suffix — regardless of which directory
    /// `read_dir` happens to visit first.
    #[tokio::test]
    async fn duplicate_ids_tie_break_by_file_size_then_path() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small/llama-3.1-4b-q4_k_m.gguf");
        let large = dir.path().join("large/llama-3.1-4b-q4_k_m.gguf");
        tokio::fs::create_dir_all(small.parent().unwrap()).await.unwrap();
        tokio::fs::create_dir_all(large.parent().unwrap()).await.unwrap();
        tokio::fs::write(&small, vec![0u8; 16]).await.unwrap();
        tokio::fs::write(&large, vec![0u8; 4096]).await.unwrap();

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8200), TierThresholds::default());
        registry.discover().await.unwrap();

        let base = registry.get("llama-3.1-4b-q4_k_m").expect("smaller file keeps the bare id");
        assert_eq!(base.path, small.to_string_lossy());
        let suffixed = registry.get("llama-3.1-4b-q4_k_m-2").expect("larger file gets the -2 suffix");
        assert_eq!(suffixed.path, large.to_string_lossy());
    }

    #[tokio::test]
    async fn rescan_flags_missing_files_for_enabled_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llama-3.1-4b-q4_k_m.gguf");
        touch(&path).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8200), TierThresholds::default());
        registry.discover().await.unwrap();
        registry.toggle_enabled("llama-3.1-4b-q4_k_m", true).unwrap();

        tokio::fs::remove_file(&path).await.unwrap();
        registry.rescan().await.unwrap();

        let model = registry.get("llama-3.1-4b-q4_k_m").unwrap();
        assert!(model.is_some(), "enabled models survive a rescan with a missing file");
        let model = model.unwrap();
        assert!(model.missing_file_warning.is_some());
        assert!(model.enabled);
    }

    #[tokio::test]
    async fn rescan_drops_disabled_models_whose_file_vanished() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llama-3.1-4b-q4_k_m.gguf");
        touch(&path).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8200), TierThresholds::default());
        registry.discover().await.unwrap();

        tokio::fs::remove_file(&path).await.unwrap();
        registry.rescan().await.unwrap();

        assert!(registry.get("llama-3.1-4b-q4_k_m").is_none());
    }

    #[tokio::test]
    async fn allocates_distinct_ports() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("llama-3.1-4b-q4_k_m.gguf")).await;
        touch(&dir.path().join("mistral-v0.3-7b-q5_k_m.gguf")).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8101), TierThresholds::default());
        registry.discover().await.unwrap();

        let models = registry.list_all();
        let ports: std::collections::HashSet<u16> = models.iter().map(|m| m.port).collect();
        assert_eq!(ports.len(), 2);
    }

    #[tokio::test]
    async fn port_range_exhaustion_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a-1-4b-q4_k_m.gguf")).await;
        touch(&dir.path().join("b-1-4b-q4_k_m.gguf")).await;

        let registry = Registry::new(dir.path().to_string_lossy(), (8100, 8100), TierThresholds::default());
        let result = registry.discover().await;
        assert!(result.is_err());
    }

    #[test]
    fn assign_tier_thinking_forces_powerful_regardless_of_size() {
        let thresholds = TierThresholds::default();
        assert_eq!(assign_tier(true, 1.0, Quantization::Q8_0, &thresholds), Tier::Powerful);
    }

    #[test]
    fn assign_tier_large_size_is_powerful() {
        let thresholds = TierThresholds::default();
        assert_eq!(assign_tier(false, 70.0, Quantization::Q8_0, &thresholds), Tier::Powerful);
    }

    #[test]
    fn assign_tier_small_low_bit_is_fast() {
        let thresholds = TierThresholds::default();
        assert_eq!(assign_tier(false, 4.0, Quantization::Q4KM, &thresholds), Tier::Fast);
    }

    #[test]
    fn assign_tier_small_high_bit_is_balanced() {
        let thresholds = TierThresholds::default();
        assert_eq!(assign_tier(false, 4.0, Quantization::Q8_0, &thresholds), Tier::Balanced);
    }

    #[test]
    fn assign_tier_mid_size_is_balanced() {
        let thresholds = TierThresholds::default();
        assert_eq!(assign_tier(false, 13.0, Quantization::Q4KM, &thresholds), Tier::Balanced);
    }
}
