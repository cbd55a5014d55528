//! Runtime tunables ("RuntimeSettings").

use serde::{Deserialize, Serialize};

use crate::model::TierThresholds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DefaultTemperatures {
    pub fast: f32,
    pub balanced: f32,
    pub powerful: f32,
}

impl Default for DefaultTemperatures {
    fn default() -> Self {
        Self { fast: 0.7, balanced: 0.6, powerful: 0.4 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BenchmarkDefaults {
    pub rounds: u32,
    pub timeout_seconds: u64,
}

impl Default for BenchmarkDefaults {
    fn default() -> Self {
        Self { rounds: 3, timeout_seconds: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    pub scan_path: String,
    pub port_range: (u16, u16),
    pub binary_path: String,
    pub tier_thresholds: TierThresholds,
    pub default_temperatures: DefaultTemperatures,
    pub cgrag_token_budget: usize,
    pub benchmark_defaults: BenchmarkDefaults,
    /// Cap on concurrent per-model calls within benchmark mode's fan-out
    ///: `min(enabled_models, concurrent_calls_cap)`.
    pub concurrent_calls_cap: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            scan_path: "./models".to_string(),
            port_range: (8100, 8199),
            binary_path: "llama-server".to_string(),
            tier_thresholds: TierThresholds::default(),
            default_temperatures: DefaultTemperatures::default(),
            cgrag_token_budget: 4000,
            benchmark_defaults: BenchmarkDefaults::default(),
            concurrent_calls_cap: 8,
        }
    }
}

impl RuntimeSettings {
    /// Field names that require a subprocess restart to take effect
    /// ("scan path, port range, binary path").
    pub const RESTART_REQUIRED_FIELDS: [&'static str; 3] = ["scan_path", "port_range", "binary_path"];

    /// Names of the fields that differ between `self` and `other`, among
    /// the restart-required set.
    pub fn restart_required_changes(&self, other: &RuntimeSettings) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.scan_path != other.scan_path {
            changed.push("scan_path");
        }
        if self.port_range != other.port_range {
            changed.push("port_range");
        }
        if self.binary_path != other.binary_path {
            changed.push("binary_path");
        }
        changed
    }
}
