//! Model, tier, and registry wire types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quantization format of a discovered GGUF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quantization {
    #[serde(rename = "Q2_K")]
    Q2K,
    #[serde(rename = "Q3_K_M")]
    Q3KM,
    #[serde(rename = "Q4_K_M")]
    Q4KM,
    #[serde(rename = "Q5_K_M")]
    Q5KM,
    #[serde(rename = "Q6_K")]
    Q6K,
    #[serde(rename = "Q8_0")]
    Q8_0,
    F16,
    F32,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Quantization {
    /// Parse a quantization token as it appears in a GGUF filename
    /// (case-insensitive, underscores or hyphens). Unknown tokens are
    /// classified `Unknown` rather than rejected — malformed filenames
    /// must still register.
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().replace('-', "_").as_str() {
            "Q2_K" => Quantization::Q2K,
            "Q3_K_M" | "Q3_K" => Quantization::Q3KM,
            "Q4_K_M" | "Q4_K" => Quantization::Q4KM,
            "Q5_K_M" | "Q5_K" => Quantization::Q5KM,
            "Q6_K" => Quantization::Q6K,
            "Q8_0" | "Q8" => Quantization::Q8_0,
            "F16" => Quantization::F16,
            "F32" => Quantization::F32,
            _ => Quantization::Unknown,
        }
    }

    /// True for the low-bit quantization family used by `AssignTier`'s
    /// FAST-tier rule.
    pub fn is_low_bit(&self) -> bool {
        matches!(self, Quantization::Q2K | Quantization::Q3KM | Quantization::Q4KM)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Q2K => "Q2_K",
            Quantization::Q3KM => "Q3_K_M",
            Quantization::Q4KM => "Q4_K_M",
            Quantization::Q5KM => "Q5_K_M",
            Quantization::Q6K => "Q6_K",
            Quantization::Q8_0 => "Q8_0",
            Quantization::F16 => "F16",
            Quantization::F32 => "F32",
            Quantization::Unknown => "UNKNOWN",
        }
    }
}

/// Capability tier bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Balanced,
    Powerful,
}

impl Tier {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Some(Tier::Fast),
            "balanced" => Some(Tier::Balanced),
            "powerful" => Some(Tier::Powerful),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Balanced => "balanced",
            Tier::Powerful => "powerful",
        }
    }
}

/// A discovered inference artifact ("Model").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub path: String,
    pub family: String,
    pub version: String,
    pub size_params: f64,
    pub quantization: Quantization,
    pub is_thinking: bool,
    pub thinking_override: Option<bool>,
    pub is_coder: bool,
    pub is_instruct: bool,
    pub assigned_tier: Tier,
    pub tier_override: Option<Tier>,
    pub port: u16,
    pub enabled: bool,
    /// Set by `Rescan` when the backing file vanished but the model is
    /// enabled, so it is preserved rather than dropped.
    pub missing_file_warning: Option<String>,
}

impl Model {
    /// The tier a caller should actually route to: `tier_override` always
    /// wins over `assigned_tier` (`AssignTier`).
    pub fn effective_tier(&self) -> Tier {
        self.tier_override.unwrap_or(self.assigned_tier)
    }

    /// `is_thinking` with the user override applied.
    pub fn effective_thinking(&self) -> bool {
        self.thinking_override.unwrap_or(self.is_thinking)
    }
}

/// Wire projection of the full registry, served from `GET /models/registry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistrySnapshot {
    pub models: HashMap<String, Model>,
    pub scan_path: String,
    pub port_range: (u16, u16),
    pub tier_thresholds: TierThresholds,
    pub last_scan_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum `size_params` (billions) for `POWERFUL`.
    pub powerful_min: f64,
    /// Maximum `size_params` (billions) for `FAST`.
    pub fast_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self { powerful_min: 30.0, fast_max: 7.0 }
    }
}
