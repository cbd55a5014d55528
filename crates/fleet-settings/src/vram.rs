//! VRAM estimate for the currently-enabled model set, served from
//! `GET /settings/vram-estimate`.
//!
//! A rough sizing heuristic, not a guarantee: `size_params` (billions) times
//! an approximate bytes-per-parameter figure for the quantization family,
//! plus a fixed runtime overhead per loaded model for KV cache and
//! framework bookkeeping.

use fleet_types::{Model, Quantization};
use serde::Serialize;

/// Fixed overhead per loaded model (KV cache + runtime bookkeeping), in GB.
const PER_MODEL_OVERHEAD_GB: f64 = 0.5;

fn bytes_per_param(q: Quantization) -> f64 {
    match q {
        Quantization::Q2K => 0.35,
        Quantization::Q3KM => 0.45,
        Quantization::Q4KM => 0.55,
        Quantization::Q5KM => 0.65,
        Quantization::Q6K => 0.75,
        Quantization::Q8_0 => 1.0,
        Quantization::F16 => 2.0,
        Quantization::F32 => 4.0,
        // Unknown quantization: assume a mid-range 4-bit-ish footprint
        // rather than over- or under-estimating wildly.
        Quantization::Unknown => 0.6,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerModelEstimate {
    pub model_id: String,
    pub estimated_gb: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VramEstimate {
    pub per_model: Vec<PerModelEstimate>,
    pub total_gb: f64,
}

/// Estimates VRAM for `models` (caller passes the enabled subset).
pub fn estimate(models: &[Model]) -> VramEstimate {
    let per_model: Vec<PerModelEstimate> = models
        .iter()
        .map(|m| PerModelEstimate {
            model_id: m.id.clone(),
            estimated_gb: m.size_params * bytes_per_param(m.quantization) + PER_MODEL_OVERHEAD_GB,
        })
        .collect();
    let total_gb = per_model.iter().map(|e| e.estimated_gb).sum();
    VramEstimate { per_model, total_gb }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, size_params: f64, quantization: Quantization) -> Model {
        Model {
            id: id.to_string(),
            path: String::new(),
            family: "test".to_string(),
            version: "1".to_string(),
            size_params,
            quantization,
            is_thinking: false,
            thinking_override: None,
            is_coder: false,
            is_instruct: true,
            assigned_tier: fleet_types::Tier::Balanced,
            tier_override: None,
            port: 8100,
            enabled: true,
            missing_file_warning: None,
        }
    }

    #[test]
    fn estimate_is_positive_and_sums_per_model() {
        let models = vec![model("a", 8.0, Quantization::Q4KM), model("b", 70.0, Quantization::Q8_0)];
        let estimate = estimate(&models);
        assert_eq!(estimate.per_model.len(), 2);
        let sum: f64 = estimate.per_model.iter().map(|e| e.estimated_gb).sum();
        assert!((sum - estimate.total_gb).abs() < 1e-9);
        assert!(estimate.total_gb > 0.0);
    }

    #[test]
    fn empty_model_list_is_zero() {
        let estimate = estimate(&[]);
        assert_eq!(estimate.total_gb, 0.0);
    }

    #[test]
    fn heavier_quantization_costs_more_vram() {
        let q4 = estimate(&[model("a", 8.0, Quantization::Q4KM)]).total_gb;
        let f16 = estimate(&[model("a", 8.0, Quantization::F16)]).total_gb;
        assert!(f16 > q4);
    }
}
