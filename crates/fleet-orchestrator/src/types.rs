//! Wire types for `POST /query`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Simple,
    TwoStage,
    Council,
    Benchmark,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simple => "simple",
            Mode::TwoStage => "two-stage",
            Mode::Council => "council",
            Mode::Benchmark => "benchmark",
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub mode: Mode,
    #[serde(default = "default_true")]
    pub use_context: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub council_adversarial: bool,
    #[serde(default)]
    pub benchmark_serial: bool,
    /// Pass-through toggle for the optional web-search collaborator.
    /// Not part of the core pipeline.
    #[serde(default)]
    pub web_search: bool,
}

impl QueryRequest {
    /// Boundary cases from empty query, `max_tokens` out of
    /// `1..=32000`, `temperature` out of `0.0..=2.0` are all 400s.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.query.trim().is_empty() {
            return Err(OrchestratorError::Validation("query must not be empty".to_string()));
        }
        if self.max_tokens == 0 || self.max_tokens > 32_000 {
            return Err(OrchestratorError::Validation("max_tokens must be between 1 and 32000".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(OrchestratorError::Validation("temperature must be between 0.0 and 2.0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCallResult {
    pub model_id: String,
    pub success: bool,
    pub response_text: String,
    pub error: Option<String>,
    pub time_ms: u64,
    pub tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouncilParticipant {
    pub model_id: String,
    pub tier: String,
    pub round1_response: Option<String>,
    pub round2_response: Option<String>,
    pub round1_time_ms: Option<u64>,
    pub round2_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouncilMetadata {
    pub adversarial: bool,
    pub participants: Vec<CouncilParticipant>,
    pub synthesis_model_id: Option<String>,
    pub synthesis_degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub model_id: String,
    pub tier: String,
    pub success: bool,
    pub response_text: Option<String>,
    pub error: Option<String>,
    pub time_ms: u64,
    pub tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryMetadata {
    pub query_id: String,
    pub query_mode: String,
    pub model_id: Option<String>,
    pub tier: Option<String>,
    pub processing_time_ms: u64,
    pub complexity_score: f64,
    pub cgrag_artifacts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage2_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage1_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage2_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_stage_degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub council: Option<CouncilMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_results: Option<Vec<BenchmarkResult>>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub response_text: String,
    pub metadata: QueryMetadata,
}

/// What a mode's `run` function hands back to `Orchestrator::run_pipeline`
/// to assemble into the final `QueryMetadata`.
#[derive(Debug, Clone, Default)]
pub struct ModeOutcome {
    pub response_text: String,
    pub model_id: Option<String>,
    pub tier: Option<String>,
    pub stage1_model_id: Option<String>,
    pub stage2_model_id: Option<String>,
    pub stage1_time_ms: Option<u64>,
    pub stage2_time_ms: Option<u64>,
    pub two_stage_degraded: Option<bool>,
    pub council: Option<CouncilMetadata>,
    pub benchmark_results: Option<Vec<BenchmarkResult>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> QueryRequest {
        QueryRequest {
            query: "hi".to_string(),
            mode: Mode::Simple,
            use_context: true,
            max_tokens: 128,
            temperature: 0.5,
            council_adversarial: false,
            benchmark_serial: false,
            web_search: false,
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        let mut r = base_request();
        r.query = "   ".to_string();
        assert!(matches!(r.validate(), Err(OrchestratorError::Validation(_))));
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let mut r = base_request();
        r.max_tokens = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn temperature_above_range_is_rejected() {
        let mut r = base_request();
        r.temperature = 2.1;
        assert!(r.validate().is_err());
    }

    #[test]
    fn valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }
}
