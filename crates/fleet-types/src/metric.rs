//! Time-series sample types for the metrics aggregator ("MetricPoint").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    ResponseTime,
    TokensPerSecond,
    CacheHitRate,
    ComplexityScore,
    CgragRetrievalTime,
    ModelLoad,
}

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::ResponseTime,
        MetricType::TokensPerSecond,
        MetricType::CacheHitRate,
        MetricType::ComplexityScore,
        MetricType::CgragRetrievalTime,
        MetricType::ModelLoad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::ResponseTime => "response_time",
            MetricType::TokensPerSecond => "tokens_per_second",
            MetricType::CacheHitRate => "cache_hit_rate",
            MetricType::ComplexityScore => "complexity_score",
            MetricType::CgragRetrievalTime => "cgrag_retrieval_time",
            MetricType::ModelLoad => "model_load",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "response_time" => Some(MetricType::ResponseTime),
            "tokens_per_second" => Some(MetricType::TokensPerSecond),
            "cache_hit_rate" => Some(MetricType::CacheHitRate),
            "complexity_score" => Some(MetricType::ComplexityScore),
            "cgrag_retrieval_time" => Some(MetricType::CgragRetrievalTime),
            "model_load" => Some(MetricType::ModelLoad),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_mode: Option<String>,
}

/// A single time-series sample ("MetricPoint").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric_type: MetricType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub value: f64,
    pub metadata: MetricMetadata,
}
