//! Per-query context window attribution ("ContextAllocation").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    SystemPrompt,
    CgragContext,
    UserQuery,
    ResponseBudget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub tokens_used: usize,
    pub tokens_allocated: usize,
    pub content_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgragArtifactRef {
    pub source: String,
    pub relevance: f64,
    pub tokens: usize,
    pub preview: String,
}

/// `sum(components.tokens_used for non-response_budget) +
/// response_budget.tokens_allocated <= context_window_size` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextAllocation {
    pub query_id: String,
    pub model_id: String,
    pub context_window_size: usize,
    pub components: Vec<Component>,
    pub cgrag_artifacts: Vec<CgragArtifactRef>,
    pub total_used: usize,
    pub remaining: usize,
    pub utilization_pct: f64,
    pub warning: Option<String>,
}
