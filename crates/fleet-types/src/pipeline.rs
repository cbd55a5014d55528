//! Per-query pipeline state ("Pipeline").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Input,
    Complexity,
    Cgrag,
    Routing,
    Generation,
    Response,
}

impl StageName {
    /// Canonical order in which stages are opened.
    pub const ORDER: [StageName; 6] = [
        StageName::Input,
        StageName::Complexity,
        StageName::Cgrag,
        StageName::Routing,
        StageName::Generation,
        StageName::Response,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Input => "input",
            StageName::Complexity => "complexity",
            StageName::Cgrag => "cgrag",
            StageName::Routing => "routing",
            StageName::Generation => "generation",
            StageName::Response => "response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: StageName,
    pub status: StageStatus,
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    pub end: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<u64>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Stage {
    pub fn pending(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            start: None,
            end: None,
            duration_ms: None,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub query_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: PipelineStatus,
    pub stages: Vec<Stage>,
    pub model_selected: Option<String>,
    pub tier: Option<String>,
    pub cgrag_artifact_count: Option<usize>,
    pub error: Option<String>,
}

impl Pipeline {
    pub fn new(query_id: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            query_id: query_id.into(),
            created_at: now,
            status: PipelineStatus::Processing,
            stages: StageName::ORDER.iter().map(|n| Stage::pending(*n)).collect(),
            model_selected: None,
            tier: None,
            cgrag_artifact_count: None,
            error: None,
        }
    }

    pub fn stage_mut(&mut self, name: StageName) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    pub fn stage(&self, name: StageName) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// At most one stage is ever ACTIVE at a time.
    pub fn active_stage_count(&self) -> usize {
        self.stages.iter().filter(|s| s.status == StageStatus::Active).count()
    }
}
