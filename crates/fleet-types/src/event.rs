//! Event Bus wire type ("Event").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PipelineStageStart,
    PipelineStageComplete,
    PipelineStageFailed,
    PipelineComplete,
    PipelineFailed,
    ServerStarted,
    ServerStopped,
    ServerCrashed,
    RegistryRescanned,
    SettingsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub message: String,
    pub severity: EventSeverity,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(event_type: EventType, message: impl Into<String>, severity: EventSeverity) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            message: message.into(),
            severity,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
