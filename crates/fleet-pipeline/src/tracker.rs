//! In-memory pipeline state tracker.
//!
//! One `Pipeline` is touched by only one query worker at a time, but the
//! map itself is shared across every worker, so it is keyed by `query_id`
//! in a `DashMap` rather than guarded by a single lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use fleet_events::EventBus;
use fleet_types::{Event, EventSeverity, EventType, Pipeline, PipelineStatus, StageName, StageStatus};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct PipelineStats {
    pub total: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct Tracker {
    config: TrackerConfig,
    events: Arc<EventBus>,
    pipelines: DashMap<String, Pipeline>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, events: Arc<EventBus>) -> Self {
        Self { config, events, pipelines: DashMap::new() }
    }

    /// `CreatePipeline`: inserts with all 6 stages PENDING. Emits no event.
    pub fn create_pipeline(&self, query_id: impl Into<String>) -> Pipeline {
        let query_id = query_id.into();
        let pipeline = Pipeline::new(query_id.clone(), Utc::now());
        self.pipelines.insert(query_id, pipeline.clone());
        pipeline
    }

    /// `StartStage`: PENDING → ACTIVE. Must not be called twice for the same stage.
    pub fn start_stage(&self, query_id: &str, name: StageName) -> Result<(), PipelineError> {
        let mut entry = self.pipelines.get_mut(query_id).ok_or_else(|| PipelineError::NotFound(query_id.to_string()))?;
        let now = Utc::now();
        let stage = entry
            .stage_mut(name)
            .expect("Pipeline::new seeds all six stages");
        if stage.status != StageStatus::Pending {
            return Err(PipelineError::StageAlreadyStarted { query_id: query_id.to_string(), stage: name });
        }
        stage.status = StageStatus::Active;
        stage.start = Some(now);
        drop(entry);

        self.events.publish(
            Event::new(EventType::PipelineStageStart, format!("stage {} started", name.as_str()), EventSeverity::Info)
                .with_metadata("query_id", query_id)
                .with_metadata("stage", name.as_str()),
        );
        Ok(())
    }

    /// `CompleteStage`: ACTIVE → COMPLETED.
    pub fn complete_stage(
        &self,
        query_id: &str,
        name: StageName,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), PipelineError> {
        let mut entry = self.pipelines.get_mut(query_id).ok_or_else(|| PipelineError::NotFound(query_id.to_string()))?;
        let now = Utc::now();
        let stage = entry.stage_mut(name).expect("Pipeline::new seeds all six stages");
        if stage.status != StageStatus::Active {
            return Err(PipelineError::StageNotActive { query_id: query_id.to_string(), stage: name });
        }
        stage.status = StageStatus::Completed;
        stage.end = Some(now);
        stage.duration_ms = stage.start.map(|s| (now - s).num_milliseconds().max(0) as u64);
        for (k, v) in metadata {
            stage.metadata.insert(k, v);
        }
        drop(entry);

        self.events.publish(
            Event::new(EventType::PipelineStageComplete, format!("stage {} completed", name.as_str()), EventSeverity::Info)
                .with_metadata("query_id", query_id)
                .with_metadata("stage", name.as_str()),
        );
        Ok(())
    }

    /// `FailStage`: ACTIVE → FAILED.
    pub fn fail_stage(&self, query_id: &str, name: StageName, error: impl Into<String>) -> Result<(), PipelineError> {
        let error = error.into();
        let mut entry = self.pipelines.get_mut(query_id).ok_or_else(|| PipelineError::NotFound(query_id.to_string()))?;
        let now = Utc::now();
        let stage = entry.stage_mut(name).expect("Pipeline::new seeds all six stages");
        if stage.status != StageStatus::Active {
            return Err(PipelineError::StageNotActive { query_id: query_id.to_string(), stage: name });
        }
        stage.status = StageStatus::Failed;
        stage.end = Some(now);
        stage.duration_ms = stage.start.map(|s| (now - s).num_milliseconds().max(0) as u64);
        drop(entry);

        self.events.publish(
            Event::new(EventType::PipelineStageFailed, format!("stage {} failed: {error}", name.as_str()), EventSeverity::Error)
                .with_metadata("query_id", query_id)
                .with_metadata("stage", name.as_str())
                .with_metadata("error", error),
        );
        Ok(())
    }

    /// `CompletePipeline`: sets overall status COMPLETED.
    pub fn complete_pipeline(
        &self,
        query_id: &str,
        model_selected: Option<String>,
        tier: Option<String>,
        cgrag_artifact_count: Option<usize>,
    ) -> Result<(), PipelineError> {
        let mut entry = self.pipelines.get_mut(query_id).ok_or_else(|| PipelineError::NotFound(query_id.to_string()))?;
        entry.status = PipelineStatus::Completed;
        entry.model_selected = model_selected.clone();
        entry.tier = tier.clone();
        entry.cgrag_artifact_count = cgrag_artifact_count;
        drop(entry);

        self.events.publish(
            Event::new(EventType::PipelineComplete, "pipeline completed", EventSeverity::Info)
                .with_metadata("query_id", query_id)
                .with_metadata("model_selected", json!(model_selected))
                .with_metadata("tier", json!(tier)),
        );
        Ok(())
    }

    /// `FailPipeline`: sets status FAILED and fails any remaining ACTIVE stage.
    pub fn fail_pipeline(&self, query_id: &str, error: impl Into<String>) -> Result<(), PipelineError> {
        let error = error.into();
        let mut entry = self.pipelines.get_mut(query_id).ok_or_else(|| PipelineError::NotFound(query_id.to_string()))?;
        entry.status = PipelineStatus::Failed;
        entry.error = Some(error.clone());
        for stage in entry.stages.iter_mut() {
            if stage.status == StageStatus::Active {
                stage.status = StageStatus::Failed;
                stage.end = Some(Utc::now());
            }
        }
        drop(entry);

        self.events.publish(
            Event::new(EventType::PipelineFailed, format!("pipeline failed: {error}"), EventSeverity::Error)
                .with_metadata("query_id", query_id)
                .with_metadata("error", error),
        );
        Ok(())
    }

    /// `Get`.
    pub fn get(&self, query_id: &str) -> Option<Pipeline> {
        self.pipelines.get(query_id).map(|e| e.clone())
    }

    /// `Stats`.
    pub fn stats(&self) -> PipelineStats {
        let mut stats = PipelineStats::default();
        for entry in self.pipelines.iter() {
            stats.total += 1;
            match entry.status {
                PipelineStatus::Processing => stats.processing += 1,
                PipelineStatus::Completed => stats.completed += 1,
                PipelineStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Removes pipelines older than `ttl` that are not currently PROCESSING.
    fn sweep(&self) {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::hours(1));
        let expired: Vec<String> = self
            .pipelines
            .iter()
            .filter(|e| e.status != PipelineStatus::Processing && now - e.created_at > ttl)
            .map(|e| e.key().clone())
            .collect();
        for id in &expired {
            self.pipelines.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired pipelines");
        }
    }

    /// Starts the background TTL cleanup loop.
    pub fn start_cleanup(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.cleanup_interval;
        info!(?interval, "starting pipeline cleanup loop");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Tracker {
        Tracker::new(TrackerConfig::default(), Arc::new(EventBus::new()))
    }

    #[test]
    fn create_pipeline_seeds_all_six_stages_pending() {
        let t = tracker();
        let p = t.create_pipeline("q1");
        assert_eq!(p.stages.len(), 6);
        assert!(p.stages.iter().all(|s| s.status == StageStatus::Pending));
        assert_eq!(p.status, PipelineStatus::Processing);
    }

    #[test]
    fn start_stage_twice_is_rejected() {
        let t = tracker();
        t.create_pipeline("q1");
        t.start_stage("q1", StageName::Input).unwrap();
        let result = t.start_stage("q1", StageName::Input);
        assert!(matches!(result, Err(PipelineError::StageAlreadyStarted { .. })));
    }

    #[test]
    fn complete_stage_requires_active() {
        let t = tracker();
        t.create_pipeline("q1");
        let result = t.complete_stage("q1", StageName::Input, serde_json::Map::new());
        assert!(matches!(result, Err(PipelineError::StageNotActive { .. })));
    }

    #[test]
    fn full_stage_lifecycle_records_duration() {
        let t = tracker();
        t.create_pipeline("q1");
        t.start_stage("q1", StageName::Input).unwrap();
        t.complete_stage("q1", StageName::Input, serde_json::Map::new()).unwrap();
        let p = t.get("q1").unwrap();
        let stage = p.stage(StageName::Input).unwrap();
        assert_eq!(stage.status, StageStatus::Completed);
        assert!(stage.duration_ms.is_some());
    }

    #[test]
    fn fail_pipeline_fails_remaining_active_stage() {
        let t = tracker();
        t.create_pipeline("q1");
        t.start_stage("q1", StageName::Input).unwrap();
        t.fail_pipeline("q1", "boom").unwrap();
        let p = t.get("q1").unwrap();
        assert_eq!(p.status, PipelineStatus::Failed);
        assert_eq!(p.stage(StageName::Input).unwrap().status, StageStatus::Failed);
    }

    #[test]
    fn complete_pipeline_records_selection() {
        let t = tracker();
        t.create_pipeline("q1");
        t.complete_pipeline("q1", Some("model-a".to_string()), Some("fast".to_string()), Some(3)).unwrap();
        let p = t.get("q1").unwrap();
        assert_eq!(p.status, PipelineStatus::Completed);
        assert_eq!(p.model_selected.as_deref(), Some("model-a"));
        assert_eq!(p.cgrag_artifact_count, Some(3));
    }

    #[test]
    fn stats_tallies_by_status() {
        let t = tracker();
        t.create_pipeline("q1");
        t.create_pipeline("q2");
        t.complete_pipeline("q2", None, None, None).unwrap();
        t.create_pipeline("q3");
        t.fail_pipeline("q3", "err").unwrap();

        let stats = t.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn get_on_unknown_query_returns_none() {
        let t = tracker();
        assert!(t.get("missing").is_none());
    }

    #[test]
    fn sweep_retains_processing_pipelines_regardless_of_age() {
        let mut config = TrackerConfig::default();
        config.ttl = Duration::from_secs(0);
        let t = Tracker::new(config, Arc::new(EventBus::new()));
        t.create_pipeline("q1");
        t.sweep();
        assert!(t.get("q1").is_some());
    }

    #[test]
    fn sweep_removes_expired_completed_pipelines() {
        let mut config = TrackerConfig::default();
        config.ttl = Duration::from_secs(0);
        let t = Tracker::new(config, Arc::new(EventBus::new()));
        t.create_pipeline("q1");
        t.complete_pipeline("q1", None, None, None).unwrap();
        t.sweep();
        assert!(t.get("q1").is_none());
    }
}
