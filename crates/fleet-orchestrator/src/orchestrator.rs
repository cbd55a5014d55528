//! The query orchestrator: wires every other crate together
//! and drives the six-stage pipeline for each incoming query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fleet_context::{Allocator, ArtifactInput, StoreRequest};
use fleet_events::EventBus;
use fleet_inference::Manager;
use fleet_metrics::MetricsAggregator;
use fleet_pipeline::Tracker;
use fleet_registry::Registry;
use fleet_settings::SettingsStore;
use fleet_types::{Event, EventSeverity, EventType, MetricMetadata, MetricType, StageName, Tier};
use serde_json::{json, Map};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::cgrag::{CgragClient, CgragResult, NullCgragClient};
use crate::complexity;
use crate::error::OrchestratorError;
use crate::modes::{benchmark, council, simple, two_stage};
use crate::selection::Selector;
use crate::types::{Mode, QueryMetadata, QueryRequest, QueryResponse};
use crate::websearch::{NullWebSearchClient, WebSearchClient};

pub struct Orchestrator {
    pub(crate) registry: Arc<Registry>,
    pub(crate) inference: Arc<Manager>,
    pub(crate) selector: Selector,
    pub(crate) tracker: Arc<Tracker>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) metrics: Arc<MetricsAggregator>,
    pub(crate) allocator: Arc<Allocator>,
    pub(crate) settings: Arc<SettingsStore>,
    pub(crate) cgrag: Arc<dyn CgragClient>,
    pub(crate) web_search: Arc<dyn WebSearchClient>,
    routing_total: AtomicU64,
    routing_fallback: AtomicU64,
    routing_decision_micros: AtomicU64,
}

/// Aggregate counters behind `GET /metrics/routing`'s `accuracyMetrics`.
/// `avg_decision_time_ms` is the wall-clock cost of `complexity::assess`,
/// which is a pure in-process function with no corresponding `MetricType`
/// variant, so it is tracked here rather than in `fleet-metrics`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RoutingStats {
    pub total_decisions: u64,
    pub fallback_count: u64,
    pub avg_decision_time_ms: f64,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        inference: Arc<Manager>,
        tracker: Arc<Tracker>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsAggregator>,
        allocator: Arc<Allocator>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let selector = Selector::new(registry.clone(), inference.clone());
        Self {
            registry,
            inference,
            selector,
            tracker,
            events,
            metrics,
            allocator,
            settings,
            cgrag: Arc::new(NullCgragClient),
            web_search: Arc::new(NullWebSearchClient),
            routing_total: AtomicU64::new(0),
            routing_fallback: AtomicU64::new(0),
            routing_decision_micros: AtomicU64::new(0),
        }
    }

    pub fn with_cgrag_client(mut self, client: Arc<dyn CgragClient>) -> Self {
        self.cgrag = client;
        self
    }

    pub fn with_web_search_client(mut self, client: Arc<dyn WebSearchClient>) -> Self {
        self.web_search = client;
        self
    }

    /// Records one tier-routing decision: `requested` is the tier
    /// `complexity::assess` (or the request's own mode) asked for, `actual`
    /// is the tier of the model `Selector` actually returned. `requested !=
    /// actual` means `SelectModel` fell back, which feeds
    /// `GET /metrics/routing`'s `accuracyMetrics.fallbackRate`.
    pub(crate) fn record_routing_decision(&self, requested: Tier, actual: Tier) {
        self.routing_total.fetch_add(1, Ordering::Relaxed);
        if requested != actual {
            self.routing_fallback.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn routing_stats(&self) -> RoutingStats {
        let total_decisions = self.routing_total.load(Ordering::Relaxed);
        let total_micros = self.routing_decision_micros.load(Ordering::Relaxed);
        let avg_decision_time_ms =
            if total_decisions == 0 { 0.0 } else { (total_micros as f64 / total_decisions as f64) / 1000.0 };
        RoutingStats { total_decisions, fallback_count: self.routing_fallback.load(Ordering::Relaxed), avg_decision_time_ms }
    }

    /// `Call`: times the generation, records `response_time` and
    /// `tokens_per_second` metrics, and converts `InferenceError` into the
    /// orchestrator's own taxonomy.
    pub(crate) async fn call_model(
        &self,
        model_id: &str,
        tier: Tier,
        mode: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<(String, u32, u64), OrchestratorError> {
        let start = Instant::now();
        let result = self.inference.call(model_id, prompt, max_tokens, temperature).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let metadata = MetricMetadata {
            model_id: Some(model_id.to_string()),
            tier: Some(tier.as_str().to_string()),
            query_mode: Some(mode.to_string()),
        };

        match result {
            Ok((text, tokens)) => {
                self.metrics.record(MetricType::ResponseTime, elapsed_ms as f64, metadata.clone());
                if elapsed_ms > 0 {
                    let tps = tokens as f64 / (elapsed_ms as f64 / 1000.0);
                    self.metrics.record(MetricType::TokensPerSecond, tps, metadata);
                }
                Ok((text, tokens, elapsed_ms))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `Retrieve`: never fails the query — a retrieval error
    /// degrades to empty context with a logged warning. A configured
    /// web-search collaborator, if any, is merged into the same context
    /// slot, under the same failure policy.
    async fn retrieve_context(&self, request: &QueryRequest) -> CgragResult {
        let budget = self.settings.get().cgrag_token_budget;
        let mut result = match self.cgrag.retrieve(&request.query, budget).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "cgrag retrieval failed, proceeding with empty context");
                CgragResult::default()
            }
        };

        if request.web_search {
            match self.web_search.search(&request.query).await {
                Ok(web_result) if !web_result.snippets.is_empty() => {
                    if !result.context_text.is_empty() {
                        result.context_text.push_str("\n\n");
                    }
                    result.context_text.push_str(&web_result.merged_text());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "web search failed, proceeding without it"),
            }
        }

        result
    }

    #[instrument(skip(self, request), fields(mode = request.mode.as_str()))]
    pub async fn process_query(&self, request: QueryRequest) -> Result<QueryResponse, OrchestratorError> {
        request.validate()?;
        let query_id = Uuid::new_v4().to_string();
        let overall_start = Instant::now();
        self.tracker.create_pipeline(&query_id);

        match self.run_pipeline(&query_id, &request, overall_start).await {
            Ok(response) => Ok(response),
            Err(e) => {
                let _ = self.tracker.fail_pipeline(&query_id, e.to_string());
                self.events.publish(
                    Event::new(EventType::PipelineFailed, format!("query {query_id} failed: {e}"), EventSeverity::Error)
                        .with_metadata("query_id", query_id.clone()),
                );
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        query_id: &str,
        request: &QueryRequest,
        overall_start: Instant,
    ) -> Result<QueryResponse, OrchestratorError> {
        // input
        self.tracker.start_stage(query_id, StageName::Input)?;
        self.tracker.complete_stage(query_id, StageName::Input, Map::new())?;

        // complexity
        self.tracker.start_stage(query_id, StageName::Complexity)?;
        let decision_started = Instant::now();
        let complexity = complexity::assess(&request.query);
        self.routing_decision_micros.fetch_add(decision_started.elapsed().as_micros() as u64, Ordering::Relaxed);
        let mut complexity_meta = Map::new();
        complexity_meta.insert("score".to_string(), json!(complexity.score));
        complexity_meta.insert("tier".to_string(), json!(complexity.tier.as_str()));
        complexity_meta.insert("reasoning".to_string(), json!(complexity.reasoning));
        self.tracker.complete_stage(query_id, StageName::Complexity, complexity_meta)?;
        self.metrics.record(
            MetricType::ComplexityScore,
            complexity.score,
            MetricMetadata {
                tier: Some(complexity.tier.as_str().to_string()),
                query_mode: Some(request.mode.as_str().to_string()),
                ..Default::default()
            },
        );

        // cgrag
        self.tracker.start_stage(query_id, StageName::Cgrag)?;
        let cgrag_started = Instant::now();
        let cgrag_result = if request.use_context {
            self.retrieve_context(request).await
        } else {
            CgragResult::default()
        };
        let mut cgrag_meta = Map::new();
        if request.use_context {
            cgrag_meta.insert("artifacts_retrieved".to_string(), json!(cgrag_result.artifacts.len()));
            cgrag_meta.insert("tokens_used".to_string(), json!(token_estimate(&cgrag_result.context_text)));
            cgrag_meta.insert("retrieval_time_ms".to_string(), json!(cgrag_started.elapsed().as_millis() as u64));
            self.metrics.record(
                MetricType::CgragRetrievalTime,
                cgrag_started.elapsed().as_millis() as f64,
                MetricMetadata::default(),
            );
        }
        // Stays COMPLETED with empty metadata rather than SKIPPED when use_context=false.
        self.tracker.complete_stage(query_id, StageName::Cgrag, cgrag_meta)?;

        // routing + generation: mode-specific, dispatched below. Each mode
        // function owns its own Routing/Generation stage start/complete
        // since participant sets differ per mode.
        let outcome = match request.mode {
            Mode::Simple => simple::run(self, query_id, &cgrag_result.context_text, request, complexity.tier).await,
            Mode::TwoStage => two_stage::run(self, query_id, &cgrag_result.context_text, request).await,
            Mode::Council => council::run(self, query_id, &cgrag_result.context_text, request).await,
            Mode::Benchmark => benchmark::run(self, query_id, &cgrag_result.context_text, request).await,
        }?;

        // response
        self.tracker.start_stage(query_id, StageName::Response)?;
        let mut response_meta = Map::new();
        response_meta.insert("response_length".to_string(), json!(outcome.response_text.chars().count()));
        self.tracker.complete_stage(query_id, StageName::Response, response_meta)?;

        let processing_time_ms = overall_start.elapsed().as_millis() as u64;
        self.tracker.complete_pipeline(
            query_id,
            outcome.model_id.clone(),
            outcome.tier.clone(),
            Some(cgrag_result.artifacts.len()),
        )?;

        if let Some(model_id) = &outcome.model_id {
            self.allocator.store(StoreRequest {
                query_id: query_id.to_string(),
                model_id: model_id.clone(),
                system_prompt: default_system_prompt().to_string(),
                cgrag_context: cgrag_result.context_text.clone(),
                user_query: request.query.clone(),
                context_window: default_context_window(),
                cgrag_artifacts: cgrag_result
                    .artifacts
                    .iter()
                    .map(|a| ArtifactInput { source: a.source.clone(), relevance: a.relevance, content: a.preview.clone() })
                    .collect(),
            });
        }

        Ok(QueryResponse {
            response_text: outcome.response_text,
            metadata: QueryMetadata {
                query_id: query_id.to_string(),
                query_mode: request.mode.as_str().to_string(),
                model_id: outcome.model_id,
                tier: outcome.tier,
                processing_time_ms,
                complexity_score: complexity.score,
                cgrag_artifacts: cgrag_result.artifacts.len(),
                stage1_model_id: outcome.stage1_model_id,
                stage2_model_id: outcome.stage2_model_id,
                stage1_time_ms: outcome.stage1_time_ms,
                stage2_time_ms: outcome.stage2_time_ms,
                two_stage_degraded: outcome.two_stage_degraded,
                council: outcome.council,
                benchmark_results: outcome.benchmark_results,
                extra: Default::default(),
            },
        })
    }
}

/// Placeholder system prompt used for context accounting;
/// fleetctl has no per-model system prompt configuration yet, so every
/// allocation charges the same fixed prompt.
fn default_system_prompt() -> &'static str {
    "You are a helpful assistant running as part of a local model fleet."
}

/// Placeholder context window used for accounting until per-model context
/// sizes are tracked in the registry.
fn default_context_window() -> usize {
    8192
}

fn token_estimate(text: &str) -> usize {
    (text.split_whitespace().count() as f64 * 1.3).ceil() as usize
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use fleet_context::AllocatorConfig;
    use fleet_events::EventBus;
    use fleet_inference::ManagerConfig;
    use fleet_pipeline::TrackerConfig;
    use fleet_settings::SettingsStore;
    use fleet_types::TierThresholds;

    /// An orchestrator wired to real collaborators with no models
    /// registered: every mode's routing stage fails with
    /// `NoModelAvailable`, which is exactly what the no-server-running
    /// edge case this test harness can exercise looks like.
    pub(crate) async fn empty_orchestrator() -> Orchestrator {
        let registry = Arc::new(Registry::new("/tmp/fleet-orchestrator-tests", (8100, 8200), TierThresholds::default()));
        let inference = Arc::new(Manager::new(ManagerConfig::default()));
        let events = Arc::new(EventBus::new());
        let tracker = Arc::new(Tracker::new(TrackerConfig::default(), events.clone()));
        let metrics = Arc::new(MetricsAggregator::new(Default::default()));
        let allocator = Arc::new(Allocator::new(AllocatorConfig::default()));
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Arc::new(SettingsStore::load(dir.path().join("runtime_settings.json")).await.expect("settings load"));
        Orchestrator::new(registry, inference, tracker, events, metrics, allocator, settings)
    }

    pub(crate) fn base_request(mode: Mode) -> QueryRequest {
        QueryRequest {
            query: "what is the capital of France".to_string(),
            mode,
            use_context: false,
            max_tokens: 128,
            temperature: 0.5,
            council_adversarial: false,
            benchmark_serial: false,
            web_search: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{base_request, empty_orchestrator};
    use super::*;

    #[tokio::test]
    async fn process_query_rejects_invalid_request_before_creating_a_pipeline() {
        let orch = empty_orchestrator().await;
        let mut request = base_request(Mode::Simple);
        request.query = "   ".to_string();
        let result = orch.process_query(request).await;
        assert!(matches!(result, Err(OrchestratorError::Validation(_))));
    }

    #[tokio::test]
    async fn process_query_fails_and_marks_the_pipeline_failed_when_no_model_is_available() {
        let orch = empty_orchestrator().await;
        let request = base_request(Mode::Simple);
        let result = orch.process_query(request).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[tokio::test]
    async fn retrieve_context_degrades_to_empty_on_cgrag_failure() {
        let orch = empty_orchestrator().await;
        let request = base_request(Mode::Simple);
        let result = orch.retrieve_context(&request).await;
        assert!(result.context_text.is_empty());
        assert!(result.artifacts.is_empty());
    }

    #[test]
    fn token_estimate_scales_with_word_count() {
        assert_eq!(token_estimate(""), 0);
        assert!(token_estimate("one two three four five six seven eight nine ten") >= 10);
    }
}
