//! Benchmark mode: run the same prompt through every enabled
//! READY model, serially or concurrently, and report per-model results.
//! Individual model failures are recorded, not fatal.

use fleet_types::StageName;
use futures::stream::{self, StreamExt};
use serde_json::{json, Map};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::types::{BenchmarkResult, ModeOutcome, QueryRequest};

const MIN_MODELS: usize = 2;

pub async fn run(orch: &Orchestrator, query_id: &str, context_text: &str, request: &QueryRequest) -> Result<ModeOutcome, OrchestratorError> {
    orch.tracker.start_stage(query_id, StageName::Routing)?;
    let mut models = orch.selector.ready_enabled_models();
    models.sort_by(|a, b| a.id.cmp(&b.id));
    if models.len() < MIN_MODELS {
        let e = OrchestratorError::NoModelAvailable(format!(
            "benchmark mode needs at least {MIN_MODELS} enabled READY models, found {}",
            models.len()
        ));
        orch.tracker.fail_stage(query_id, StageName::Routing, e.to_string())?;
        return Err(e);
    }
    let mut routing_meta = Map::new();
    routing_meta.insert("participants".to_string(), json!(models.iter().map(|m| m.id.clone()).collect::<Vec<_>>()));
    orch.tracker.complete_stage(query_id, StageName::Routing, routing_meta)?;

    orch.tracker.start_stage(query_id, StageName::Generation)?;

    let prompt = format!("{context_text}\n\n{}", request.query);
    let cap = orch.settings.get().concurrent_calls_cap.max(1);

    let results: Vec<BenchmarkResult> = if request.benchmark_serial {
        let mut out = Vec::with_capacity(models.len());
        for model in &models {
            out.push(call_one(orch, model, &prompt, request).await);
        }
        out
    } else {
        stream::iter(models.iter().map(|model| call_one(orch, model, &prompt, request)))
            .buffer_unordered(cap.min(models.len()))
            .collect()
            .await
    };

    let successes = results.iter().filter(|r| r.success).count();
    let mut generation_meta = Map::new();
    generation_meta.insert("models_run".to_string(), json!(results.len()));
    generation_meta.insert("successes".to_string(), json!(successes));
    orch.tracker.complete_stage(query_id, StageName::Generation, generation_meta)?;

    let response_text = summarize(&results);
    Ok(ModeOutcome { response_text, benchmark_results: Some(results), ..Default::default() })
}

async fn call_one(orch: &Orchestrator, model: &fleet_types::Model, prompt: &str, request: &QueryRequest) -> BenchmarkResult {
    match orch.call_model(&model.id, model.effective_tier(), "benchmark", prompt, request.max_tokens, request.temperature).await {
        Ok((text, tokens, time_ms)) => BenchmarkResult {
            model_id: model.id.clone(),
            tier: model.effective_tier().as_str().to_string(),
            success: true,
            response_text: Some(text),
            error: None,
            time_ms,
            tokens,
        },
        Err(e) => BenchmarkResult {
            model_id: model.id.clone(),
            tier: model.effective_tier().as_str().to_string(),
            success: false,
            response_text: None,
            error: Some(e.to_string()),
            time_ms: 0,
            tokens: 0,
        },
    }
}

fn summarize(results: &[BenchmarkResult]) -> String {
    let mut lines = vec![format!("Benchmark across {} model(s):", results.len())];
    for r in results {
        if r.success {
            lines.push(format!("- {} ({}): {}ms, {} tokens", r.model_id, r.tier, r.time_ms, r.tokens));
        } else {
            lines.push(format!("- {} ({}): failed — {}", r.model_id, r.tier, r.error.as_deref().unwrap_or("unknown error")));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{base_request, empty_orchestrator};
    use crate::types::Mode;

    #[tokio::test]
    async fn fails_routing_when_fewer_than_two_models_are_ready() {
        let orch = empty_orchestrator().await;
        orch.tracker.create_pipeline("q1");
        let request = base_request(Mode::Benchmark);
        let result = run(&orch, "q1", "", &request).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[test]
    fn summarize_reports_failures_with_their_error() {
        let results = vec![BenchmarkResult {
            model_id: "m1".to_string(),
            tier: "fast".to_string(),
            success: false,
            response_text: None,
            error: Some("boom".to_string()),
            time_ms: 0,
            tokens: 0,
        }];
        let summary = summarize(&results);
        assert!(summary.contains("m1"));
        assert!(summary.contains("boom"));
    }
}
