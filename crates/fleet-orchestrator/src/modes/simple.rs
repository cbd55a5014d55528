//! Simple mode: pick one model at the assessed tier, call it
//! once with the context-prefixed query.

use fleet_types::StageName;
use serde_json::{json, Map};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::types::{ModeOutcome, QueryRequest};

pub async fn run(
    orch: &Orchestrator,
    query_id: &str,
    context_text: &str,
    request: &QueryRequest,
    tier: fleet_types::Tier,
) -> Result<ModeOutcome, OrchestratorError> {
    orch.tracker.start_stage(query_id, StageName::Routing)?;
    let model = match orch.selector.select_model(tier) {
        Ok(model) => model,
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Routing, e.to_string())?;
            return Err(e);
        }
    };
    orch.record_routing_decision(tier, model.effective_tier());
    let mut routing_meta = Map::new();
    routing_meta.insert("participants".to_string(), json!([model.id]));
    orch.tracker.complete_stage(query_id, StageName::Routing, routing_meta)?;

    orch.tracker.start_stage(query_id, StageName::Generation)?;
    let prompt = format!("{context_text}\n\n{}", request.query);
    let call_result = orch.call_model(&model.id, model.effective_tier(), "simple", &prompt, request.max_tokens, request.temperature).await;

    match call_result {
        Ok((text, tokens, time_ms)) => {
            let mut generation_meta = Map::new();
            generation_meta.insert("tokens".to_string(), json!(tokens));
            generation_meta.insert("time_ms".to_string(), json!(time_ms));
            orch.tracker.complete_stage(query_id, StageName::Generation, generation_meta)?;
            Ok(ModeOutcome {
                response_text: text,
                model_id: Some(model.id.clone()),
                tier: Some(model.effective_tier().as_str().to_string()),
                ..Default::default()
            })
        }
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Generation, e.to_string())?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{base_request, empty_orchestrator};
    use crate::types::Mode;

    #[tokio::test]
    async fn fails_routing_when_no_model_is_ready_for_the_tier() {
        let orch = empty_orchestrator().await;
        orch.tracker.create_pipeline("q1");
        let request = base_request(Mode::Simple);
        let result = run(&orch, "q1", "", &request, fleet_types::Tier::Fast).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }
}
