//! Two-stage mode: a BALANCED draft refined by a POWERFUL
//! rewrite. Stage 1 failure fails the query; stage 2 failure (including no
//! POWERFUL model being available) degrades to the stage 1 output with
//! `two_stage_degraded=true`.

use fleet_types::{StageName, Tier};
use serde_json::{json, Map};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::types::{ModeOutcome, QueryRequest};

const STAGE1_MAX_TOKENS: u32 = 500;

fn refinement_prompt(query: &str, stage1_text: &str) -> String {
    format!(
        "Original question: {query}\n\nA draft answer was produced:\n{stage1_text}\n\n\
         Provide an improved, comprehensive response to the original question, \
         building on the draft and correcting anything it got wrong."
    )
}

pub async fn run(
    orch: &Orchestrator,
    query_id: &str,
    context_text: &str,
    request: &QueryRequest,
) -> Result<ModeOutcome, OrchestratorError> {
    orch.tracker.start_stage(query_id, StageName::Routing)?;
    let stage1_model = match orch.selector.select_model(Tier::Balanced) {
        Ok(model) => model,
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Routing, e.to_string())?;
            return Err(e);
        }
    };
    let mut routing_meta = Map::new();
    routing_meta.insert("participants".to_string(), json!([stage1_model.id]));
    orch.tracker.complete_stage(query_id, StageName::Routing, routing_meta)?;

    orch.tracker.start_stage(query_id, StageName::Generation)?;

    let stage1_prompt = format!("{context_text}\n\n{}", request.query);
    let stage1_result = orch
        .call_model(&stage1_model.id, stage1_model.effective_tier(), "two-stage", &stage1_prompt, STAGE1_MAX_TOKENS, request.temperature)
        .await;

    let (stage1_text, _stage1_tokens, stage1_time_ms) = match stage1_result {
        Ok(ok) => ok,
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Generation, e.to_string())?;
            return Err(e);
        }
    };

    let stage2_model = orch.selector.select_model(Tier::Powerful);
    let stage2_model = match stage2_model {
        Ok(model) => model,
        Err(_) => {
            let mut meta = Map::new();
            meta.insert("degraded".to_string(), json!(true));
            meta.insert("reason".to_string(), json!("no POWERFUL model available for stage 2"));
            orch.tracker.complete_stage(query_id, StageName::Generation, meta)?;
            return Ok(ModeOutcome {
                response_text: stage1_text,
                model_id: Some(stage1_model.id.clone()),
                tier: Some(stage1_model.effective_tier().as_str().to_string()),
                stage1_model_id: Some(stage1_model.id),
                stage1_time_ms: Some(stage1_time_ms),
                two_stage_degraded: Some(true),
                ..Default::default()
            });
        }
    };

    let stage2_prompt = refinement_prompt(&request.query, &stage1_text);
    let stage2_result = orch
        .call_model(&stage2_model.id, stage2_model.effective_tier(), "two-stage", &stage2_prompt, request.max_tokens, request.temperature)
        .await;

    match stage2_result {
        Ok((stage2_text, stage2_tokens, stage2_time_ms)) => {
            let mut meta = Map::new();
            meta.insert("stage2_tokens".to_string(), json!(stage2_tokens));
            orch.tracker.complete_stage(query_id, StageName::Generation, meta)?;
            Ok(ModeOutcome {
                response_text: stage2_text,
                model_id: Some(stage2_model.id.clone()),
                tier: Some(stage2_model.effective_tier().as_str().to_string()),
                stage1_model_id: Some(stage1_model.id),
                stage2_model_id: Some(stage2_model.id),
                stage1_time_ms: Some(stage1_time_ms),
                stage2_time_ms: Some(stage2_time_ms),
                two_stage_degraded: Some(false),
                ..Default::default()
            })
        }
        Err(e) => {
            let mut meta = Map::new();
            meta.insert("degraded".to_string(), json!(true));
            meta.insert("stage2_error".to_string(), json!(e.to_string()));
            orch.tracker.complete_stage(query_id, StageName::Generation, meta)?;
            Ok(ModeOutcome {
                response_text: stage1_text,
                model_id: Some(stage1_model.id.clone()),
                tier: Some(stage1_model.effective_tier().as_str().to_string()),
                stage1_model_id: Some(stage1_model.id),
                stage2_model_id: Some(stage2_model.id),
                stage1_time_ms: Some(stage1_time_ms),
                two_stage_degraded: Some(true),
                ..Default::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{base_request, empty_orchestrator};
    use crate::types::Mode;

    #[tokio::test]
    async fn fails_routing_when_no_balanced_model_is_ready_for_stage_one() {
        let orch = empty_orchestrator().await;
        orch.tracker.create_pipeline("q1");
        let request = base_request(Mode::TwoStage);
        let result = run(&orch, "q1", "", &request).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[test]
    fn refinement_prompt_references_the_original_question_and_draft() {
        let prompt = refinement_prompt("what is rust", "a systems language");
        assert!(prompt.contains("what is rust"));
        assert!(prompt.contains("a systems language"));
    }
}
