//! Council mode: consensus (3+ models cross-review then
//! synthesize) or adversarial (2 models argue PRO/CON then a moderator
//! summarizes), selected by `QueryRequest::council_adversarial`.
//!
//! Fallback policy is permissive: fewer than the preferred participant
//! count proceeds with whatever is available, down to a floor of 2;
//! below that floor is `NO_MODEL_AVAILABLE`.

use fleet_types::{Model, StageName, Tier};
use futures::future::join_all;
use serde_json::{json, Map};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::types::{CouncilMetadata, CouncilParticipant, ModeOutcome, QueryRequest};

const ROUND1_MAX_TOKENS: u32 = 500;
const CONSENSUS_FLOOR: usize = 2;
const ADVERSARIAL_FLOOR: usize = 2;

/// Picks up to `target` distinct models, preferring one per tier in
/// `tier_priority` order, then filling any remainder from whatever else is
/// READY and enabled.
fn pick_models(orch: &Orchestrator, tier_priority: &[Tier], target: usize) -> Vec<Model> {
    let mut pool = orch.selector.ready_enabled_models();
    pool.sort_by(|a, b| a.id.cmp(&b.id));

    let mut chosen: Vec<Model> = Vec::new();
    for tier in tier_priority {
        if chosen.len() >= target {
            break;
        }
        if let Some(m) = pool.iter().find(|m| m.effective_tier() == *tier && !chosen.iter().any(|c| c.id == m.id)) {
            chosen.push(m.clone());
        }
    }
    for m in &pool {
        if chosen.len() >= target {
            break;
        }
        if !chosen.iter().any(|c| c.id == m.id) {
            chosen.push(m.clone());
        }
    }
    chosen
}

pub async fn run(orch: &Orchestrator, query_id: &str, context_text: &str, request: &QueryRequest) -> Result<ModeOutcome, OrchestratorError> {
    if request.council_adversarial {
        run_adversarial(orch, query_id, context_text, request).await
    } else {
        run_consensus(orch, query_id, context_text, request).await
    }
}

async fn run_consensus(
    orch: &Orchestrator,
    query_id: &str,
    context_text: &str,
    request: &QueryRequest,
) -> Result<ModeOutcome, OrchestratorError> {
    orch.tracker.start_stage(query_id, StageName::Routing)?;
    let models = pick_models(orch, &[Tier::Fast, Tier::Balanced, Tier::Powerful], 3);
    if models.len() < CONSENSUS_FLOOR {
        let e = OrchestratorError::NoModelAvailable(format!(
            "council consensus needs at least {CONSENSUS_FLOOR} READY enabled models, found {}",
            models.len()
        ));
        orch.tracker.fail_stage(query_id, StageName::Routing, e.to_string())?;
        return Err(e);
    }
    let mut routing_meta = Map::new();
    routing_meta.insert("participants".to_string(), json!(models.iter().map(|m| m.id.clone()).collect::<Vec<_>>()));
    orch.tracker.complete_stage(query_id, StageName::Routing, routing_meta)?;

    orch.tracker.start_stage(query_id, StageName::Generation)?;

    let round1_prompt = format!("{context_text}\n\n{}", request.query);
    let round1 = join_all(models.iter().map(|m| {
        let prompt = round1_prompt.clone();
        async move { (m.clone(), orch.call_model(&m.id, m.effective_tier(), "council", &prompt, ROUND1_MAX_TOKENS, request.temperature).await) }
    }))
    .await;

    let successes = round1.iter().filter(|(_, r)| r.is_ok()).count();
    if successes < CONSENSUS_FLOOR {
        let e = OrchestratorError::Internal(format!("council round 1: only {successes} of {} models responded", models.len()));
        orch.tracker.fail_stage(query_id, StageName::Generation, e.to_string())?;
        return Err(e);
    }

    let mut participants: Vec<CouncilParticipant> = Vec::new();
    let mut round1_texts: Vec<(String, String)> = Vec::new();
    for (model, result) in &round1 {
        match result {
            Ok((text, _tokens, time_ms)) => {
                round1_texts.push((model.id.clone(), text.clone()));
                participants.push(CouncilParticipant {
                    model_id: model.id.clone(),
                    tier: model.effective_tier().as_str().to_string(),
                    round1_response: Some(text.clone()),
                    round2_response: None,
                    round1_time_ms: Some(*time_ms),
                    round2_time_ms: None,
                });
            }
            Err(e) => {
                participants.push(CouncilParticipant {
                    model_id: model.id.clone(),
                    tier: model.effective_tier().as_str().to_string(),
                    round1_response: None,
                    round2_response: None,
                    round1_time_ms: None,
                    round2_time_ms: None,
                });
                tracing::warn!(model_id = %model.id, error = %e, "council round 1 call failed");
            }
        }
    }

    let round2 = join_all(round1_texts.iter().map(|(model_id, own_response)| {
        let others: Vec<String> = round1_texts
            .iter()
            .filter(|(id, _)| id != model_id)
            .map(|(id, text)| format!("[{id}]: {text}"))
            .collect();
        let prompt = format!(
            "Question: {}\n\nYour initial answer:\n{own_response}\n\nOther participants' initial answers:\n{}\n\n\
             Refine your answer, incorporating useful insights from the others and correcting any errors.",
            request.query,
            others.join("\n\n")
        );
        let model = models.iter().find(|m| &m.id == model_id).expect("model_id came from models").clone();
        async move { (model.id.clone(), orch.call_model(&model.id, model.effective_tier(), "council", &prompt, request.max_tokens, request.temperature).await) }
    }))
    .await;

    let mut round2_by_id = std::collections::HashMap::new();
    for (model_id, result) in round2 {
        match result {
            Ok((text, _tokens, time_ms)) => {
                round2_by_id.insert(model_id, (text, time_ms));
            }
            Err(e) => {
                tracing::warn!(model_id = %model_id, error = %e, "council round 2 call failed, falling back to round 1 response");
            }
        }
    }

    for participant in participants.iter_mut() {
        if let Some(r1) = &participant.round1_response {
            if let Some((r2_text, r2_time)) = round2_by_id.get(&participant.model_id) {
                participant.round2_response = Some(r2_text.clone());
                participant.round2_time_ms = Some(*r2_time);
            } else {
                participant.round2_response = Some(r1.clone());
            }
        }
    }

    let round2_texts: Vec<(String, String)> =
        participants.iter().filter_map(|p| p.round2_response.clone().map(|r| (p.model_id.clone(), r))).collect();

    let synthesis_model = models.iter().find(|m| m.effective_tier() == Tier::Powerful).or_else(|| models.first());
    let synthesis_prompt = format!(
        "Question: {}\n\nMultiple models produced refined answers:\n{}\n\n\
         Synthesize these into one comprehensive, accurate final answer.",
        request.query,
        round2_texts.iter().map(|(id, text)| format!("[{id}]: {text}")).collect::<Vec<_>>().join("\n\n")
    );

    let (response_text, synthesis_model_id, synthesis_degraded) = match synthesis_model {
        Some(model) => {
            match orch
                .call_model(&model.id, model.effective_tier(), "council", &synthesis_prompt, request.max_tokens, request.temperature * 0.8)
                .await
            {
                Ok((text, _, _)) => (text, Some(model.id.clone()), false),
                Err(e) => {
                    tracing::warn!(error = %e, "council synthesis call failed, falling back to longest round 2 response");
                    (longest(&round2_texts), None, true)
                }
            }
        }
        None => (longest(&round2_texts), None, true),
    };

    let mut generation_meta = Map::new();
    generation_meta.insert("round1_successes".to_string(), json!(successes));
    generation_meta.insert("synthesis_degraded".to_string(), json!(synthesis_degraded));
    orch.tracker.complete_stage(query_id, StageName::Generation, generation_meta)?;

    let tier = synthesis_model.map(|m| m.effective_tier().as_str().to_string());
    Ok(ModeOutcome {
        response_text,
        model_id: synthesis_model_id.clone(),
        tier,
        council: Some(CouncilMetadata { adversarial: false, participants, synthesis_model_id, synthesis_degraded }),
        ..Default::default()
    })
}

async fn run_adversarial(
    orch: &Orchestrator,
    query_id: &str,
    context_text: &str,
    request: &QueryRequest,
) -> Result<ModeOutcome, OrchestratorError> {
    orch.tracker.start_stage(query_id, StageName::Routing)?;
    let models = pick_models(orch, &[Tier::Balanced, Tier::Powerful, Tier::Fast], 2);
    if models.len() < ADVERSARIAL_FLOOR {
        let e = OrchestratorError::NoModelAvailable(format!(
            "council adversarial needs at least {ADVERSARIAL_FLOOR} READY enabled models, found {}",
            models.len()
        ));
        orch.tracker.fail_stage(query_id, StageName::Routing, e.to_string())?;
        return Err(e);
    }
    let model_a = &models[0];
    let model_b = &models[1];
    let mut routing_meta = Map::new();
    routing_meta.insert("participants".to_string(), json!([model_a.id.clone(), model_b.id.clone()]));
    orch.tracker.complete_stage(query_id, StageName::Routing, routing_meta)?;

    orch.tracker.start_stage(query_id, StageName::Generation)?;

    let pro_prompt = format!(
        "You are arguing FOR (PRO) the following proposition. Argue persuasively and make your strongest case.\n\n\
         Proposition: {}\n\nContext:\n{context_text}",
        request.query
    );
    let con_prompt = format!(
        "You are arguing AGAINST (CON) the following proposition. Argue persuasively and make your strongest case.\n\n\
         Proposition: {}\n\nContext:\n{context_text}",
        request.query
    );

    let (a_r1, b_r1) = tokio::join!(
        orch.call_model(&model_a.id, model_a.effective_tier(), "council", &pro_prompt, ROUND1_MAX_TOKENS, request.temperature),
        orch.call_model(&model_b.id, model_b.effective_tier(), "council", &con_prompt, ROUND1_MAX_TOKENS, request.temperature),
    );

    let (a_r1_text, a_r1_ms) = match a_r1 {
        Ok((text, _, ms)) => (text, ms),
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Generation, e.to_string())?;
            return Err(e);
        }
    };
    let (b_r1_text, b_r1_ms) = match b_r1 {
        Ok((text, _, ms)) => (text, ms),
        Err(e) => {
            orch.tracker.fail_stage(query_id, StageName::Generation, e.to_string())?;
            return Err(e);
        }
    };

    let a_rebuttal_prompt = format!(
        "You argued PRO on: {}\n\nYour argument:\n{a_r1_text}\n\nYour opponent argued CON:\n{b_r1_text}\n\n\
         Write a rebuttal defending your position and countering theirs.",
        request.query
    );
    let b_rebuttal_prompt = format!(
        "You argued CON on: {}\n\nYour argument:\n{b_r1_text}\n\nYour opponent argued PRO:\n{a_r1_text}\n\n\
         Write a rebuttal defending your position and countering theirs.",
        request.query
    );

    let (a_r2, b_r2) = tokio::join!(
        orch.call_model(&model_a.id, model_a.effective_tier(), "council", &a_rebuttal_prompt, request.max_tokens, request.temperature),
        orch.call_model(&model_b.id, model_b.effective_tier(), "council", &b_rebuttal_prompt, request.max_tokens, request.temperature),
    );

    let (a_r2_text, a_r2_ms) = match a_r2 {
        Ok((text, _, ms)) => (text, Some(ms)),
        Err(e) => {
            tracing::warn!(model_id = %model_a.id, error = %e, "council round 2 call failed, falling back to round 1 argument");
            (a_r1_text.clone(), None)
        }
    };
    let (b_r2_text, b_r2_ms) = match b_r2 {
        Ok((text, _, ms)) => (text, Some(ms)),
        Err(e) => {
            tracing::warn!(model_id = %model_b.id, error = %e, "council round 2 call failed, falling back to round 1 argument");
            (b_r1_text.clone(), None)
        }
    };

    let moderator = pick_models(orch, &[Tier::Powerful, Tier::Balanced, Tier::Fast], 3)
        .into_iter()
        .find(|m| m.id != model_a.id && m.id != model_b.id)
        .unwrap_or_else(|| model_b.clone());

    let moderator_prompt = format!(
        "Two models debated the question: {}\n\nPRO final argument:\n{a_r2_text}\n\nCON final argument:\n{b_r2_text}\n\n\
         Write a balanced, neutral summary of both sides and a reasoned conclusion.",
        request.query
    );

    let (response_text, synthesis_model_id, synthesis_degraded) =
        match orch.call_model(&moderator.id, moderator.effective_tier(), "council", &moderator_prompt, request.max_tokens, 0.5).await {
            Ok((text, _, _)) => (text, Some(moderator.id.clone()), false),
            Err(e) => {
                tracing::warn!(error = %e, "council moderator call failed, falling back to longer round 2 argument");
                let fallback = if a_r2_text.len() >= b_r2_text.len() { a_r2_text.clone() } else { b_r2_text.clone() };
                (fallback, None, true)
            }
        };

    let mut generation_meta = Map::new();
    generation_meta.insert("synthesis_degraded".to_string(), json!(synthesis_degraded));
    orch.tracker.complete_stage(query_id, StageName::Generation, generation_meta)?;

    let participants = vec![
        CouncilParticipant {
            model_id: model_a.id.clone(),
            tier: model_a.effective_tier().as_str().to_string(),
            round1_response: Some(a_r1_text),
            round2_response: Some(a_r2_text),
            round1_time_ms: Some(a_r1_ms),
            round2_time_ms: a_r2_ms,
        },
        CouncilParticipant {
            model_id: model_b.id.clone(),
            tier: model_b.effective_tier().as_str().to_string(),
            round1_response: Some(b_r1_text),
            round2_response: Some(b_r2_text),
            round1_time_ms: Some(b_r1_ms),
            round2_time_ms: b_r2_ms,
        },
    ];

    Ok(ModeOutcome {
        response_text,
        model_id: synthesis_model_id.clone(),
        tier: Some(moderator.effective_tier().as_str().to_string()),
        council: Some(CouncilMetadata { adversarial: true, participants, synthesis_model_id, synthesis_degraded }),
        ..Default::default()
    })
}

fn longest(texts: &[(String, String)]) -> String {
    texts.iter().map(|(_, t)| t.clone()).max_by_key(|t| t.len()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::{base_request, empty_orchestrator};
    use crate::types::Mode;

    #[tokio::test]
    async fn consensus_fails_routing_when_fewer_than_two_models_are_ready() {
        let orch = empty_orchestrator().await;
        orch.tracker.create_pipeline("q1");
        let request = base_request(Mode::Council);
        let result = run(&orch, "q1", "", &request).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[tokio::test]
    async fn adversarial_fails_routing_when_fewer_than_two_models_are_ready() {
        let orch = empty_orchestrator().await;
        orch.tracker.create_pipeline("q1");
        let mut request = base_request(Mode::Council);
        request.council_adversarial = true;
        let result = run(&orch, "q1", "", &request).await;
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[tokio::test]
    async fn pick_models_returns_nothing_from_an_empty_registry() {
        let orch = empty_orchestrator().await;
        let chosen = pick_models(&orch, &[Tier::Fast, Tier::Balanced, Tier::Powerful], 3);
        assert!(chosen.is_empty());
    }

    #[test]
    fn longest_picks_the_longer_of_two_responses() {
        let longest_of = longest(&[("a".to_string(), "short".to_string()), ("b".to_string(), "a much longer response".to_string())]);
        assert_eq!(longest_of, "a much longer response");
    }

    #[test]
    fn longest_returns_empty_string_for_no_candidates() {
        assert_eq!(longest(&[]), "");
    }
}
