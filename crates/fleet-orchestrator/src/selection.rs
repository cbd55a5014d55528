//! Model selection: `SelectModel` and `SelectCoderModel`.
//!
//! Both draw from the same pool — enabled models with a currently READY
//! inference server — and use a stateful per-tier round-robin counter for
//! reproducible tie-breaking among same-tier candidates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fleet_inference::Manager;
use fleet_registry::Registry;
use fleet_types::{Model, Tier};

use crate::error::OrchestratorError;

pub struct Selector {
    registry: Arc<Registry>,
    inference: Arc<Manager>,
    round_robin: HashMap<Tier, AtomicUsize>,
}

impl Selector {
    pub fn new(registry: Arc<Registry>, inference: Arc<Manager>) -> Self {
        let round_robin = [Tier::Fast, Tier::Balanced, Tier::Powerful].into_iter().map(|t| (t, AtomicUsize::new(0))).collect();
        Self { registry, inference, round_robin }
    }

    /// Enabled models with a currently READY server, regardless of tier.
    pub fn ready_enabled_models(&self) -> Vec<Model> {
        self.registry.list_enabled().into_iter().filter(|m| self.inference.is_ready(&m.id)).collect()
    }

    fn ready_in_tier(&self, tier: Tier) -> Vec<Model> {
        let mut models: Vec<Model> = self.ready_enabled_models().into_iter().filter(|m| m.effective_tier() == tier).collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    fn pick_round_robin(&self, tier: Tier, candidates: &[Model]) -> Model {
        let counter = self.round_robin.get(&tier).expect("every Tier has a round-robin counter");
        let index = counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates[index].clone()
    }

    /// `SelectModel`: prefer `tier`; if empty, fall back to any READY
    /// enabled model, preferring the next tier up for `POWERFUL` requests
    /// and the next tier down for `FAST` requests.
    pub fn select_model(&self, tier: Tier) -> Result<Model, OrchestratorError> {
        let in_tier = self.ready_in_tier(tier);
        if !in_tier.is_empty() {
            return Ok(self.pick_round_robin(tier, &in_tier));
        }

        let fallback_order = fallback_tier_order(tier);
        for fallback_tier in fallback_order {
            let candidates = self.ready_in_tier(fallback_tier);
            if !candidates.is_empty() {
                return Ok(self.pick_round_robin(fallback_tier, &candidates));
            }
        }

        Err(OrchestratorError::NoModelAvailable(format!("no READY enabled model available for tier {}", tier.as_str())))
    }

    /// `SelectCoderModel`: same pool, restricted to `is_coder`.
    pub fn select_coder_model(&self) -> Result<Model, OrchestratorError> {
        let mut coders: Vec<Model> = self.ready_enabled_models().into_iter().filter(|m| m.is_coder).collect();
        coders.sort_by(|a, b| a.id.cmp(&b.id));
        if coders.is_empty() {
            return Err(OrchestratorError::NoModelAvailable("no READY enabled coder model available".to_string()));
        }
        let counter = self.round_robin.get(&Tier::Balanced).expect("Balanced counter exists");
        let index = counter.fetch_add(1, Ordering::Relaxed) % coders.len();
        Ok(coders[index].clone())
    }
}

/// Fallback search order when the requested tier has no READY candidate.
/// A `POWERFUL` request prefers the next tier up if one existed, but since
/// `POWERFUL` is the ceiling it steps down to `BALANCED` then `FAST`; a
/// `FAST` request prefers stepping down further (toward cheaper tiers)
/// before stepping up.
fn fallback_tier_order(requested: Tier) -> Vec<Tier> {
    match requested {
        Tier::Powerful => vec![Tier::Balanced, Tier::Fast],
        Tier::Balanced => vec![Tier::Powerful, Tier::Fast],
        Tier::Fast => vec![Tier::Balanced, Tier::Powerful],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_inference::ManagerConfig;

    fn model(id: &str, tier: Tier, is_coder: bool) -> Model {
        Model {
            id: id.to_string(),
            path: String::new(),
            family: "test".to_string(),
            version: "1".to_string(),
            size_params: 8.0,
            quantization: fleet_types::Quantization::Q4KM,
            is_thinking: false,
            thinking_override: None,
            is_coder,
            is_instruct: true,
            assigned_tier: tier,
            tier_override: None,
            port: 8100,
            enabled: true,
            missing_file_warning: None,
        }
    }

    #[test]
    fn fallback_order_steps_down_first_for_each_tier() {
        assert_eq!(fallback_tier_order(Tier::Powerful), vec![Tier::Balanced, Tier::Fast]);
        assert_eq!(fallback_tier_order(Tier::Fast), vec![Tier::Balanced, Tier::Powerful]);
    }

    #[tokio::test]
    async fn select_model_returns_no_model_available_when_nothing_ready() {
        let registry = Arc::new(Registry::new("/tmp", (8100, 8200), fleet_types::TierThresholds::default()));
        let inference = Arc::new(Manager::new(ManagerConfig::default()));
        let selector = Selector::new(registry, inference);
        let result = selector.select_model(Tier::Fast);
        assert!(matches!(result, Err(OrchestratorError::NoModelAvailable(_))));
    }

    #[test]
    fn pick_round_robin_cycles_through_candidates() {
        let registry = Arc::new(Registry::new("/tmp", (8100, 8200), fleet_types::TierThresholds::default()));
        let inference = Arc::new(Manager::new(ManagerConfig::default()));
        let selector = Selector::new(registry, inference);
        let candidates = vec![model("a", Tier::Fast, false), model("b", Tier::Fast, false)];
        let first = selector.pick_round_robin(Tier::Fast, &candidates);
        let second = selector.pick_round_robin(Tier::Fast, &candidates);
        assert_ne!(first.id, second.id);
    }
}
