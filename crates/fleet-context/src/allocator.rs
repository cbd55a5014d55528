//! In-memory context window allocator.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use dashmap::DashMap;
use fleet_types::{CgragArtifactRef, Component, ComponentKind, ContextAllocation};
use serde::Serialize;
use tracing::{debug, info};

use crate::estimator::TokenCounter;

const PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
    pub ttl: StdDuration,
    pub cleanup_interval: StdDuration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { ttl: StdDuration::from_secs(3600), cleanup_interval: StdDuration::from_secs(300) }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactInput {
    pub source: String,
    pub relevance: f64,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub query_id: String,
    pub model_id: String,
    pub system_prompt: String,
    pub cgrag_context: String,
    pub user_query: String,
    pub context_window: usize,
    pub cgrag_artifacts: Vec<ArtifactInput>,
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct AllocatorStats {
    pub total: usize,
    pub avg_utilization: f64,
}

struct Entry {
    stored_at: chrono::DateTime<Utc>,
    allocation: ContextAllocation,
}

pub struct Allocator {
    config: AllocatorConfig,
    counter: TokenCounter,
    entries: DashMap<String, Entry>,
}

impl Allocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config, counter: TokenCounter::new(), entries: DashMap::new() }
    }

    fn preview(text: &str) -> String {
        if text.chars().count() <= PREVIEW_CHARS {
            text.to_string()
        } else {
            text.chars().take(PREVIEW_CHARS).collect::<String>() + "…"
        }
    }

    /// `Store`: counts tokens per component, trims components down to fit
    /// `context_window` when they would overflow it, then computes
    /// `response_budget` off the post-trim totals so Invariant I7 holds
    /// unconditionally rather than just being reported as a warning.
    /// Storage errors never fail a query — there is nothing fallible here,
    /// so this always succeeds.
    pub fn store(&self, request: StoreRequest) -> ContextAllocation {
        let mut system_text = request.system_prompt;
        let mut cgrag_text = request.cgrag_context;
        let mut query_text = request.user_query;

        let mut system_tokens = self.counter.count(&system_text);
        let mut cgrag_tokens = self.counter.count(&cgrag_text);
        let mut query_tokens = self.counter.count(&query_text);
        let original_sum_used = system_tokens + cgrag_tokens + query_tokens;

        // Trim cgrag context first, then the system prompt, then (as a last
        // resort) the user query itself, until the total fits the window.
        let mut overflow = original_sum_used.saturating_sub(request.context_window);
        if overflow > 0 {
            let cut = overflow.min(cgrag_tokens);
            cgrag_tokens -= cut;
            cgrag_text = self.counter.trim_to_tokens(&cgrag_text, cgrag_tokens);
            overflow -= cut;
        }
        if overflow > 0 {
            let cut = overflow.min(system_tokens);
            system_tokens -= cut;
            system_text = self.counter.trim_to_tokens(&system_text, system_tokens);
            overflow -= cut;
        }
        if overflow > 0 {
            let cut = overflow.min(query_tokens);
            query_tokens -= cut;
            query_text = self.counter.trim_to_tokens(&query_text, query_tokens);
            overflow -= cut;
        }
        debug_assert_eq!(overflow, 0);

        let sum_used = system_tokens + cgrag_tokens + query_tokens;
        let trimmed_tokens = original_sum_used.saturating_sub(sum_used);

        let response_budget = request.context_window.saturating_sub(sum_used);
        let utilization_pct = if request.context_window == 0 {
            100.0
        } else {
            (sum_used as f64 / request.context_window as f64) * 100.0
        };

        let warning = if trimmed_tokens > 0 {
            Some(format!(
                "context overflow: trimmed {trimmed_tokens} tokens to fit a {}-token window",
                request.context_window
            ))
        } else if utilization_pct >= 80.0 {
            Some(format!("context utilization at {utilization_pct:.1}%"))
        } else {
            None
        };

        let components = vec![
            Component {
                kind: ComponentKind::SystemPrompt,
                tokens_used: system_tokens,
                tokens_allocated: system_tokens,
                content_preview: Self::preview(&system_text),
            },
            Component {
                kind: ComponentKind::CgragContext,
                tokens_used: cgrag_tokens,
                tokens_allocated: cgrag_tokens,
                content_preview: Self::preview(&cgrag_text),
            },
            Component {
                kind: ComponentKind::UserQuery,
                tokens_used: query_tokens,
                tokens_allocated: query_tokens,
                content_preview: Self::preview(&query_text),
            },
            Component {
                kind: ComponentKind::ResponseBudget,
                tokens_used: 0,
                tokens_allocated: response_budget,
                content_preview: String::new(),
            },
        ];

        let cgrag_artifacts = request
            .cgrag_artifacts
            .iter()
            .map(|artifact| CgragArtifactRef {
                source: artifact.source.clone(),
                relevance: artifact.relevance,
                tokens: self.counter.count(&artifact.content),
                preview: Self::preview(&artifact.content),
            })
            .collect();

        let allocation = ContextAllocation {
            query_id: request.query_id.clone(),
            model_id: request.model_id,
            context_window_size: request.context_window,
            components,
            cgrag_artifacts,
            total_used: sum_used,
            remaining: response_budget,
            utilization_pct,
            warning,
        };

        self.entries.insert(request.query_id, Entry { stored_at: Utc::now(), allocation: allocation.clone() });
        allocation
    }

    /// `Get`.
    pub fn get(&self, query_id: &str) -> Option<ContextAllocation> {
        self.entries.get(query_id).map(|e| e.allocation.clone())
    }

    /// `Stats`.
    pub fn stats(&self) -> AllocatorStats {
        let total = self.entries.len();
        if total == 0 {
            return AllocatorStats::default();
        }
        let sum: f64 = self.entries.iter().map(|e| e.allocation.utilization_pct).sum();
        AllocatorStats { total, avg_utilization: sum / total as f64 }
    }

    fn sweep(&self) {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::hours(1));
        let expired: Vec<String> = self.entries.iter().filter(|e| e.stored_at < cutoff).map(|e| e.key().clone()).collect();
        for id in &expired {
            self.entries.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired context allocations");
        }
    }

    pub fn start_cleanup(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.cleanup_interval;
        info!(?interval, "starting context allocation cleanup loop");
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

    fn request(context_window: usize) -> StoreRequest {
        StoreRequest {
            query_id: "q1".to_string(),
            model_id: "model-a".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            cgrag_context: "retrieved context goes here".to_string(),
            user_query: "what is the weather".to_string(),
            context_window,
            cgrag_artifacts: vec![ArtifactInput { source: "doc1".to_string(), relevance: 0.9, content: "some retrieved text".to_string() }],
        }
    }

    #[test]
    fn store_computes_response_budget_and_no_warning_under_low_utilization() {
        let allocator = Allocator::new(AllocatorConfig::default());
        let allocation = allocator.store(request(8192));
        assert!(allocation.remaining > 0);
        assert!(allocation.warning.is_none());
        assert_eq!(allocation.total_used + allocation.remaining, 8192);
    }

    #[test]
    fn store_warns_on_overflow() {
        let allocator = Allocator::new(AllocatorConfig::default());
        let allocation = allocator.store(request(5));
        assert_eq!(allocation.remaining, 0);
        assert!(allocation.warning.unwrap().contains("overflow"));
    }

    /// Invariant I7 / Property P6: the sum of non-response-budget
    /// `tokens_used` plus the response budget's `tokens_allocated` must
    /// never exceed `context_window_size`, even when the requested
    /// components would have overflowed it before trimming.
    #[test]
    fn store_never_violates_the_context_window_invariant_when_overflowing() {
        let allocator = Allocator::new(AllocatorConfig::default());
        for window in [0usize, 1, 5, 10, 30, 8192] {
            let allocation = allocator.store(request(window));
            let non_response_used: usize = allocation
                .components
                .iter()
                .filter(|c| c.kind != ComponentKind::ResponseBudget)
                .map(|c| c.tokens_used)
                .sum();
            let response_allocated = allocation
                .components
                .iter()
                .find(|c| c.kind == ComponentKind::ResponseBudget)
                .map(|c| c.tokens_allocated)
                .unwrap_or(0);
            assert!(
                non_response_used + response_allocated <= window,
                "window={window}: {non_response_used} + {response_allocated} > {window}"
            );
        }
    }

    #[test]
    fn get_returns_the_stored_allocation() {
        let allocator = Allocator::new(AllocatorConfig::default());
        allocator.store(request(8192));
        assert!(allocator.get("q1").is_some());
        assert!(allocator.get("missing").is_none());
    }

    #[test]
    fn stats_averages_utilization_across_entries() {
        let allocator = Allocator::new(AllocatorConfig::default());
        allocator.store(request(8192));
        let mut second = request(8192);
        second.query_id = "q2".to_string();
        allocator.store(second);
        let stats = allocator.stats();
        assert_eq!(stats.total, 2);
        assert!(stats.avg_utilization > 0.0);
    }

    #[test]
    fn sweep_removes_entries_past_ttl() {
        let allocator = Allocator::new(AllocatorConfig { ttl: StdDuration::from_secs(0), ..AllocatorConfig::default() });
        allocator.store(request(8192));
        allocator.sweep();
        assert!(allocator.get("q1").is_none());
    }
}
