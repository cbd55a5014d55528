//! Optional web-search collaborator.
//!
//! Out of core scope, but the door is kept open: when present, it
//! behaves like an additional CGRAG-equivalent context source — a sequence
//! of snippets merged into the same context slot — with the identical
//! never-fail-the-query policy. `NullWebSearchClient` is what `Orchestrator`
//! wires in today; `web_search` on `QueryRequest` is accepted but unused
//! until a real client is configured.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct WebSearchResult {
    pub snippets: Vec<String>,
}

impl WebSearchResult {
    pub fn merged_text(&self) -> String {
        self.snippets.join("\n\n")
    }
}

#[derive(Debug, Error, Clone)]
pub enum WebSearchError {
    #[error("web search upstream error: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait WebSearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchResult, WebSearchError>;
}

#[derive(Debug, Default)]
pub struct NullWebSearchClient;

#[async_trait]
impl WebSearchClient for NullWebSearchClient {
    async fn search(&self, _query: &str) -> Result<WebSearchResult, WebSearchError> {
        Ok(WebSearchResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_client_returns_no_snippets() {
        let client = NullWebSearchClient;
        let result = client.search("anything").await.unwrap();
        assert!(result.snippets.is_empty());
        assert_eq!(result.merged_text(), "");
    }
}
