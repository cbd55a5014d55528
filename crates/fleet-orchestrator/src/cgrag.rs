//! CGRAG retrieval stage.
//!
//! `CgragClient` is the seam for the external retrieval collaborator:
//! `HttpCgragClient` calls out to a configured endpoint, `NullCgragClient`
//! is wired in when no endpoint is configured. Both honor the never-fail
//! policy at the call site in `orchestrator.rs`, not here — a client simply
//! returns `Err`; the caller decides to degrade to empty context.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgragArtifact {
    pub source: String,
    pub relevance: f64,
    pub tokens: usize,
    pub preview: String,
}

#[derive(Debug, Clone, Default)]
pub struct CgragResult {
    pub context_text: String,
    pub artifacts: Vec<CgragArtifact>,
}

#[derive(Debug, Error, Clone)]
pub enum CgragError {
    #[error("cgrag endpoint returned an error: {0}")]
    Upstream(String),
    #[error("cgrag request timed out")]
    Timeout,
}

#[async_trait]
pub trait CgragClient: Send + Sync {
    async fn retrieve(&self, query: &str, token_budget: usize) -> Result<CgragResult, CgragError>;
}

/// Calls a configured HTTP retrieval endpoint expecting
/// `{"context": string, "artifacts": [{source, relevance, tokens, preview}]}`.
pub struct HttpCgragClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpCgragClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self { client: Client::builder().build().expect("failed to build reqwest client"), endpoint: endpoint.into(), timeout }
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    context: String,
    #[serde(default)]
    artifacts: Vec<CgragArtifact>,
}

#[async_trait]
impl CgragClient for HttpCgragClient {
    async fn retrieve(&self, query: &str, token_budget: usize) -> Result<CgragResult, CgragError> {
        let body = serde_json::json!({ "query": query, "token_budget": token_budget });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { CgragError::Timeout } else { CgragError::Upstream(e.to_string()) })?;

        if !response.status().is_success() {
            return Err(CgragError::Upstream(format!("status {}", response.status())));
        }

        let parsed: RetrieveResponse = response.json().await.map_err(|e| CgragError::Upstream(e.to_string()))?;
        Ok(CgragResult { context_text: parsed.context, artifacts: parsed.artifacts })
    }
}

/// No-op retrieval client: returns empty context with no artifacts, used
/// when no CGRAG endpoint is configured. Never errors.
#[derive(Debug, Default)]
pub struct NullCgragClient;

#[async_trait]
impl CgragClient for NullCgragClient {
    async fn retrieve(&self, _query: &str, _token_budget: usize) -> Result<CgragResult, CgragError> {
        Ok(CgragResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_client_returns_empty_result() {
        let client = NullCgragClient;
        let result = client.retrieve("hello", 6000).await.unwrap();
        assert!(result.context_text.is_empty());
        assert!(result.artifacts.is_empty());
    }
}
