//! OpenAI-compatible chat completion client (`Call`).
//!
//! Targets a single locally-spawned model server rather than a configurable
//! upstream, and decodes the response instead of relaying it byte-for-byte.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::InferenceError;

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
}

impl Default for InferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("failed to build reqwest client"),
        }
    }

    /// POST `{host}:{port}/v1/chat/completions` with `prompt` as a single
    /// user message. Returns the generated text and the reported token
    /// count.
    #[instrument(skip(self, prompt), fields(model_id))]
    pub async fn call(
        &self,
        model_id: &str,
        host: &str,
        port: u16,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<(String, u32), InferenceError> {
        let url = format!("http://{host}:{port}/v1/chat/completions");
        debug!(url = %url, "calling inference server");

        let body = json!({
            "model": model_id,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": temperature,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(model_id.to_string())
                } else {
                    InferenceError::HttpError {
                        model_id: model_id.to_string(),
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                model_id: model_id.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::DecodeError(model_id.to_string(), e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| InferenceError::DecodeError(model_id.to_string(), "no choices in response".to_string()))?;

        let tokens = parsed.usage.map(|u| u.completion_tokens).unwrap_or(0);
        Ok((text, tokens))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    completion_tokens: u32,
}
