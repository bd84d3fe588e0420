//! Self-hosted HTTP completion backend (Ollama-style generate endpoint).
//!
//! The endpoint takes a single flattened prompt rather than a message list,
//! so chat messages are concatenated with role-labeled prefixes before the
//! request goes out.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::GenerationError;

use super::{CompletionProvider, Message, flatten_messages};

const TEMPERATURE: f64 = 0.1;

/// Client for a self-hosted `/api/generate` endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        OllamaProvider {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, GenerationError> {
        let prompt = flatten_messages(messages);
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_len = prompt.len(), "Calling local generate endpoint");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "temperature": TEMPERATURE,
            }))
            .send()
            .await
            .map_err(|e| GenerationError::Backend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "local backend returned {status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(format!("malformed backend response: {e}")))?;

        Ok(parsed.response)
    }
}
