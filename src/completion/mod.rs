//! Completion providers: send chat-style messages, get text back.
//!
//! Two backends are supported behind one object-safe trait: a hosted
//! chat-completion API (`openai`) and a self-hosted HTTP endpoint (`local`).
//! Selection is a configuration value resolved by [`build_provider`], so the
//! orchestrator can swap backends without code changes. No retries happen at
//! this layer; retry policy belongs to the generation orchestrator.

pub mod local;
pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProviderKind};
use crate::error::{ConfigError, GenerationError};

pub use local::OllamaProvider;
pub use openai::OpenAiProvider;
pub use retry::retry_with_backoff;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat-style message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Abstraction over "send chat messages, get text back".
///
/// All transport errors, non-2xx statuses, and backend error payloads are
/// normalized to [`GenerationError::Backend`] carrying the underlying cause.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, GenerationError>;
}

/// Construct the configured completion provider.
pub fn build_provider(config: &Config) -> Result<Box<dyn CompletionProvider>, ConfigError> {
    match config.model_provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
            Ok(Box::new(OpenAiProvider::new(
                config.openai_base_url.clone(),
                api_key,
                config.openai_model.clone(),
                config.completion_timeout,
            )))
        }
        ProviderKind::Ollama => Ok(Box::new(OllamaProvider::new(
            config.ollama_base_url.clone(),
            config.ollama_model.clone(),
            config.completion_timeout,
        ))),
    }
}

/// Flatten chat messages into a single role-labeled prompt for backends
/// that take one text field instead of a message list.
pub(crate) fn flatten_messages(messages: &[Message]) -> String {
    let parts: Vec<String> = messages
        .iter()
        .map(|msg| match msg.role {
            Role::System => format!("Instructions: {}\n", msg.content),
            Role::User => format!("User: {}\n", msg.content),
            Role::Assistant => format!("Assistant: {}\n", msg.content),
        })
        .collect();
    parts.join("\n")
}
