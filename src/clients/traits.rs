use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm returned an empty completion")]
    Empty,
    #[error("parse error: {0}")]
    ParseError(String),
}

/// Opaque text-in/text-out completion service. One attempt per call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `json_mode` asks the provider for a JSON-only completion
    async fn complete(&self, messages: &[ChatMessage], json_mode: bool) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}
