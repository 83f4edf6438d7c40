//! Client side of the hosted LLM provider.
//!
//! - [`openai`]: reqwest client for OpenAI-compatible `/chat/completions`

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::ChatMessage;

/// Text fragments of a streamed reply, in upstream order. Closes when the
/// upstream stream ends.
pub type TextStream = mpsc::Receiver<String>;

/// Event payload that ends a streamed completion.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream returned no completion")]
    EmptyCompletion,

    #[error("Model refused the request: {0}")]
    Refusal(String),

    #[error("Invalid value for header {0}")]
    InvalidHeader(&'static str),
}

/// Chat completion request body (OpenAI-compatible).
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature,
            response_format: None,
            stream: false,
        }
    }

    /// Constrain the reply to `schema` using the `json_schema` response format.
    pub fn with_json_schema(mut self, name: &str, schema: Value) -> Self {
        self.response_format = Some(serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "strict": true,
                "schema": schema,
            }
        }));
        self
    }
}

/// Non-streaming completion response.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

/// One frame of a streamed completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Some providers report failures inside an otherwise healthy stream.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// An LLM completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a single completion and return the first choice's text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError>;

    /// Open a streaming completion.
    ///
    /// Errors are returned only for failures before the first fragment; a
    /// failure after that closes the stream early.
    async fn stream_chat(&self, request: CompletionRequest) -> Result<TextStream, UpstreamError>;
}
