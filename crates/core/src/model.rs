//! Model trait: the abstraction over language model backends.
//!
//! A Model takes a conversation and returns content blocks, either as one
//! complete response or as a stream of chunks ending in a terminal chunk.
//! HTTP details of any particular backend live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::error::ModelError;
use crate::message::{ContentBlock, Message};

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// How the model may use the tools it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
}

/// Per-call options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallOptions {
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

/// A complete (non-streaming) response from a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Backend-assigned response ID
    #[serde(default)]
    pub id: String,

    /// The generated content blocks
    pub content: Vec<ContentBlock>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    #[serde(default)]
    pub model: String,

    /// Backend-specific metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ModelResponse {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            id: String::new(),
            content,
            usage: None,
            model: String::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn has_tool_uses(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse(_)))
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
///
/// Text and thinking blocks are deltas: a consumer joins adjacent ones of
/// the same kind into a single block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content blocks carried by this chunk
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Receiving half of a streamed model response.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ModelError>>;

/// The core Model trait.
///
/// The agent loop calls `call()` or `stream()` without knowing which backend
/// sits behind it.
#[async_trait]
pub trait Model: Send + Sync {
    /// A human-readable name for this model (e.g., "claude-sonnet", "mock").
    fn name(&self) -> &str;

    /// Send a conversation and get a complete response.
    async fn call(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> std::result::Result<ModelResponse, ModelError>;

    /// Send a conversation and get a stream of response chunks.
    ///
    /// Text and thinking blocks arrive as deltas, so a backend may split one
    /// block across chunks. Separate text blocks from `call()` therefore come
    /// back joined once streamed.
    ///
    /// Default implementation calls `call()` and wraps the result as a single terminal chunk.
    async fn stream(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> std::result::Result<ChunkReceiver, ModelError> {
        let response = self.call(messages, options).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: response.content,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }

    /// Whether the agent loop should consume this model through `stream()`.
    fn is_streaming(&self) -> bool {
        false
    }
}
