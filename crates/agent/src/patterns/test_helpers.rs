//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use overseer_core::error::{ModelError, ToolError};
use overseer_core::message::{ContentBlock, Message, ToolUse};
use overseer_core::model::{CallOptions, ChunkReceiver, Model, ModelResponse, StreamChunk, ToolDefinition, Usage};
use overseer_core::tool::{Tool, ToolRegistry, ToolResponse, Toolkit};
use std::sync::Mutex;

/// Route `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A mock model that returns a sequence of scripted responses.
///
/// Each call returns the next response in the queue. Once the queue is
/// exhausted the `repeat` response is returned forever if one was set;
/// otherwise the call panics.
pub struct SequentialMockModel {
    responses: Mutex<Vec<Result<ModelResponse, ModelError>>>,
    repeat: Option<ModelResponse>,
    streaming: bool,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<(Vec<Message>, CallOptions)>>,
}

impl SequentialMockModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            repeat: None,
            streaming: false,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// A model that returns the same response on every call.
    pub fn always(response: ModelResponse) -> Self {
        let mut model = Self::new(vec![]);
        model.repeat = Some(response);
        model
    }

    /// Serve responses through `stream()`, one chunk per content block.
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every conversation this model was called with, in call order.
    pub fn requests(&self) -> Vec<(Vec<Message>, CallOptions)> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, messages: &[Message], options: &CallOptions) -> Result<ModelResponse, ModelError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.clone()));

        let mut count = self.call_count.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();
        *count += 1;

        if !responses.is_empty() {
            return responses.remove(0);
        }
        match &self.repeat {
            Some(response) => Ok(response.clone()),
            None => panic!("SequentialMockModel: no more responses (call #{})", *count),
        }
    }
}

#[async_trait]
impl Model for SequentialMockModel {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn call(&self, messages: &[Message], options: &CallOptions) -> Result<ModelResponse, ModelError> {
        self.next(messages, options)
    }

    async fn stream(&self, messages: &[Message], options: &CallOptions) -> Result<ChunkReceiver, ModelError> {
        let response = self.next(messages, options)?;
        let blocks = response.content;
        let (tx, rx) = tokio::sync::mpsc::channel(blocks.len() + 1);
        for block in blocks {
            tx.send(Ok(StreamChunk {
                content: vec![block],
                done: false,
                usage: None,
            }))
            .await
            .unwrap();
        }
        tx.send(Ok(StreamChunk {
            content: vec![],
            done: true,
            usage: response.usage,
        }))
        .await
        .unwrap();
        Ok(rx)
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ModelResponse {
    ModelResponse {
        id: "resp_text".into(),
        content: vec![ContentBlock::text(text)],
        usage: usage(),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// Create a response with tool uses and optional thought text.
pub fn make_tool_use_response(tool_uses: Vec<ToolUse>, thought: &str) -> ModelResponse {
    let mut content = Vec::new();
    if !thought.is_empty() {
        content.push(ContentBlock::text(thought));
    }
    content.extend(tool_uses.into_iter().map(ContentBlock::ToolUse));
    ModelResponse {
        id: "resp_tools".into(),
        content,
        usage: usage(),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

/// Helper to create a tool use block.
pub fn make_tool_use(id: &str, name: &str, input: serde_json::Value) -> ToolUse {
    ToolUse {
        id: id.into(),
        name: name.into(),
        input: input.as_object().cloned().unwrap_or_default(),
    }
}

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to echo" }
            },
            "required": ["text"]
        })
    }

    async fn execute(
        &self,
        input: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolResponse, ToolError> {
        let text = input.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(ToolResponse::text(format!("echo: {text}")))
    }
}

pub fn echo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(EchoTool));
    registry
}

/// Advertises one tool and fails every call.
pub struct FailingToolkit {
    pub calls: Mutex<usize>,
}

impl FailingToolkit {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Toolkit for FailingToolkit {
    fn schemas(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "bash".into(),
            description: "Run a shell command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "command": { "type": "string", "description": "Command line" } }
            }),
        }]
    }

    async fn call(&self, request: &ToolUse) -> Result<ToolResponse, ToolError> {
        *self.calls.lock().unwrap() += 1;
        Err(ToolError::ExecutionFailed {
            tool_name: request.name.clone(),
            reason: "sandbox unavailable".into(),
        })
    }
}
