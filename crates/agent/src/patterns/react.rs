//! ReAct pattern: Thought → Action → Observation loop.
//!
//! The agent calls the model with the tool catalogue attached. Every tool
//! request in a response is executed in emission order and its result (or
//! an `Error: ...` observation) is appended to the working context before
//! the next model call. The loop ends when a response carries no tool
//! requests, or when the iteration budget runs out, in which case the
//! content collected so far is returned as a best-effort answer.
//!
//! Model failures abort the reply. Tool failures never do.

use async_trait::async_trait;
use chrono::Utc;
use overseer_config::AgentSettings;
use overseer_core::agent::{Agent, AgentBase};
use overseer_core::error::{Error, ModelError, Result};
use overseer_core::event::{DomainEvent, EventBus};
use overseer_core::hook::HookEvent;
use overseer_core::memory::{Memory, SharedMemory, shared};
use overseer_core::message::{ContentBlock, Message, Role, ToolResultBlock, ToolUse};
use overseer_core::model::{CallOptions, Model, ModelResponse, ToolChoice, ToolDefinition};
use overseer_core::tool::Toolkit;
use overseer_memory::History;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::{CompactionConfig, CompactionOutcome};

const EMPTY_RESPONSE: &str = "Empty response from model";
const NO_RESPONSE: &str = "No response generated";

/// A single reasoning-acting agent.
pub struct ReactAgent {
    base: AgentBase,
    system_prompt: String,
    model: Arc<dyn Model>,
    toolkit: Option<Arc<dyn Toolkit>>,
    memory: Option<SharedMemory>,
    compaction: Option<CompactionConfig>,
    /// Maximum model calls per reply.
    max_iterations: usize,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    event_bus: Option<Arc<EventBus>>,
    last_run: Mutex<Option<RunStats>>,
}

/// Bookkeeping for the most recent reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Model calls made
    pub iterations: usize,
    /// Tool requests executed (failed ones included)
    pub tool_calls: usize,
    /// Whether the loop stopped on the iteration budget
    pub budget_exhausted: bool,
}

impl ReactAgent {
    /// Create a new ReAct agent with no toolkit and no memory.
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>, model: Arc<dyn Model>) -> Self {
        Self {
            base: AgentBase::new(name),
            system_prompt: system_prompt.into(),
            model,
            toolkit: None,
            memory: None,
            compaction: None,
            max_iterations: 10,
            temperature: None,
            max_tokens: None,
            event_bus: None,
            last_run: Mutex::new(None),
        }
    }

    /// Create an agent from the `[agent]` config section, with a bounded history.
    pub fn from_settings(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: Arc<dyn Model>,
        settings: &AgentSettings,
    ) -> Self {
        let mut agent = Self::new(name, system_prompt, model)
            .with_max_iterations(settings.max_iterations)
            .with_temperature(settings.temperature)
            .with_memory(shared(History::new(settings.memory_capacity)));
        agent.max_tokens = settings.max_tokens;
        agent.base.set_console_output(settings.console_output);
        agent
    }

    pub fn with_toolkit(mut self, toolkit: Arc<dyn Toolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    pub fn with_memory(mut self, memory: SharedMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Check memory size at the start of every reply and summarize when over budget.
    pub fn with_compaction(mut self, config: CompactionConfig) -> Self {
        self.compaction = Some(config);
        self
    }

    /// Set max iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_console_output(self, enabled: bool) -> Self {
        self.base.set_console_output(enabled);
        self
    }

    pub fn memory(&self) -> Option<&SharedMemory> {
        self.memory.as_ref()
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Statistics of the most recent reply, if any.
    pub async fn last_run(&self) -> Option<RunStats> {
        *self.last_run.lock().await
    }

    /// Run compaction now. `None` when not configured or not triggered.
    pub async fn compact_memory(&self, cancel: &CancellationToken) -> Result<Option<CompactionOutcome>> {
        let (Some(config), Some(memory)) = (&self.compaction, &self.memory) else {
            return Ok(None);
        };

        let outcome = config.compact(memory, &self.model, cancel).await?;
        if let Some(outcome) = &outcome {
            self.publish(DomainEvent::MemoryCompacted {
                agent: self.name().to_string(),
                messages_compressed: outcome.messages_compressed,
                tokens_before: outcome.tokens_before,
                tokens_after: outcome.tokens_after,
                timestamp: Utc::now(),
            });
        }
        Ok(outcome)
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    // ── Prompt context ──

    fn system_message(&self, tools: &[ToolDefinition]) -> Option<Message> {
        let mut prompt = self.system_prompt.clone();
        if !tools.is_empty() {
            prompt.push_str(&tool_catalogue(tools));
        }
        let prompt = prompt.trim();
        (!prompt.is_empty()).then(|| Message::system(prompt))
    }

    /// System prompt, then memory, then the input (never twice).
    async fn build_context(&self, input: &Message, tools: &[ToolDefinition]) -> Vec<Message> {
        let mut messages: Vec<Message> = self.system_message(tools).into_iter().collect();
        if let Some(memory) = &self.memory {
            let memory = memory.lock().await;
            messages.extend(
                memory
                    .messages()
                    .iter()
                    .filter(|m| m.id != input.id)
                    .cloned(),
            );
        }
        messages.push(input.clone());
        messages
    }

    fn call_options(&self, tools: Vec<ToolDefinition>, tool_choice: Option<ToolChoice>) -> CallOptions {
        CallOptions {
            tool_choice,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: Vec::new(),
        }
    }

    fn response_message(&self, content: Vec<ContentBlock>, empty_text: &str) -> Message {
        let content = if content.is_empty() {
            vec![ContentBlock::text(empty_text)]
        } else {
            content
        };
        Message::with_blocks(self.name(), Role::Assistant, content)
    }

    // ── Model calls ──

    async fn call_model(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ModelResponse> {
        let call = async {
            if self.model.is_streaming() {
                self.consume_stream(messages, options).await
            } else {
                self.model.call(messages, options).await
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            response = call => Ok(response?),
        }
    }

    /// Collect a streamed response into one. Adjacent text deltas are merged.
    async fn consume_stream(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> std::result::Result<ModelResponse, ModelError> {
        let mut stream_rx = self.model.stream(messages, options).await?;
        let mut content: Vec<ContentBlock> = Vec::new();
        let mut usage = None;
        let mut terminated = false;

        while let Some(chunk_result) = stream_rx.recv().await {
            let chunk = chunk_result?;
            for block in chunk.content {
                match (content.last_mut(), block) {
                    (Some(ContentBlock::Text { text }), ContentBlock::Text { text: delta }) => {
                        text.push_str(&delta)
                    }
                    (
                        Some(ContentBlock::Thinking { thinking }),
                        ContentBlock::Thinking { thinking: delta },
                    ) => thinking.push_str(&delta),
                    (_, block) => content.push(block),
                }
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                terminated = true;
                break;
            }
        }

        if !terminated {
            warn!(model = self.model.name(), "Stream closed without a terminal chunk");
        }

        let mut response = ModelResponse::new(content);
        response.usage = usage;
        response.model = self.model.name().to_string();
        Ok(response)
    }

    // ── Loop ──

    async fn run_loop(&self, cancel: &CancellationToken, input: &Message) -> Result<Message> {
        let tools = self
            .toolkit
            .as_ref()
            .map(|t| t.schemas())
            .unwrap_or_default();
        let mut messages = self.build_context(input, &tools).await;
        let mut stats = RunStats::default();

        info!(
            agent = %self.name(),
            max_iter = self.max_iterations,
            tools = tools.len(),
            "ReAct loop starting"
        );

        let toolkit = match &self.toolkit {
            Some(toolkit) if !tools.is_empty() => toolkit,
            _ => {
                let options = self.call_options(Vec::new(), None);
                let response = self.call_model(cancel, &messages, &options).await?;
                stats.iterations = 1;
                self.finish(stats).await;
                return Ok(self.response_message(response.content, EMPTY_RESPONSE));
            }
        };

        let mut accumulated: Vec<ContentBlock> = Vec::new();

        for iteration in 1..=self.max_iterations {
            stats.iterations = iteration;

            let options = self.call_options(tools.clone(), Some(ToolChoice::Auto));
            let response = self.call_model(cancel, &messages, &options).await?;
            let tool_uses: Vec<ToolUse> = response
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse(tool_use) => Some(tool_use.clone()),
                    _ => None,
                })
                .collect();

            debug!(iteration, tool_requests = tool_uses.len(), "ReAct iteration");
            self.publish(DomainEvent::ModelCalled {
                agent: self.name().to_string(),
                iteration,
                tool_requests: tool_uses.len(),
                timestamp: Utc::now(),
            });

            // ── Final answer ──
            if tool_uses.is_empty() {
                self.finish(stats).await;
                return Ok(self.response_message(response.content, EMPTY_RESPONSE));
            }

            accumulated.extend(response.content);

            // ── Execute tool requests, in order ──
            for tool_use in tool_uses {
                stats.tool_calls += 1;
                messages.push(Message::with_blocks(
                    self.name(),
                    Role::Assistant,
                    vec![ContentBlock::ToolUse(tool_use.clone())],
                ));

                let start = std::time::Instant::now();
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    result = toolkit.call(&tool_use) => result,
                };
                let duration_ms = start.elapsed().as_millis() as u64;

                self.publish(DomainEvent::ToolExecuted {
                    agent: self.name().to_string(),
                    tool_name: tool_use.name.clone(),
                    success: result.is_ok(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                let observation = match result {
                    Ok(response) => ContentBlock::ToolResult(ToolResultBlock {
                        id: tool_use.id.clone(),
                        name: tool_use.name.clone(),
                        output: response.content,
                    }),
                    Err(e) => {
                        warn!(tool = %tool_use.name, error = %e, "Tool call failed, reporting to model");
                        ContentBlock::text(format!("Error: {e}"))
                    }
                };
                messages.push(Message::with_blocks(
                    tool_use.name.clone(),
                    Role::User,
                    vec![observation],
                ));
            }
        }

        // Max iterations exceeded, return partial result.
        warn!(agent = %self.name(), max_iter = self.max_iterations, "ReAct: max iterations reached");
        stats.budget_exhausted = true;
        self.finish(stats).await;
        Ok(self.response_message(accumulated, NO_RESPONSE))
    }

    async fn finish(&self, stats: RunStats) {
        *self.last_run.lock().await = Some(stats);
        self.publish(DomainEvent::ReplyCompleted {
            agent: self.name().to_string(),
            iterations: stats.iterations,
            tool_calls: stats.tool_calls,
            timestamp: Utc::now(),
        });
        info!(
            agent = %self.name(),
            iterations = stats.iterations,
            tool_calls = stats.tool_calls,
            budget_exhausted = stats.budget_exhausted,
            "ReAct loop completed"
        );
    }

    async fn remember(&self, message: &Message) -> Result<()> {
        if let Some(memory) = &self.memory {
            memory.lock().await.add(message.clone())?;
        }
        Ok(())
    }
}

#[async_trait]
impl Agent for ReactAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    async fn reply(&self, cancel: &CancellationToken, message: Message) -> Result<Message> {
        let (context, input) = self.base.run_pre_hooks(HookEvent::PreReply, message)?;

        self.compact_memory(cancel).await?;
        self.remember(&input).await?;

        let response = self.run_loop(cancel, &input).await?;

        self.remember(&response).await?;
        self.base.print(&response)?;
        let response = self
            .base
            .run_post_hooks(HookEvent::PostReply, &context, response)?;
        self.base.broadcast(cancel, &response).await?;
        Ok(response)
    }

    async fn observe(&self, cancel: &CancellationToken, message: Message) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let (context, message) = self.base.run_pre_hooks(HookEvent::PreObserve, message)?;
        self.remember(&message).await?;
        self.base
            .run_post_hooks(HookEvent::PostObserve, &context, message)?;
        Ok(())
    }
}

/// Render tool definitions as a markdown section for the system prompt.
fn tool_catalogue(tools: &[ToolDefinition]) -> String {
    let mut out = String::from("\n\n# Tools\n\nYou have access to the following tools:\n\n");
    for tool in tools {
        out.push_str(&format!("## {}\n{}\n", tool.name, tool.description));
        if let Some(properties) = tool.parameters.get("properties").and_then(|p| p.as_object()) {
            for (param, schema) in properties {
                let description = schema
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or("");
                let kind = schema.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                out.push_str(&format!("- {param}: {description} ({kind})\n"));
            }
        }
        out.push('\n');
    }
    out.push_str("To use a tool, respond with a tool_use block naming the tool and its input.");
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────
