//! Token-triggered history compaction.
//!
//! When the estimated token total of an agent's memory crosses a threshold,
//! everything except the most recent `keep_recent` messages is summarized by
//! a model into a [`SummaryRecord`]. Memory is then rewritten as one
//! system-role summary message followed by the untouched recent messages.
//!
//! A failing summarization model never fails compaction: a fixed fallback
//! summary is used instead.

use overseer_config::CompactionSettings;
use overseer_core::error::{Error, Result};
use overseer_core::memory::{Memory, SharedMemory};
use overseer_core::message::{ContentBlock, Message};
use overseer_core::model::{CallOptions, Model, ToolChoice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::token::{CharTokenCounter, TokenCounter};

const SUMMARY_PROMPT_HEAD: &str = "You have been working on a task but have not yet completed it. \
Now write a continuation summary that will allow you to resume the work efficiently \
in a fresh context window.\n\nPrevious conversation:\n";

const SUMMARY_PROMPT_TAIL: &str = "\n\nGenerate a structured summary with the following fields:\n\
- task_overview: The user's core request and the success criteria\n\
- current_state: What has been completed so far, which files were touched, which artifacts exist\n\
- important_discoveries: Constraints, decisions, errors hit and how they were resolved\n\
- next_steps: The concrete actions still required to finish the task\n\
- context_to_preserve: User preferences, domain details and promises made to the user\n\n\
Be concise and actionable.";

/// When and how memory gets compacted.
#[derive(Clone)]
pub struct CompactionConfig {
    pub enabled: bool,
    pub counter: Arc<dyn TokenCounter>,
    /// Token total at which compaction triggers
    pub trigger_threshold: usize,
    /// Most recent messages kept verbatim
    pub keep_recent: usize,
    /// Summarization model; the agent's own model when `None`
    pub model: Option<Arc<dyn Model>>,
}

impl CompactionConfig {
    /// An enabled config using the default character counter.
    pub fn new(trigger_threshold: usize, keep_recent: usize) -> Self {
        Self {
            enabled: true,
            counter: Arc::new(CharTokenCounter::default()),
            trigger_threshold,
            keep_recent,
            model: None,
        }
    }

    pub fn from_settings(settings: &CompactionSettings) -> Self {
        Self {
            enabled: settings.enabled,
            counter: Arc::new(CharTokenCounter::new(settings.chars_per_token)),
            trigger_threshold: settings.trigger_threshold,
            keep_recent: settings.keep_recent,
            model: None,
        }
    }

    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Summarize with a dedicated (usually cheaper) model.
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Whether `messages` are over the trigger threshold.
    pub fn should_compact(&self, messages: &[Message]) -> bool {
        self.enabled && self.counter.count_messages(messages) >= self.trigger_threshold
    }

    /// Compact `memory` if the trigger predicate holds.
    ///
    /// Returns `None` when nothing was done.
    pub async fn compact(
        &self,
        memory: &SharedMemory,
        agent_model: &Arc<dyn Model>,
        cancel: &CancellationToken,
    ) -> Result<Option<CompactionOutcome>> {
        let messages: Vec<Message> = memory.lock().await.messages().to_vec();
        let tokens_before = self.counter.count_messages(&messages);

        if !self.enabled || tokens_before < self.trigger_threshold {
            return Ok(None);
        }
        if messages.len() <= self.keep_recent {
            debug!(
                messages = messages.len(),
                keep_recent = self.keep_recent,
                "Compaction triggered but nothing old enough to compress"
            );
            return Ok(None);
        }

        let split = messages.len() - self.keep_recent;
        let (to_compress, recent) = messages.split_at(split);
        let summary = self.summarize(to_compress, agent_model, cancel).await?;

        {
            let mut memory = memory.lock().await;
            memory.clear();
            memory.add(summary.to_message())?;
            for message in recent {
                memory.add(message.clone())?;
            }
        }

        let tokens_after = self.counter.count_messages(memory.lock().await.messages());
        info!(
            compressed = to_compress.len(),
            kept = recent.len(),
            tokens_before,
            tokens_after,
            "Memory compacted"
        );

        Ok(Some(CompactionOutcome {
            messages_compressed: to_compress.len(),
            tokens_before,
            tokens_after,
            summary,
        }))
    }

    async fn summarize(
        &self,
        to_compress: &[Message],
        agent_model: &Arc<dyn Model>,
        cancel: &CancellationToken,
    ) -> Result<SummaryRecord> {
        let model = self.model.as_ref().unwrap_or(agent_model);
        let prompt = format!(
            "{SUMMARY_PROMPT_HEAD}{}{SUMMARY_PROMPT_TAIL}",
            render_transcript(to_compress)
        );
        let options = CallOptions {
            tool_choice: Some(ToolChoice::None),
            ..CallOptions::default()
        };

        let messages = [Message::user(prompt)];
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = model.call(&messages, &options) => result,
        };

        Ok(match result {
            Ok(response) => {
                let text = response
                    .content
                    .iter()
                    .filter_map(ContentBlock::as_text)
                    .collect::<Vec<_>>()
                    .join("\n");
                SummaryRecord::parse(&text, to_compress.len())
            }
            Err(e) => {
                warn!(model = model.name(), error = %e, "Summarization failed, using fallback summary");
                SummaryRecord::fallback(to_compress.len())
            }
        })
    }
}

impl std::fmt::Debug for CompactionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactionConfig")
            .field("enabled", &self.enabled)
            .field("trigger_threshold", &self.trigger_threshold)
            .field("keep_recent", &self.keep_recent)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

/// What one compaction did.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub messages_compressed: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub summary: SummaryRecord,
}

/// The five-part continuation summary produced by compaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub task_overview: String,
    pub current_state: String,
    pub important_discoveries: String,
    pub next_steps: String,
    pub context_to_preserve: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    TaskOverview,
    CurrentState,
    Discoveries,
    NextSteps,
    Context,
}

const HEADERS: [(Field, &[&str]); 5] = [
    (Field::TaskOverview, &["task_overview", "task overview"]),
    (Field::CurrentState, &["current_state", "current state"]),
    (
        Field::Discoveries,
        &["important_discoveries", "important discoveries", "discoveries"],
    ),
    (Field::NextSteps, &["next_steps", "next steps"]),
    (Field::Context, &["context_to_preserve", "context to preserve"]),
];

impl SummaryRecord {
    /// Used when the summarization model cannot be reached.
    pub fn fallback(compressed: usize) -> Self {
        Self {
            task_overview: "Previous task continuation".into(),
            current_state: format!("Compressed {compressed} messages"),
            important_discoveries: "See previous conversation for details".into(),
            next_steps: "Continue with the original task".into(),
            context_to_preserve: String::new(),
        }
    }

    /// Parse a model reply by section-header keywords.
    ///
    /// Fields the reply never mentions keep a placeholder.
    pub fn parse(text: &str, compressed: usize) -> Self {
        let mut sections: [Vec<String>; 5] = Default::default();
        let mut current: Option<Field> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((field, rest)) = detect_header(line) {
                current = Some(field);
                if !rest.is_empty() {
                    sections[field as usize].push(rest.to_string());
                }
            } else if let Some(field) = current {
                sections[field as usize].push(line.to_string());
            }
        }

        let take = |field: Field, default: String| {
            let joined = sections[field as usize].join(" ");
            if joined.is_empty() { default } else { joined }
        };

        Self {
            task_overview: take(Field::TaskOverview, "Continuing previous task".into()),
            current_state: take(Field::CurrentState, format!("Compressed {compressed} messages")),
            important_discoveries: take(Field::Discoveries, "N/A".into()),
            next_steps: take(Field::NextSteps, "Continue task execution".into()),
            context_to_preserve: take(Field::Context, String::new()),
        }
    }

    /// Wrap this summary as the system message that heads compacted memory.
    pub fn to_message(&self) -> Message {
        let text = format!(
            "<system-info>Here is a summary of your previous work\n\
             # Task Overview\n{}\n\n\
             # Current State\n{}\n\n\
             # Important Discoveries\n{}\n\n\
             # Next Steps\n{}\n\n\
             # Context to Preserve\n{}\n\
             </system-info>",
            self.task_overview,
            self.current_state,
            self.important_discoveries,
            self.next_steps,
            self.context_to_preserve,
        );
        Message::system(text).with_metadata("compacted", serde_json::Value::Bool(true))
    }
}

fn detect_header(line: &str) -> Option<(Field, &str)> {
    let stripped = line.trim_start_matches(|c: char| {
        matches!(c, '#' | '*' | '-' | ' ' | '.') || c.is_ascii_digit()
    });
    let lower = stripped.to_lowercase();

    let field = HEADERS.iter().find_map(|(field, keys)| {
        keys.iter().any(|k| lower.starts_with(k)).then_some(*field)
    })?;

    let rest = stripped
        .split_once(':')
        .map(|(_, rest)| rest.trim().trim_start_matches('*').trim())
        .unwrap_or("");
    Some((field, rest))
}

fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let mut line = format!("[{}] {}: {}", m.timestamp.to_rfc3339(), m.role, m.text_content());
            for block in &m.content {
                match block {
                    ContentBlock::ToolUse(tool_use) => line.push_str(&format!(
                        " <tool_use {} {}>",
                        tool_use.name,
                        serde_json::Value::Object(tool_use.input.clone())
                    )),
                    ContentBlock::ToolResult(result) => {
                        let output: Vec<&str> =
                            result.output.iter().filter_map(ContentBlock::as_text).collect();
                        line.push_str(&format!(" <tool_result {}: {}>", result.name, output.join(" ")));
                    }
                    _ => {}
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ─────────────────────────────────────────────────────────────────
