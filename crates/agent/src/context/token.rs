//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token by default.
//! Counts only need to be good enough to decide when history should be
//! compacted, so no real tokenizer is involved.

use overseer_core::message::{ContentBlock, Message};

/// Per-message overhead for role name, delimiters and formatting markers.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Estimates how many tokens text and messages occupy.
pub trait TokenCounter: Send + Sync {
    /// Tokens for a piece of text.
    fn count_text(&self, text: &str) -> usize;

    /// Tokens for a message: name, every block, and metadata, plus overhead.
    fn count_message(&self, message: &Message) -> usize {
        let mut total = MESSAGE_OVERHEAD + self.count_text(&message.name);
        for block in &message.content {
            total += self.count_block(block);
        }
        for (key, value) in &message.metadata {
            total += self.count_text(key) + self.count_text(&value_text(value));
        }
        total
    }

    fn count_block(&self, block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text { text } => self.count_text(text),
            ContentBlock::Thinking { thinking } => self.count_text(thinking),
            ContentBlock::ToolUse(tool_use) => {
                let input = serde_json::Value::Object(tool_use.input.clone()).to_string();
                self.count_text(&tool_use.name) + self.count_text(&input)
            }
            ContentBlock::ToolResult(result) => {
                self.count_text(&result.name)
                    + result
                        .output
                        .iter()
                        .map(|b| self.count_block(b))
                        .sum::<usize>()
            }
        }
    }

    /// Tokens for a slice of messages.
    fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Counts tokens as `ceil(chars / chars_per_token)`.
#[derive(Debug, Clone, Copy)]
pub struct CharTokenCounter {
    chars_per_token: f64,
}

impl CharTokenCounter {
    /// Non-positive ratios fall back to 4.
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token > 0.0 { chars_per_token } else { 4.0 };
        Self { chars_per_token }
    }
}

impl Default for CharTokenCounter {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl TokenCounter for CharTokenCounter {
    fn count_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() as f64 / self.chars_per_token).ceil() as usize
    }
}

/// Estimate the token count for a string with the default ratio.
pub fn estimate_tokens(text: &str) -> usize {
    CharTokenCounter::default().count_text(text)
}
