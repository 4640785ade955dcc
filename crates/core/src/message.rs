//! Message and content block domain types.
//!
//! A message is a role-tagged, ordered list of typed content blocks. These
//! are the value objects that flow through the whole runtime:
//! caller → agent → model → toolkit → memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user, or an observation fed back to the model
    User,
    /// The model
    Assistant,
    /// Instructions and synthetic summaries
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(s)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Call ID assigned by the model
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments, keyed by parameter name
    #[serde(default)]
    pub input: serde_json::Map<String, serde_json::Value>,
}

/// The output of a tool, fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    /// The call ID this result answers
    pub id: String,

    /// Name of the tool that produced it
    pub name: String,

    /// Content produced by the tool
    #[serde(default)]
    pub output: Vec<ContentBlock>,
}

/// One typed piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse(ToolUse),
    ToolResult(ToolResultBlock),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        ContentBlock::Thinking {
            thinking: thinking.into(),
        }
    }

    /// The text of a `Text` block, `None` otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single message.
///
/// Once a message has been stored in memory the runtime never mutates its
/// content; history is only appended to or replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Display name of the sender (agent name, tool name, "user", ...)
    #[serde(default)]
    pub name: String,

    /// Who sent this message
    pub role: Role,

    /// Ordered content blocks
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message from content blocks.
    pub fn with_blocks(name: impl Into<String>, role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            role,
            content,
            metadata: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_blocks("user", Role::User, vec![ContentBlock::text(text)])
    }

    /// Create a new assistant message with a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_blocks("assistant", Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Create a new system message with a single text block.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_blocks("system", Role::System, vec![ContentBlock::text(text)])
    }

    /// Set the sender name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// All text blocks joined with newlines.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocation requests, in the order the model emitted them.
    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse(tool_use) => Some(tool_use),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_uses(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse(_)))
    }
}
