//! # overseer core
//!
//! Domain types, traits, and error definitions for the overseer agent
//! runtime. Every crate in the workspace depends inward on this one.
//!
//! ## Design Philosophy
//!
//! Every external capability is defined as a trait here. Implementations
//! live elsewhere and are passed in through constructors:
//! - [`Model`] submits a conversation and returns content blocks
//! - [`Toolkit`] advertises tool schemas and executes invocations
//! - [`Memory`] stores the ordered message history
//! - [`Agent`] is what callers and other agents talk to

pub mod error;
pub mod message;
pub mod model;
pub mod tool;
pub mod memory;
pub mod hook;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ContentBlock, Message, Role, ToolResultBlock, ToolUse};
pub use model::{CallOptions, Model, ModelResponse, StreamChunk, ToolChoice, ToolDefinition, Usage};
pub use tool::{Tool, ToolRegistry, ToolResponse, Toolkit};
pub use memory::{Memory, SharedMemory};
pub use hook::{Hook, HookContext, HookEvent, HookRegistry};
pub use agent::{Agent, AgentBase};
pub use event::{DomainEvent, EventBus};
pub use tokio_util::sync::CancellationToken;
