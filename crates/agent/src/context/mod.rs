//! Context-window management.
//!
//! - [`token`]: character-based token estimation behind a [`TokenCounter`] trait
//! - [`compaction`]: threshold-triggered summarization that rewrites memory in place

pub mod compaction;
pub mod token;

pub use compaction::{CompactionConfig, CompactionOutcome, SummaryRecord};
pub use token::{CharTokenCounter, TokenCounter, estimate_tokens};
