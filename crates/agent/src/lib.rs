//! Agent runtime for overseer.
//!
//! A [`ReactAgent`] answers a message by looping over its model and toolkit:
//!
//! 1. **Compact** memory if it has grown past the token threshold
//! 2. **Build context** (system prompt + tool catalogue + memory + input)
//! 3. **Call the model**
//! 4. **If tool requests**: execute them in order, append results, loop back to step 3
//! 5. **If text only**: store, print and broadcast the response
//!
//! The loop stops when the model answers without tool requests or the
//! iteration limit is reached. A [`SupervisorAgent`] drives two such agents
//! as planner and executor.

pub mod context;
pub mod patterns;

pub use context::{
    CharTokenCounter, CompactionConfig, CompactionOutcome, SummaryRecord, TokenCounter,
    estimate_tokens,
};
pub use patterns::{
    Conclusion, Decision, DecisionAction, FanOutPipeline, ForLoopPipeline, MessageHub,
    MessagePredicate, ReactAgent, RunStats, SequentialPipeline, SupervisedOutcome,
    SupervisorAgent, SupervisorConfig, WhileLoopPipeline,
};
