//! Agent patterns: structured reasoning strategies.
//!
//! 1. **ReAct**: Thought → Action → Observation loop over a toolkit
//! 2. **Supervisor**: a planner reviewing an executor's conclusions
//! 3. **Message hub**: agents observing each other's replies
//! 4. **Pipelines**: sequential, fan-out and looped agent composition

pub mod conclusion;
pub mod decision;
pub mod hub;
pub mod pipeline;
pub mod react;
pub mod supervisor;

pub use conclusion::Conclusion;
pub use decision::{Decision, DecisionAction};
pub use hub::MessageHub;
pub use pipeline::{
    FanOutPipeline, ForLoopPipeline, MessagePredicate, SequentialPipeline, WhileLoopPipeline,
};
pub use react::{ReactAgent, RunStats};
pub use supervisor::{SupervisedOutcome, SupervisorAgent, SupervisorConfig};

#[cfg(test)]
pub(crate) mod test_helpers;
