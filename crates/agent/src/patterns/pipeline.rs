//! Pipelines: fixed ways of composing agents.
//!
//! Each pipeline returns every reply it collected, in order. An agent error
//! aborts the pipeline and is returned as is.

use futures::future::join_all;
use overseer_core::agent::Agent;
use overseer_core::error::{Error, Result};
use overseer_core::message::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Predicate over a message, used by the loop pipelines.
pub type MessagePredicate = Box<dyn Fn(&Message) -> bool + Send + Sync>;

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Runs agents one after another, each replying to the previous reply.
pub struct SequentialPipeline {
    name: String,
    agents: Vec<Arc<dyn Agent>>,
}

impl SequentialPipeline {
    pub fn new(name: impl Into<String>, agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            agents,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    pub async fn run(&self, cancel: &CancellationToken, input: Message) -> Result<Vec<Message>> {
        let mut replies = Vec::with_capacity(self.agents.len());
        let mut current = input;

        for agent in &self.agents {
            check_cancelled(cancel)?;
            let reply = agent.reply(cancel, current).await.inspect_err(|e| {
                warn!(pipeline = %self.name, agent = %agent.name(), error = %e, "Pipeline stage failed");
            })?;
            replies.push(reply.clone());
            current = reply;
        }

        debug!(pipeline = %self.name, replies = replies.len(), "Sequential pipeline finished");
        Ok(replies)
    }
}

/// Gives the same input to every agent concurrently.
pub struct FanOutPipeline {
    name: String,
    agents: Vec<Arc<dyn Agent>>,
}

impl FanOutPipeline {
    pub fn new(name: impl Into<String>, agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            agents,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    /// Replies come back in agent order. If several agents fail, the error
    /// of the first one in that order is returned.
    pub async fn run(&self, cancel: &CancellationToken, input: Message) -> Result<Vec<Message>> {
        check_cancelled(cancel)?;

        let calls = self
            .agents
            .iter()
            .map(|agent| agent.reply(cancel, input.clone()));
        let results = join_all(calls).await;

        let mut replies = Vec::with_capacity(results.len());
        for (agent, result) in self.agents.iter().zip(results) {
            match result {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    warn!(pipeline = %self.name, agent = %agent.name(), error = %e, "Fan-out branch failed");
                    return Err(e);
                }
            }
        }

        debug!(pipeline = %self.name, replies = replies.len(), "Fan-out pipeline finished");
        Ok(replies)
    }
}

/// Feeds one agent its own replies, up to `max_loops` times.
///
/// With a break condition, the loop also stops right after a reply that
/// satisfies it. That reply is still returned.
pub struct ForLoopPipeline {
    name: String,
    agent: Arc<dyn Agent>,
    max_loops: usize,
    break_when: Option<MessagePredicate>,
}

impl ForLoopPipeline {
    pub fn new(name: impl Into<String>, agent: Arc<dyn Agent>, max_loops: usize) -> Self {
        Self {
            name: name.into(),
            agent,
            max_loops,
            break_when: None,
        }
    }

    pub fn with_break_condition(
        mut self,
        condition: impl Fn(&Message) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.break_when = Some(Box::new(condition));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_loops(&self) -> usize {
        self.max_loops
    }

    pub async fn run(&self, cancel: &CancellationToken, input: Message) -> Result<Vec<Message>> {
        let mut replies = Vec::new();
        let mut current = input;

        for round in 0..self.max_loops {
            check_cancelled(cancel)?;
            let reply = self.agent.reply(cancel, current).await.inspect_err(|e| {
                warn!(pipeline = %self.name, round, error = %e, "Loop round failed");
            })?;
            replies.push(reply.clone());

            if self.break_when.as_ref().is_some_and(|stop| stop(&reply)) {
                debug!(pipeline = %self.name, round, "Break condition met");
                break;
            }
            current = reply;
        }

        Ok(replies)
    }
}

/// Feeds one agent its own replies while a condition holds on the latest
/// message, never more than `max_loops` times.
///
/// The condition is checked before each round, starting with the input, so
/// a false condition on the input runs the agent zero times.
pub struct WhileLoopPipeline {
    name: String,
    agent: Arc<dyn Agent>,
    max_loops: usize,
    condition: Option<MessagePredicate>,
}

impl WhileLoopPipeline {
    pub fn new(name: impl Into<String>, agent: Arc<dyn Agent>, max_loops: usize) -> Self {
        Self {
            name: name.into(),
            agent,
            max_loops,
            condition: None,
        }
    }

    pub fn with_condition(
        mut self,
        condition: impl Fn(&Message) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_loops(&self) -> usize {
        self.max_loops
    }

    pub async fn run(&self, cancel: &CancellationToken, input: Message) -> Result<Vec<Message>> {
        let mut replies = Vec::new();
        let mut current = input;

        for round in 0..self.max_loops {
            if self.condition.as_ref().is_some_and(|holds| !holds(&current)) {
                debug!(pipeline = %self.name, round, "Loop condition no longer holds");
                break;
            }
            check_cancelled(cancel)?;
            let reply = self.agent.reply(cancel, current).await.inspect_err(|e| {
                warn!(pipeline = %self.name, round, error = %e, "Loop round failed");
            })?;
            replies.push(reply.clone());
            current = reply;
        }

        Ok(replies)
    }
}
