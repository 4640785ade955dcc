//! Agent trait and the shared state every agent carries.
//!
//! [`AgentBase`] bundles identity, the hook registry, per-topic subscriber
//! lists and the console switch. Concrete agents embed one and expose it
//! through [`Agent::base`], which gives them hook registration for free.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;
use crate::error::{HookError, Result};
use crate::hook::{Hook, HookContext, HookEvent, HookRegistry};
use crate::message::Message;

/// Key under which pre-event hooks find the message being processed.
pub const MESSAGE_KEY: &str = "message";

/// Anything that can reply to and observe messages.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identity, hooks and subscribers.
    fn base(&self) -> &AgentBase;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Produce a response to `message`.
    async fn reply(&self, cancel: &CancellationToken, message: Message) -> Result<Message>;

    /// Take note of a message without answering it.
    async fn observe(&self, cancel: &CancellationToken, message: Message) -> Result<()>;

    fn register_hook(&self, event: HookEvent, name: &str, hook: Hook) -> Result<()> {
        Ok(self.base().hooks().register(event, name, hook)?)
    }

    fn remove_hook(&self, event: HookEvent, name: &str) -> Result<bool> {
        Ok(self.base().hooks().remove(event, name)?)
    }
}

pub struct AgentBase {
    id: String,
    name: String,
    hooks: HookRegistry,
    subscribers: RwLock<BTreeMap<String, Vec<Arc<dyn Agent>>>>,
    console_output: AtomicBool,
}

impl AgentBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            hooks: HookRegistry::new(),
            subscribers: RwLock::new(BTreeMap::new()),
            console_output: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn set_console_output(&self, enabled: bool) {
        self.console_output.store(enabled, Ordering::Relaxed);
    }

    pub fn console_output(&self) -> bool {
        self.console_output.load(Ordering::Relaxed)
    }

    // ── Pub/sub ──

    /// Replace the subscribers of `topic`. This agent is never its own subscriber.
    pub fn reset_subscribers(
        &self,
        topic: impl Into<String>,
        agents: Vec<Arc<dyn Agent>>,
    ) -> std::result::Result<(), HookError> {
        let filtered: Vec<_> = agents.into_iter().filter(|a| a.id() != self.id).collect();
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        subscribers.insert(topic.into(), filtered);
        Ok(())
    }

    pub fn remove_subscribers(&self, topic: &str) -> std::result::Result<(), HookError> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        subscribers.remove(topic);
        Ok(())
    }

    /// Subscribers currently registered under `topic`.
    pub fn subscribers(&self, topic: &str) -> std::result::Result<Vec<Arc<dyn Agent>>, HookError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        Ok(subscribers.get(topic).cloned().unwrap_or_default())
    }

    /// Deliver `message` to every subscriber of every topic.
    pub async fn broadcast(&self, cancel: &CancellationToken, message: &Message) -> Result<()> {
        let targets: Vec<Arc<dyn Agent>> = {
            let subscribers = self
                .subscribers
                .read()
                .map_err(|e| HookError::Poisoned(e.to_string()))?;
            subscribers.values().flatten().cloned().collect()
        };

        for agent in targets {
            agent.observe(cancel, message.clone()).await?;
        }
        Ok(())
    }

    // ── Hooks ──

    /// Run the pre hooks of `event` over `message`.
    ///
    /// Hooks see the message under [`MESSAGE_KEY`] and may replace it there.
    pub fn run_pre_hooks(
        &self,
        event: HookEvent,
        message: Message,
    ) -> Result<(HookContext, Message)> {
        let mut context = HookContext::new();
        context.insert(MESSAGE_KEY.into(), serde_json::to_value(&message)?);
        let context = self.hooks.run_pre(event, context)?;

        let message = match context.get(MESSAGE_KEY) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => message,
        };
        Ok((context, message))
    }

    pub fn run_post_hooks(
        &self,
        event: HookEvent,
        context: &HookContext,
        message: Message,
    ) -> Result<Message> {
        Ok(self.hooks.run_post(event, context, message)?)
    }

    /// Emit `message` to the log between the print hooks.
    ///
    /// Skipped entirely when console output is disabled.
    pub fn print(&self, message: &Message) -> Result<()> {
        if !self.console_output() {
            return Ok(());
        }
        let (context, message) = self.run_pre_hooks(HookEvent::PrePrint, message.clone())?;
        info!(agent = %self.name, "[{}] {}: {}", message.role, message.name, message.text_content());
        self.run_post_hooks(HookEvent::PostPrint, &context, message)?;
        Ok(())
    }
}
