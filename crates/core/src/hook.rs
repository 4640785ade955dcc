//! Lifecycle hooks.
//!
//! Each agent owns a [`HookRegistry`] with a name-keyed set of callbacks per
//! [`HookEvent`]. Pre-event hooks thread a key-value [`HookContext`] through
//! every callback; post-event hooks thread the evolving [`Message`].
//! Execution order across distinct hook names is unspecified.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use crate::error::HookError;
use crate::message::Message;

/// Key-value context passed through pre-event hooks.
pub type HookContext = serde_json::Map<String, serde_json::Value>;

type PreHookFn =
    dyn Fn(HookContext) -> std::result::Result<Option<HookContext>, HookError> + Send + Sync;
type PostHookFn =
    dyn Fn(&HookContext, Message) -> std::result::Result<Option<Message>, HookError> + Send + Sync;

/// Agent lifecycle points that hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    PreReply,
    PostReply,
    PrePrint,
    PostPrint,
    PreObserve,
    PostObserve,
}

impl HookEvent {
    pub const ALL: [HookEvent; 6] = [
        HookEvent::PreReply,
        HookEvent::PostReply,
        HookEvent::PrePrint,
        HookEvent::PostPrint,
        HookEvent::PreObserve,
        HookEvent::PostObserve,
    ];

    pub fn is_pre(self) -> bool {
        matches!(
            self,
            HookEvent::PreReply | HookEvent::PrePrint | HookEvent::PreObserve
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::PreReply => "pre_reply",
            HookEvent::PostReply => "post_reply",
            HookEvent::PrePrint => "pre_print",
            HookEvent::PostPrint => "post_print",
            HookEvent::PreObserve => "pre_observe",
            HookEvent::PostObserve => "post_observe",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered callback.
///
/// Returning `Ok(None)` leaves the threaded value untouched.
#[derive(Clone)]
pub enum Hook {
    Pre(Arc<PreHookFn>),
    Post(Arc<PostHookFn>),
}

impl Hook {
    pub fn pre<F>(f: F) -> Self
    where
        F: Fn(HookContext) -> std::result::Result<Option<HookContext>, HookError>
            + Send
            + Sync
            + 'static,
    {
        Hook::Pre(Arc::new(f))
    }

    pub fn post<F>(f: F) -> Self
    where
        F: Fn(&HookContext, Message) -> std::result::Result<Option<Message>, HookError>
            + Send
            + Sync
            + 'static,
    {
        Hook::Post(Arc::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            Hook::Pre(_) => "pre",
            Hook::Post(_) => "post",
        }
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hook::{}", self.kind())
    }
}

/// Per-event, name-keyed hook storage guarded by a reader-writer lock.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookEvent, HashMap<String, Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under `name`, replacing any hook already there.
    ///
    /// A pre hook can only attach to a pre event and a post hook to a post event.
    pub fn register(
        &self,
        event: HookEvent,
        name: impl Into<String>,
        hook: Hook,
    ) -> std::result::Result<(), HookError> {
        let name = name.into();
        if event.is_pre() != matches!(hook, Hook::Pre(_)) {
            return Err(HookError::KindMismatch {
                event: event.to_string(),
                name,
                actual: hook.kind(),
            });
        }

        let mut hooks = self
            .hooks
            .write()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        hooks.entry(event).or_default().insert(name, hook);
        Ok(())
    }

    /// Remove a hook. Returns whether it existed.
    pub fn remove(&self, event: HookEvent, name: &str) -> std::result::Result<bool, HookError> {
        let mut hooks = self
            .hooks
            .write()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        Ok(hooks
            .get_mut(&event)
            .is_some_and(|named| named.remove(name).is_some()))
    }

    /// Clear the hooks of one event, or of every event when `event` is `None`.
    pub fn clear(&self, event: Option<HookEvent>) -> std::result::Result<(), HookError> {
        let mut hooks = self
            .hooks
            .write()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        match event {
            Some(event) => {
                hooks.remove(&event);
            }
            None => hooks.clear(),
        }
        Ok(())
    }

    /// Names registered for an event, sorted.
    pub fn names(&self, event: HookEvent) -> std::result::Result<Vec<String>, HookError> {
        let hooks = self
            .hooks
            .read()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        let mut names: Vec<String> = hooks
            .get(&event)
            .map(|named| named.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    fn snapshot(&self, event: HookEvent) -> std::result::Result<Vec<Hook>, HookError> {
        let hooks = self
            .hooks
            .read()
            .map_err(|e| HookError::Poisoned(e.to_string()))?;
        Ok(hooks
            .get(&event)
            .map(|named| named.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Thread `context` through every pre hook of `event`.
    pub fn run_pre(
        &self,
        event: HookEvent,
        mut context: HookContext,
    ) -> std::result::Result<HookContext, HookError> {
        for hook in self.snapshot(event)? {
            if let Hook::Pre(f) = hook
                && let Some(updated) = f(context.clone())?
            {
                context = updated;
            }
        }
        Ok(context)
    }

    /// Thread `message` through every post hook of `event`.
    pub fn run_post(
        &self,
        event: HookEvent,
        context: &HookContext,
        mut message: Message,
    ) -> std::result::Result<Message, HookError> {
        for hook in self.snapshot(event)? {
            if let Hook::Post(f) = hook
                && let Some(updated) = f(context, message.clone())?
            {
                message = updated;
            }
        }
        Ok(message)
    }
}
