//! Memory trait: the ordered message history an agent works from.
//!
//! Implementations are not internally synchronized. An agent shares its
//! memory through [`SharedMemory`], which puts the exclusion outside the
//! trait, so only one writer touches a history at a time.

use std::sync::Arc;
use tokio::sync::Mutex;
use crate::error::MemoryError;
use crate::message::Message;

/// An ordered, append-mostly message history.
pub trait Memory: Send + Sync {
    /// Append a message. Bounded implementations trim from the front.
    fn add(&mut self, message: Message) -> std::result::Result<(), MemoryError>;

    /// Read-only view of the stored messages, oldest first.
    fn messages(&self) -> &[Message];

    /// Drop every stored message.
    fn clear(&mut self);

    fn len(&self) -> usize {
        self.messages().len()
    }

    fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

/// A memory handle shared between an agent and its caller.
pub type SharedMemory = Arc<Mutex<dyn Memory>>;

/// Wrap a concrete memory into a [`SharedMemory`].
pub fn shared<M: Memory + 'static>(memory: M) -> SharedMemory {
    Arc::new(Mutex::new(memory))
}
