//! Bounded in-process history: the default agent memory.

use overseer_core::error::MemoryError;
use overseer_core::memory::Memory;
use overseer_core::message::Message;
use tracing::debug;

/// Capacity used when a history is created with a capacity of zero.
pub const DEFAULT_CAPACITY: usize = 1000;

/// An ordered message history holding at most `capacity` messages.
///
/// When an append pushes it over capacity, the oldest messages are dropped.
#[derive(Debug, Clone)]
pub struct History {
    messages: Vec<Message>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            messages: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Memory for History {
    fn add(&mut self, message: Message) -> Result<(), MemoryError> {
        self.messages.push(message);
        if self.messages.len() > self.capacity {
            let excess = self.messages.len() - self.capacity;
            self.messages.drain(..excess);
            debug!(dropped = excess, capacity = self.capacity, "History trimmed");
        }
        Ok(())
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn clear(&mut self) {
        self.messages.clear();
    }
}
