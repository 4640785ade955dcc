//! Message hub: a named group of agents that hear each other.
//!
//! Every participant subscribes to every other participant under the hub's
//! name, so each reply one of them produces is observed by the rest.
//! Subscriptions hold strong references. They are released by
//! [`MessageHub::close`] or when the hub is dropped.

use overseer_core::agent::Agent;
use overseer_core::error::Result;
use overseer_core::message::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct MessageHub {
    name: String,
    participants: Vec<Arc<dyn Agent>>,
}

impl MessageHub {
    pub fn new(name: impl Into<String>, agents: Vec<Arc<dyn Agent>>) -> Result<Self> {
        let mut hub = Self {
            name: name.into(),
            participants: Vec::new(),
        };
        for agent in agents {
            if !hub.contains(agent.id()) {
                hub.participants.push(agent);
            }
        }
        hub.wire()?;
        Ok(hub)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn participants(&self) -> &[Arc<dyn Agent>] {
        &self.participants
    }

    fn contains(&self, id: &str) -> bool {
        self.participants.iter().any(|a| a.id() == id)
    }

    /// Add a participant. Adding an existing member is a no-op.
    pub fn add(&mut self, agent: Arc<dyn Agent>) -> Result<()> {
        if self.contains(agent.id()) {
            return Ok(());
        }
        self.participants.push(agent);
        self.wire()
    }

    /// Remove the participant with `id`. Returns whether it was a member.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.participants.iter().position(|a| a.id() == id) else {
            return Ok(false);
        };
        let removed = self.participants.remove(index);
        removed.base().remove_subscribers(&self.name)?;
        self.wire()?;
        Ok(true)
    }

    /// Deliver `message` to every participant.
    pub async fn broadcast(&self, cancel: &CancellationToken, message: &Message) -> Result<()> {
        for agent in &self.participants {
            agent.observe(cancel, message.clone()).await?;
        }
        Ok(())
    }

    /// Unsubscribe everyone and empty the hub.
    pub fn close(&mut self) -> Result<()> {
        for agent in self.participants.drain(..) {
            agent.base().remove_subscribers(&self.name)?;
        }
        debug!(hub = %self.name, "Message hub closed");
        Ok(())
    }

    fn wire(&self) -> Result<()> {
        for agent in &self.participants {
            agent
                .base()
                .reset_subscribers(self.name.clone(), self.participants.clone())?;
        }
        debug!(hub = %self.name, participants = self.participants.len(), "Message hub wired");
        Ok(())
    }
}

impl Drop for MessageHub {
    fn drop(&mut self) {
        if !self.participants.is_empty()
            && let Err(e) = self.close()
        {
            warn!(hub = %self.name, error = %e, "Failed to unsubscribe message hub on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::react::ReactAgent;
    use crate::patterns::test_helpers::*;
    use overseer_core::memory::{SharedMemory, shared};
    use overseer_memory::History;

    fn member(name: &str, reply: &str) -> (Arc<ReactAgent>, SharedMemory) {
        let memory = shared(History::new(20));
        let agent = ReactAgent::new(
            name,
            "",
            Arc::new(SequentialMockModel::always(make_text_response(reply))),
        )
        .with_memory(memory.clone())
        .with_console_output(false);
        (Arc::new(agent), memory)
    }

    fn dynamic(agent: &Arc<ReactAgent>) -> Arc<dyn Agent> {
        agent.clone()
    }

    async fn texts(memory: &SharedMemory) -> Vec<String> {
        memory
            .lock()
            .await
            .messages()
            .iter()
            .map(|m| m.text_content())
            .collect()
    }

    #[tokio::test]
    async fn replies_reach_every_other_member() {
        let (alice, alice_mem) = member("alice", "from alice");
        let (bob, bob_mem) = member("bob", "from bob");
        let (carol, carol_mem) = member("carol", "from carol");
        let _hub =
            MessageHub::new("room", vec![dynamic(&alice), dynamic(&bob), dynamic(&carol)]).unwrap();

        alice
            .reply(&CancellationToken::new(), Message::user("hi all"))
            .await
            .unwrap();

        // Alice holds her own exchange once; the others only observed her reply.
        assert_eq!(texts(&alice_mem).await, vec!["hi all", "from alice"]);
        assert_eq!(texts(&bob_mem).await, vec!["from alice"]);
        assert_eq!(texts(&carol_mem).await, vec!["from alice"]);
    }

    #[tokio::test]
    async fn removed_member_stops_hearing_and_speaking() {
        let (alice, _) = member("alice", "from alice");
        let (bob, bob_mem) = member("bob", "from bob");
        let (carol, carol_mem) = member("carol", "from carol");
        let mut hub = MessageHub::new("room", vec![dynamic(&alice), dynamic(&bob)]).unwrap();
        hub.add(carol.clone()).unwrap();
        hub.add(carol.clone()).unwrap();
        assert_eq!(hub.participants().len(), 3);

        assert!(hub.remove(bob.id()).unwrap());
        assert!(!hub.remove(bob.id()).unwrap());

        let cancel = CancellationToken::new();
        alice.reply(&cancel, Message::user("q")).await.unwrap();
        bob.reply(&cancel, Message::user("q")).await.unwrap();

        assert_eq!(texts(&carol_mem).await, vec!["from alice"]);
        assert_eq!(texts(&bob_mem).await, vec!["q", "from bob"]);
    }

    #[tokio::test]
    async fn hub_broadcast_and_close() {
        let (alice, alice_mem) = member("alice", "from alice");
        let (bob, bob_mem) = member("bob", "from bob");
        let mut hub = MessageHub::new("room", vec![dynamic(&alice), dynamic(&bob)]).unwrap();
        let cancel = CancellationToken::new();

        hub.broadcast(&cancel, &Message::user("announcement")).await.unwrap();
        assert_eq!(texts(&alice_mem).await, vec!["announcement"]);
        assert_eq!(texts(&bob_mem).await, vec!["announcement"]);

        hub.close().unwrap();
        assert!(hub.participants().is_empty());
        assert!(alice.base().subscribers("room").unwrap().is_empty());

        alice.reply(&cancel, Message::user("anyone?")).await.unwrap();
        assert_eq!(texts(&bob_mem).await, vec!["announcement"]);
    }

    #[tokio::test]
    async fn dropping_the_hub_releases_members() {
        let (alice, _) = member("alice", "from alice");
        let (bob, bob_mem) = member("bob", "from bob");
        {
            let _hub = MessageHub::new("room", vec![dynamic(&alice), dynamic(&bob)]).unwrap();
            // Held by the test, the hub and alice's subscription.
            assert_eq!(Arc::strong_count(&bob), 3);
        }

        assert_eq!(Arc::strong_count(&alice), 1);
        assert_eq!(Arc::strong_count(&bob), 1);
        assert!(alice.base().subscribers("room").unwrap().is_empty());

        alice
            .reply(&CancellationToken::new(), Message::user("still there?"))
            .await
            .unwrap();
        assert!(texts(&bob_mem).await.is_empty());
    }
}
