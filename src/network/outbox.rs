//! Connection Outboxes
//!
//! One bounded queue per connection feeding its websocket writer task.
//! Delivery never waits: a full or closed queue means the message is
//! skipped for that connection.

use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::network::protocol::ServerMessage;
use crate::room::user::{ConnectionId, User};

/// Registry of outbound queues, keyed by connection.
#[derive(Debug)]
pub struct Outboxes {
    senders: BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>,
    capacity: usize,
}

impl Outboxes {
    /// Create a registry whose queues hold up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Open a queue for `id`, replacing any previous one.
    pub fn attach(&mut self, id: ConnectionId) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.insert(id, tx);
        rx
    }

    /// Close the queue for `id`. Returns whether one existed.
    pub fn detach(&mut self, id: &ConnectionId) -> bool {
        self.senders.remove(id).is_some()
    }

    /// Whether `id` has an open queue.
    pub fn is_attached(&self, id: &ConnectionId) -> bool {
        self.senders.contains_key(id)
    }

    /// Number of open queues.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Whether no queue is open.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Queue `message` for `id`. Returns whether it was accepted.
    pub fn send_to(&self, id: &ConnectionId, message: ServerMessage) -> bool {
        let Some(sender) = self.senders.get(id) else {
            debug!(conn = %id.short(), "No outbox, skipping delivery");
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(conn = %id.short(), "Outbox full, skipping delivery to slow client");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = %id.short(), "Outbox closed, skipping delivery");
                false
            }
        }
    }

    /// Queue `message` for every user in `members`. Returns how many accepted it.
    pub fn send_to_all<'a, I>(&self, members: I, message: &ServerMessage) -> usize
    where
        I: IntoIterator<Item = &'a User>,
    {
        members
            .into_iter()
            .filter(|user| self.send_to(&user.id, message.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ConnectionId {
        ConnectionId::from_bytes([n; 16])
    }

    fn user(n: u8) -> User {
        User { id: id(n), name: String::new(), room: "R".into() }
    }

    fn shutdown() -> ServerMessage {
        ServerMessage::Shutdown { reason: "test".into() }
    }

    #[tokio::test]
    async fn test_send_to_attached() {
        let mut outboxes = Outboxes::new(4);
        let mut rx = outboxes.attach(id(1));

        assert!(outboxes.send_to(&id(1), shutdown()));
        assert_eq!(rx.recv().await, Some(shutdown()));
    }

    #[test]
    fn test_send_to_unknown_is_skipped() {
        let outboxes = Outboxes::new(4);
        assert!(!outboxes.send_to(&id(1), shutdown()));
    }

    #[test]
    fn test_full_outbox_is_skipped() {
        let mut outboxes = Outboxes::new(1);
        let mut rx = outboxes.attach(id(1));

        assert!(outboxes.send_to(&id(1), shutdown()));
        assert!(!outboxes.send_to(&id(1), shutdown()));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_outbox_is_skipped() {
        let mut outboxes = Outboxes::new(4);
        let rx = outboxes.attach(id(1));
        drop(rx);
        assert!(!outboxes.send_to(&id(1), shutdown()));
    }

    #[test]
    fn test_send_to_all_counts_accepted() {
        let mut outboxes = Outboxes::new(4);
        let mut rx1 = outboxes.attach(id(1));
        let rx2 = outboxes.attach(id(2));
        drop(rx2);

        let members = [user(1), user(2), user(3)];
        assert_eq!(outboxes.send_to_all(&members, &shutdown()), 1);
        assert_eq!(rx1.try_recv().ok(), Some(shutdown()));
    }

    #[test]
    fn test_detach() {
        let mut outboxes = Outboxes::new(4);
        let _rx = outboxes.attach(id(1));
        assert!(outboxes.is_attached(&id(1)));
        assert_eq!(outboxes.len(), 1);

        assert!(outboxes.detach(&id(1)));
        assert!(!outboxes.detach(&id(1)));
        assert!(outboxes.is_empty());
    }
}
