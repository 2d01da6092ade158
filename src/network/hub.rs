//! Relay Hub
//!
//! The one piece of shared mutable state in the server: membership store,
//! slot naming, outbound queues and per-connection lifecycle phase, all
//! behind a single mutex. Fan-out happens while the lock is held, so every room sees
//! membership broadcasts in the order the membership actually changed.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard};

use crate::network::outbox::Outboxes;
use crate::network::protocol::ServerMessage;
use crate::room::directory::{RoomData, RoomDirectory, RoomSummary};
use crate::room::slots::SlotAllocator;
use crate::room::store::MembershipStore;
use crate::room::user::{ConnectionId, User};

/// Where a connection is in its lifecycle.
///
/// Disconnected connections are forgotten entirely, so they have no phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Connected, not in a room yet.
    Unjoined,
    /// Member of a room.
    Joined,
    /// Left its room; the connection stays open but cannot rejoin.
    Left,
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Messages buffered per connection before deliveries are skipped.
    pub outbox_capacity: usize,
    /// Maximum members per room. `None` admits everyone.
    pub room_capacity: Option<usize>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
            room_capacity: None,
        }
    }
}

/// State guarded by the hub lock.
#[derive(Debug)]
pub struct HubState {
    pub(crate) members: MembershipStore,
    pub(crate) slots: SlotAllocator,
    pub(crate) outboxes: Outboxes,
    pub(crate) phases: BTreeMap<ConnectionId, ConnectionPhase>,
    pub(crate) config: HubConfig,
}

impl HubState {
    fn new(config: HubConfig) -> Self {
        Self {
            members: MembershipStore::new(),
            slots: SlotAllocator::default(),
            outboxes: Outboxes::new(config.outbox_capacity),
            phases: BTreeMap::new(),
            config,
        }
    }

    /// Room queries over the current membership.
    pub fn directory(&self) -> RoomDirectory<'_> {
        RoomDirectory::new(&self.members)
    }

    /// Send `message` to every member of `room`. Returns the number reached.
    pub fn broadcast(&self, room: &str, message: &ServerMessage) -> usize {
        self.outboxes.send_to_all(self.members.members(room), message)
    }

    /// Broadcast the current `roomData` of `room` to its members.
    pub fn broadcast_room_data(&self, room: &str) -> usize {
        let data = self.directory().room_data(room);
        self.broadcast(room, &ServerMessage::RoomData(data))
    }
}

/// Cloneable handle to the shared hub state.
#[derive(Clone)]
pub struct Hub {
    state: Arc<Mutex<HubState>>,
}

impl Hub {
    /// Create an empty hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::new(config))),
        }
    }

    /// Register a new connection under a fresh identity.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        loop {
            let id = ConnectionId::new_random();
            if let Some(rx) = self.connect_as(id).await {
                return (id, rx);
            }
        }
    }

    /// Register a connection under `id`.
    ///
    /// Returns `None` if `id` is already registered.
    pub async fn connect_as(&self, id: ConnectionId) -> Option<mpsc::Receiver<ServerMessage>> {
        let mut state = self.state.lock().await;
        if state.phases.contains_key(&id) {
            return None;
        }
        state.phases.insert(id, ConnectionPhase::Unjoined);
        Some(state.outboxes.attach(id))
    }

    /// Enter the critical section.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().await
    }

    /// Members of `room` in join order.
    pub async fn members_of(&self, room: &str) -> Vec<User> {
        self.state.lock().await.directory().members_of(room)
    }

    /// Current `roomData` snapshot of `room`.
    pub async fn room_data(&self, room: &str) -> RoomData {
        self.state.lock().await.directory().room_data(room)
    }

    /// All live rooms.
    pub async fn rooms(&self) -> Vec<RoomSummary> {
        self.state.lock().await.directory().summaries()
    }

    /// Membership record of `id`.
    pub async fn user(&self, id: &ConnectionId) -> Option<User> {
        self.state.lock().await.members.get(id).cloned()
    }

    /// Lifecycle phase of `id`; `None` if unknown or disconnected.
    pub async fn phase(&self, id: &ConnectionId) -> Option<ConnectionPhase> {
        self.state.lock().await.phases.get(id).copied()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.phases.len()
    }

    /// Number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.members.room_count()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ConnectionId {
        ConnectionId::from_bytes([n; 16])
    }

    #[tokio::test]
    async fn test_connect_registers_unjoined() {
        let hub = Hub::default();
        let (conn, _rx) = hub.connect().await;

        assert_eq!(hub.phase(&conn).await, Some(ConnectionPhase::Unjoined));
        assert_eq!(hub.connection_count().await, 1);
        assert!(hub.user(&conn).await.is_none());
    }

    #[tokio::test]
    async fn test_connect_as_rejects_known_id() {
        let hub = Hub::default();
        assert!(hub.connect_as(id(1)).await.is_some());
        assert!(hub.connect_as(id(1)).await.is_none());
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_only() {
        let hub = Hub::default();
        let mut rx1 = hub.connect_as(id(1)).await.unwrap();
        let mut rx2 = hub.connect_as(id(2)).await.unwrap();

        {
            let mut state = hub.lock().await;
            state.members.add(id(1), None, "R1").unwrap();
            state.members.add(id(2), None, "R2").unwrap();
            assert_eq!(state.broadcast_room_data("R1"), 1);
        }

        match rx1.try_recv() {
            Ok(ServerMessage::RoomData(data)) => {
                assert_eq!(data.room, "R1");
                assert_eq!(data.users.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_queries() {
        let hub = Hub::default();
        let _rx = hub.connect_as(id(1)).await.unwrap();
        hub.lock().await.members.add(id(1), Some("Player 1"), "R1").unwrap();

        assert_eq!(hub.members_of("R1").await.len(), 1);
        assert_eq!(hub.room_data("R1").await.users[0].name, "Player 1");
        assert_eq!(hub.rooms().await.len(), 1);
        assert_eq!(hub.room_count().await, 1);
    }
}
