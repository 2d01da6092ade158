//! Connection Lifecycle
//!
//! Drives each connection through `Unjoined -> Joined -> Left/Disconnected`
//! and emits the membership broadcasts that go with each transition.

use tracing::{debug, info};

use crate::network::hub::{ConnectionPhase, Hub};
use crate::network::protocol::{CurrentUserData, ServerMessage};
use crate::room::store::{normalize_room, StoreError};
use crate::room::user::{ConnectionId, User};

/// How a joined connection stopped being a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Explicit leave; the connection stays open.
    Left,
    /// Transport closed.
    Disconnected,
}

/// Lifecycle errors. Reported to the triggering connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Connection is already a member of a room.
    #[error("Connection {0} already joined a room")]
    DuplicateConnection(ConnectionId),

    /// Connection is not registered with the hub.
    #[error("Connection {0} is not connected")]
    NotConnected(ConnectionId),

    /// Connection already left its room.
    #[error("Connection {0} already left its room")]
    Closed(ConnectionId),

    /// Room key is blank.
    #[error("Room key must not be blank")]
    InvalidRoom,

    /// Room is at capacity.
    #[error("Room {room} is full ({capacity} members)")]
    RoomFull {
        /// Room key.
        room: String,
        /// Configured capacity.
        capacity: usize,
    },
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateConnection(id) => Self::DuplicateConnection(id),
            StoreError::InvalidRoom => Self::InvalidRoom,
        }
    }
}

/// Applies connect/join/leave/disconnect transitions to the hub.
#[derive(Clone)]
pub struct LifecycleHandler {
    hub: Hub,
}

impl LifecycleHandler {
    /// Create a handler over `hub`.
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Join `id` to `room`.
    ///
    /// The joiner takes the lowest free player slot in the room, or stays
    /// unseated when every slot is held. On success every member of the
    /// room (the joiner included) gets a `roomData` update, then the joiner
    /// alone gets `currentUserData`. On failure nothing is broadcast.
    pub async fn join(&self, id: ConnectionId, room: &str) -> Result<User, LifecycleError> {
        let mut guard = self.hub.lock().await;
        let state = &mut *guard;

        match state.phases.get(&id) {
            Some(ConnectionPhase::Unjoined) => {}
            Some(ConnectionPhase::Joined) => return Err(LifecycleError::DuplicateConnection(id)),
            Some(ConnectionPhase::Left) => return Err(LifecycleError::Closed(id)),
            None => return Err(LifecycleError::NotConnected(id)),
        }

        let room = normalize_room(room);
        if room.is_empty() {
            return Err(LifecycleError::InvalidRoom);
        }
        if let Some(capacity) = state.config.room_capacity {
            if state.members.occupancy(room) >= capacity {
                debug!(conn = %id.short(), room, capacity, "Join rejected, room full");
                return Err(LifecycleError::RoomFull {
                    room: room.to_string(),
                    capacity,
                });
            }
        }

        let proposed = state.slots.assign(state.members.members(room));
        let user = state.members.add(id, proposed, room)?;
        state.phases.insert(id, ConnectionPhase::Joined);

        let notified = state.broadcast_room_data(&user.room);
        state.outboxes.send_to(
            &id,
            ServerMessage::CurrentUserData(CurrentUserData { name: user.name.clone() }),
        );

        info!(
            conn = %id.short(),
            room = %user.room,
            name = %user.name,
            notified,
            "Connection joined room"
        );

        Ok(user)
    }

    /// Explicit leave. The connection stays registered but cannot rejoin.
    pub async fn leave(&self, id: ConnectionId) -> Option<User> {
        self.depart(id, Departure::Left).await
    }

    /// Transport closed. Forgets the connection entirely.
    pub async fn disconnect(&self, id: ConnectionId) -> Option<User> {
        self.depart(id, Departure::Disconnected).await
    }

    /// Remove `id` from its room, if it has one, and tell the remaining
    /// members. Unjoined and unknown connections are a silent no-op.
    async fn depart(&self, id: ConnectionId, how: Departure) -> Option<User> {
        let mut guard = self.hub.lock().await;
        let state = &mut *guard;

        let previous = match how {
            Departure::Disconnected => {
                state.outboxes.detach(&id);
                state.phases.remove(&id)
            }
            Departure::Left => {
                let previous = state.phases.get(&id).copied();
                if previous == Some(ConnectionPhase::Joined) {
                    state.phases.insert(id, ConnectionPhase::Left);
                }
                previous
            }
        };

        if previous != Some(ConnectionPhase::Joined) {
            debug!(conn = %id.short(), ?how, ?previous, "Nothing to remove");
            return None;
        }

        let user = state.members.remove(&id)?;
        let notified = state.broadcast_room_data(&user.room);

        info!(
            conn = %id.short(),
            room = %user.room,
            name = %user.name,
            ?how,
            notified,
            "Connection left room"
        );

        Some(user)
    }
}
