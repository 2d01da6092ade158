//! Event Relay
//!
//! Forwards game-state and chat events from a joined connection to every
//! member of its room, the sender included.

use serde_json::Value;
use tracing::debug;

use crate::network::hub::Hub;
use crate::network::protocol::{ChatMessage, ServerMessage};
use crate::room::user::{ConnectionId, User};

/// An application event to relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayedEvent {
    /// Full game-state snapshot.
    InitGameState(Value),
    /// Game-state delta.
    UpdateGameState(Value),
    /// Chat text. The sender's display name is attached on delivery.
    Chat(String),
}

impl RelayedEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::InitGameState(_) => "initGameState",
            Self::UpdateGameState(_) => "updateGameState",
            Self::Chat(_) => "message",
        }
    }

    fn into_message(self, sender: &User) -> ServerMessage {
        match self {
            Self::InitGameState(state) => ServerMessage::InitGameState(state),
            Self::UpdateGameState(state) => ServerMessage::UpdateGameState(state),
            Self::Chat(text) => ServerMessage::Message(ChatMessage {
                user: sender.name.clone(),
                text,
            }),
        }
    }
}

/// What happened to a relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued for this many room members.
    Delivered(usize),
    /// Sender is not in a room; the event was discarded.
    Dropped,
}

/// Room-wide event forwarding.
#[derive(Clone)]
pub struct EventRelay {
    hub: Hub,
}

impl EventRelay {
    /// Create a relay over `hub`.
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// Relay `event` from `sender` to its room.
    pub async fn relay(&self, sender: ConnectionId, event: RelayedEvent) -> RelayOutcome {
        let state = self.hub.lock().await;

        let Some(user) = state.members.get(&sender) else {
            debug!(conn = %sender.short(), kind = event.kind(), "Sender not in a room, dropping event");
            return RelayOutcome::Dropped;
        };

        let kind = event.kind();
        let message = event.into_message(user);
        let delivered = state.broadcast(&user.room, &message);

        debug!(conn = %sender.short(), room = %user.room, kind, delivered, "Relayed event");
        RelayOutcome::Delivered(delivered)
    }

    /// Relay a game-state snapshot.
    pub async fn init_game_state(&self, sender: ConnectionId, state: Value) -> RelayOutcome {
        self.relay(sender, RelayedEvent::InitGameState(state)).await
    }

    /// Relay a game-state delta.
    pub async fn update_game_state(&self, sender: ConnectionId, state: Value) -> RelayOutcome {
        self.relay(sender, RelayedEvent::UpdateGameState(state)).await
    }

    /// Relay a chat line.
    pub async fn send_message(&self, sender: ConnectionId, text: impl Into<String>) -> RelayOutcome {
        self.relay(sender, RelayedEvent::Chat(text.into())).await
    }
}
