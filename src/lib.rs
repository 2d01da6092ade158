//! # Room Relay Server
//!
//! Realtime room coordination for two-player card games: groups websocket
//! connections into named rooms, names the players, and relays game-state
//! and chat events to everyone in the room.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ROOM RELAY SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  room/           - Membership model (pure, no I/O)           │
//! │  ├── user.rs     - Connection identities and users           │
//! │  ├── slots.rs    - "Player 1"/"Player 2" slot naming         │
//! │  ├── store.rs    - Membership store                          │
//! │  └── directory.rs- Derived room views                        │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── hub.rs      - Shared state behind one lock              │
//! │  ├── outbox.rs   - Per-connection outbound queues            │
//! │  ├── lifecycle.rs- Join / leave / disconnect                 │
//! │  ├── relay.rs    - Game-state and chat relay                 │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Every membership change and every broadcast runs inside the hub's
//! single critical section. Broadcasts never wait on a client, so a slow
//! connection only loses its own messages.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod network;
pub mod room;

// Re-export commonly used types
pub use network::{EventRelay, Hub, LifecycleHandler, RelayServer, ServerConfig};
pub use room::{ConnectionId, MembershipStore, RoomDirectory, User};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
