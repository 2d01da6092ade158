//! Network Layer
//!
//! WebSocket server plus the lifecycle and relay logic it drives.
//! All shared state lives in the [`Hub`]; nothing here is global.

pub mod hub;
pub mod lifecycle;
pub mod outbox;
pub mod protocol;
pub mod relay;
pub mod server;

pub use hub::{ConnectionPhase, Hub, HubConfig};
pub use lifecycle::{Departure, LifecycleError, LifecycleHandler};
pub use outbox::Outboxes;
pub use protocol::{
    Ack, AckedEvent, ChatMessage, ClientMessage, CurrentUserData, ServerMessage,
};
pub use relay::{EventRelay, RelayOutcome, RelayedEvent};
pub use server::{ConfigError, RelayServer, ServerConfig, ServerError};
