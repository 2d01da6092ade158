//! Connection Identities and Users
//!
//! A `User` is the membership record of one joined connection.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Opaque identity of one live transport session.
///
/// Minted once per accepted connection and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Mint a fresh random identity.
    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Build from raw bytes (deterministic ids for tests and tooling).
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }

    /// Parse from a UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// USER
// =============================================================================

/// One joined player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Connection this user is bound to.
    pub id: ConnectionId,
    /// Display name assigned at join time. Empty when no slot was free.
    pub name: String,
    /// Room key, fixed for the user's lifetime.
    pub room: String,
}

impl User {
    /// Whether the user holds one of the named player slots.
    pub fn is_seated(&self) -> bool {
        !self.name.is_empty()
    }
}
