//! Room Directory
//!
//! Read-only view answering "who is in room R". Rooms are never stored
//! on their own; everything here is derived from the membership store.

use serde::{Serialize, Deserialize};

use crate::room::store::{normalize_room, MembershipStore};
use crate::room::user::User;

/// Membership snapshot of one room, as broadcast to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    /// Room key.
    pub room: String,
    /// Current members in join order.
    pub users: Vec<User>,
}

/// Summary of a live room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room key.
    pub room: String,
    /// Number of members.
    pub members: usize,
}

/// Borrowed query surface over a [`MembershipStore`].
#[derive(Clone, Copy)]
pub struct RoomDirectory<'a> {
    store: &'a MembershipStore,
}

impl<'a> RoomDirectory<'a> {
    /// Wrap a store.
    pub fn new(store: &'a MembershipStore) -> Self {
        Self { store }
    }

    /// Members of `room` in join order.
    pub fn members_of(&self, room: &str) -> Vec<User> {
        self.store.list_by_room(room)
    }

    /// Snapshot of `room` ready to broadcast.
    pub fn room_data(&self, room: &str) -> RoomData {
        RoomData {
            room: normalize_room(room).to_string(),
            users: self.members_of(room),
        }
    }

    /// All live rooms in key order.
    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.store
            .rooms()
            .into_iter()
            .map(|(room, members)| RoomSummary { room, members })
            .collect()
    }
}
