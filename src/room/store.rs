//! Membership Store
//!
//! Authoritative mapping from connection identity to [`User`].
//! Uses BTreeMap throughout so room listings come out in a stable order.

use std::collections::{BTreeMap, BTreeSet};

use crate::room::slots::UNSEATED_NAME;
use crate::room::user::{ConnectionId, User};

/// Membership store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connection already has a membership record.
    #[error("Connection {0} already joined")]
    DuplicateConnection(ConnectionId),

    /// Room key is blank.
    #[error("Room key must not be blank")]
    InvalidRoom,
}

/// In-memory membership registry.
///
/// Every user carries an insertion sequence number; room listings are
/// ordered by it. Rooms are only an index over users: a room key disappears
/// as soon as its last member is removed.
#[derive(Debug, Default)]
pub struct MembershipStore {
    /// Users keyed by insertion sequence.
    users: BTreeMap<u64, User>,
    /// Connection to sequence.
    index: BTreeMap<ConnectionId, u64>,
    /// Room key to member sequences.
    rooms: BTreeMap<String, BTreeSet<u64>>,
    /// Next insertion sequence.
    next_seq: u64,
}

/// Canonical form of a room key.
pub fn normalize_room(room: &str) -> &str {
    room.trim()
}

impl MembershipStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user for `id` in `room`.
    ///
    /// The effective name is `proposed_name` trimmed; an absent or blank
    /// proposal leaves the user unseated.
    pub fn add(
        &mut self,
        id: ConnectionId,
        proposed_name: Option<&str>,
        room: &str,
    ) -> Result<User, StoreError> {
        let room = normalize_room(room);
        if room.is_empty() {
            return Err(StoreError::InvalidRoom);
        }
        if self.index.contains_key(&id) {
            return Err(StoreError::DuplicateConnection(id));
        }

        let name = proposed_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNSEATED_NAME)
            .to_string();

        let user = User {
            id,
            name,
            room: room.to_string(),
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.users.insert(seq, user.clone());
        self.index.insert(id, seq);
        self.rooms.entry(user.room.clone()).or_default().insert(seq);

        Ok(user)
    }

    /// Remove and return the user for `id`, if any.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<User> {
        let seq = self.index.remove(id)?;
        let user = self.users.remove(&seq)?;

        if let Some(members) = self.rooms.get_mut(&user.room) {
            members.remove(&seq);
            if members.is_empty() {
                self.rooms.remove(&user.room);
            }
        }

        Some(user)
    }

    /// Look up the user for `id`.
    pub fn get(&self, id: &ConnectionId) -> Option<&User> {
        self.index.get(id).and_then(|seq| self.users.get(seq))
    }

    /// Check whether `id` has a membership record.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.index.contains_key(id)
    }

    /// Members of `room` in insertion order. Empty for unknown rooms.
    pub fn list_by_room(&self, room: &str) -> Vec<User> {
        self.members(room).cloned().collect()
    }

    /// Borrowing iterator over the members of `room`, in insertion order.
    pub fn members<'a>(&'a self, room: &str) -> impl Iterator<Item = &'a User> + 'a {
        self.rooms
            .get(normalize_room(room))
            .into_iter()
            .flat_map(|seqs| seqs.iter())
            .filter_map(move |seq| self.users.get(seq))
    }

    /// Number of members in `room`.
    pub fn occupancy(&self, room: &str) -> usize {
        self.rooms
            .get(normalize_room(room))
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    /// Live room keys with their member counts, in key order.
    pub fn rooms(&self) -> Vec<(String, usize)> {
        self.rooms
            .iter()
            .map(|(room, members)| (room.clone(), members.len()))
            .collect()
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no user is registered.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
