//! Room Membership
//!
//! Pure in-memory membership model. No I/O, no locking; the network layer
//! owns the single shared instance.

pub mod directory;
pub mod slots;
pub mod store;
pub mod user;

pub use directory::{RoomData, RoomDirectory, RoomSummary};
pub use slots::{SlotAllocator, PLAYER_SLOTS, UNSEATED_NAME};
pub use store::{MembershipStore, StoreError};
pub use user::{ConnectionId, User};
