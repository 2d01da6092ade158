//! Player Slot Allocation
//!
//! Each room has a fixed number of named player slots. A joiner takes the
//! lowest free slot; once every slot is taken, joiners are admitted unseated.

use crate::room::user::User;

/// Slot names handed out in order.
pub const PLAYER_SLOTS: [&str; 2] = ["Player 1", "Player 2"];

/// Display name given to a joiner when every slot is taken.
pub const UNSEATED_NAME: &str = "";

/// Capped slot allocator.
#[derive(Clone, Copy, Debug)]
pub struct SlotAllocator {
    slots: &'static [&'static str],
}

impl SlotAllocator {
    /// Allocator over an explicit slot list.
    pub const fn new(slots: &'static [&'static str]) -> Self {
        Self { slots }
    }

    /// Pick the lowest slot not held by any of `occupants`.
    ///
    /// Returns `None` when all slots are taken.
    pub fn assign<'a, I>(&self, occupants: I) -> Option<&'static str>
    where
        I: IntoIterator<Item = &'a User>,
    {
        let taken: Vec<&str> = occupants.into_iter().map(|u| u.name.as_str()).collect();
        self.slots
            .iter()
            .copied()
            .find(|slot| !taken.contains(slot))
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new(&PLAYER_SLOTS)
    }
}
