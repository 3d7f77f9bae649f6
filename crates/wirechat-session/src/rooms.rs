//! The set of rooms the client believes it has joined.
//!
//! The set is never cleared: it survives disconnects and `close()` so the
//! reconnect loop can replay a `join` for each room on the new connection.

use std::collections::BTreeSet;

/// Joined rooms, kept in name order so replays are deterministic.
#[derive(Debug, Clone, Default)]
pub struct JoinedRooms {
    rooms: BTreeSet<String>,
}

impl JoinedRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `room`. Returns `false` if it was already present.
    pub fn insert(&mut self, room: impl Into<String>) -> bool {
        self.rooms.insert(room.into())
    }

    /// Forgets `room`. Returns `false` if it was not present.
    pub fn remove(&mut self, room: &str) -> bool {
        self.rooms.remove(room)
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains(room)
    }

    /// Copies the current set out, for replay without holding a lock.
    pub fn snapshot(&self) -> Vec<String> {
        self.rooms.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
