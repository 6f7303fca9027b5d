//! Identifier types for gameplay entities and host sprites.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a gameplay entity (actor, enemy, cannon, cannonball).
///
/// Ids are handed out by an [`IdAllocator`] owned by the level session, so
/// two sessions built from the same seed produce the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Creates an entity ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential id source scoped to one level session.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle to a sprite owned by the host engine.
///
/// Gameplay records keep the handle so presentation calls (animation, tint,
/// flip) can be routed back to the right sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteHandle(u64);

impl SpriteHandle {
    /// Handle that refers to no sprite.
    pub const DETACHED: Self = Self(0);

    /// Wraps a host-side sprite key.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the host-side sprite key.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true if the handle is attached to a host sprite.
    #[must_use]
    pub const fn is_attached(self) -> bool {
        self.0 != 0
    }
}
