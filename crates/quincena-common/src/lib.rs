//! # Quincena Common
//!
//! Shared types for the Operación Quincena gameplay core.
//!
//! This crate provides the foundational types used by every other crate:
//! - Entity ids and per-session id allocation
//! - Sprite handles pointing back into the host engine
//! - Geometry helpers on top of `glam` (facing, world bounds, distances)
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
    pub use glam::Vec2;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_hands_out_unique_ids() {
        let mut ids = IdAllocator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(a.is_valid());
    }

    #[test]
    fn test_facing_towards_target() {
        assert_eq!(Facing::towards(100.0, 40.0), Facing::Left);
        assert_eq!(Facing::towards(100.0, 160.0), Facing::Right);
        assert!(Facing::Left.flip_x());
    }
}
