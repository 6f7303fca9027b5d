//! # Quincena Gameplay
//!
//! Enemy and companion AI plus the combat core of Operación Quincena.
//!
//! This crate provides:
//! - Actors (player, companion, helper) with health and invulnerability
//! - Enemy archetypes, range bands with hysteresis and the enemy state machine
//! - Closest-target resolution
//! - Companion follow controller
//! - Cannons and cannonballs
//! - Per-level timers, events and progress
//! - The level session that ties everything to a host engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod archetype;
pub mod behavior;
pub mod body;
pub mod cannon;
pub mod combat;
pub mod companion;
pub mod enemy;
pub mod error;
pub mod events;
pub mod game_state;
pub mod hooks;
pub mod level;
pub mod range;
mod scenarios;
pub mod session;
pub mod target;
pub mod timers;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::archetype::*;
    pub use crate::behavior::*;
    pub use crate::body::*;
    pub use crate::cannon::*;
    pub use crate::combat::*;
    pub use crate::companion::*;
    pub use crate::enemy::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::game_state::*;
    pub use crate::hooks::*;
    pub use crate::level::*;
    pub use crate::range::*;
    pub use crate::session::*;
    pub use crate::target::*;
    pub use crate::timers::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_common::Vec2;

    #[test]
    fn test_builtin_levels_build_sessions() {
        for id in [LevelId::One, LevelId::Two, LevelId::Three] {
            let spec = LevelSpec::builtin(id);
            let enemies = spec.enemies.len();
            let session = LevelSession::new(spec, ArchetypeTable::builtin(), SessionTuning::default(), None, 7)
                .expect("session");
            assert_eq!(session.enemies().len(), enemies);
            assert_eq!(session.boss().is_some(), id == LevelId::Three);
        }
    }

    #[test]
    fn test_closest_target_prefers_first_on_tie() {
        let player = Actor::new(
            quincena_common::EntityId::from_raw(1),
            ActorKind::Player,
            quincena_common::SpriteHandle::new(1),
            Vec2::new(-10.0, 0.0),
            100,
        );
        let companion = Actor::new(
            quincena_common::EntityId::from_raw(2),
            ActorKind::Companion,
            quincena_common::SpriteHandle::new(2),
            Vec2::new(10.0, 0.0),
            100,
        );
        let lock = find_closest_target(Vec2::ZERO, [&player, &companion]).expect("target");
        assert_eq!(lock.id, player.id);
    }
}
