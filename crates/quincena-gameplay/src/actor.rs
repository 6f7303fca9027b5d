//! Player-side actors: the player, the companion and the helper (Motocle).

use glam::Vec2;
use quincena_common::{EntityId, Facing, SpriteHandle};
use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::error::{GameplayError, GameplayResult};

/// Role of a player-side actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The controlled hero
    Player,
    /// Second hero; losing both ends the game
    Companion,
    /// AI-driven helper that follows the heroes
    Helper,
}

impl ActorKind {
    /// Returns true for the two heroes whose defeat can end the game.
    #[must_use]
    pub const fn counts_for_game_over(self) -> bool {
        matches!(self, Self::Player | Self::Companion)
    }

    /// Name used in logs and HUD labels.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Companion => "companion",
            Self::Helper => "motocle",
        }
    }
}

/// Result of applying damage or healing to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health before the change
    pub before: i32,
    /// Health after the change
    pub after: i32,
}

impl HealthChange {
    /// Signed delta.
    #[must_use]
    pub const fn delta(&self) -> i32 {
        self.after - self.before
    }

    /// True if health reached zero with this change.
    #[must_use]
    pub const fn is_lethal(&self) -> bool {
        self.before > 0 && self.after == 0
    }
}

/// A player-side character.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Entity ID
    pub id: EntityId,
    /// Role
    pub kind: ActorKind,
    /// Host sprite
    pub sprite: SpriteHandle,
    /// Kinematic state
    pub body: Body,
    /// Current facing
    pub facing: Facing,
    /// Damage dealt by `actor_attack`
    pub attack_damage: i32,
    health: i32,
    max_health: i32,
    active: bool,
    invulnerable: bool,
    last_attack_at: Option<u64>,
}

impl Actor {
    /// Creates an active actor at full health.
    #[must_use]
    pub fn new(id: EntityId, kind: ActorKind, sprite: SpriteHandle, position: Vec2, max_health: i32) -> Self {
        let max_health = max_health.max(1);
        Self {
            id,
            kind,
            sprite,
            body: Body::at(position),
            facing: Facing::Right,
            attack_damage: 25,
            health: max_health,
            max_health,
            active: true,
            invulnerable: false,
            last_attack_at: None,
        }
    }

    /// Sets starting health (clamped to `0..=max_health`).
    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health.clamp(0, self.max_health);
        self
    }

    /// Sets attack damage.
    #[must_use]
    pub const fn with_attack_damage(mut self, damage: i32) -> Self {
        self.attack_damage = damage;
        self
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Health as a fraction of max.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        self.health as f32 / self.max_health as f32
    }

    /// Whether the actor still takes part in the level.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the actor ignores incoming damage right now.
    #[must_use]
    pub const fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Subtracts damage, clamping at zero. Inactive actors are stale references.
    pub fn take_damage(&mut self, amount: i32) -> GameplayResult<HealthChange> {
        if !self.active {
            return Err(GameplayError::StaleReference(self.id));
        }
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        Ok(HealthChange { before, after: self.health })
    }

    /// Adds health up to max.
    pub fn heal(&mut self, amount: i32) -> GameplayResult<HealthChange> {
        if !self.active {
            return Err(GameplayError::StaleReference(self.id));
        }
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        Ok(HealthChange { before, after: self.health })
    }

    /// Starts an invulnerability window; the session schedules its end.
    pub fn begin_invulnerability(&mut self) {
        self.invulnerable = true;
    }

    /// Ends the invulnerability window.
    pub fn end_invulnerability(&mut self) {
        self.invulnerable = false;
    }

    /// Removes the actor from play. There is no way back.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.invulnerable = false;
        self.body.halt();
    }

    /// Returns true if the attack cooldown has elapsed, recording `now` when it has.
    pub fn try_begin_attack(&mut self, now: u64, cooldown_ms: u64) -> bool {
        if !self.active {
            return false;
        }
        if let Some(last) = self.last_attack_at {
            if now.saturating_sub(last) < cooldown_ms {
                return false;
            }
        }
        self.last_attack_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> Actor {
        Actor::new(EntityId::from_raw(1), ActorKind::Player, SpriteHandle::new(1), Vec2::ZERO, 100)
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut actor = hero();
        let change = actor.take_damage(250).expect("active actor");
        assert_eq!(change.after, 0);
        assert!(change.is_lethal());
        assert_eq!(actor.health(), 0);
    }

    #[test]
    fn test_heal_capped_at_max() {
        let mut actor = hero().with_health(90);
        let change = actor.heal(60).expect("active actor");
        assert_eq!(change.delta(), 10);
        assert_eq!(actor.health(), 100);
    }

    #[test]
    fn test_inactive_actor_rejects_damage() {
        let mut actor = hero();
        actor.deactivate();
        assert_eq!(
            actor.take_damage(10),
            Err(GameplayError::StaleReference(EntityId::from_raw(1)))
        );
    }

    #[test]
    fn test_attack_cooldown() {
        let mut actor = hero();
        assert!(actor.try_begin_attack(1000, 400));
        assert!(!actor.try_begin_attack(1200, 400));
        assert!(actor.try_begin_attack(1400, 400));
    }

    #[test]
    fn test_game_over_roles() {
        assert!(ActorKind::Player.counts_for_game_over());
        assert!(ActorKind::Companion.counts_for_game_over());
        assert!(!ActorKind::Helper.counts_for_game_over());
    }
}
