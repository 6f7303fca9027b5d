//! Damage resolution for player-side actors.
//!
//! This module provides:
//! - Hit records carrying the damage source and attacker position
//! - Invulnerability gating and knockback away from the attacker
//! - Invulnerability window lengths per actor role
//! - A one-shot latch for the game-over signal

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor::{Actor, ActorKind};
use crate::archetype::EnemyType;

/// What dealt the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageSource {
    /// An enemy's strike or body contact
    Enemy(EnemyType),
    /// Touching a cannon body
    Cannon,
    /// A cannonball
    CannonBall,
}

/// A single incoming hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Damage source
    pub source: DamageSource,
    /// Damage amount
    pub damage: i32,
    /// Attacker position, used for knockback direction
    pub origin: Vec2,
}

impl Hit {
    /// Creates a hit.
    #[must_use]
    pub const fn new(source: DamageSource, damage: i32, origin: Vec2) -> Self {
        Self { source, damage, origin }
    }
}

/// Knockback impulse applied on every accepted hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Knockback {
    /// Horizontal speed away from the attacker (px/s)
    pub horizontal: f32,
    /// Vertical speed (negative is up)
    pub vertical: f32,
}

impl Default for Knockback {
    fn default() -> Self {
        Self {
            horizontal: 200.0,
            vertical: -100.0,
        }
    }
}

/// Invulnerability window lengths per role (ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvulnerabilityWindows {
    /// Player window
    pub player_ms: u64,
    /// Companion window
    pub companion_ms: u64,
    /// Helper window
    pub helper_ms: u64,
}

impl Default for InvulnerabilityWindows {
    fn default() -> Self {
        Self {
            player_ms: 1000,
            companion_ms: 1000,
            helper_ms: 1200,
        }
    }
}

impl InvulnerabilityWindows {
    /// Window for a role.
    #[must_use]
    pub const fn for_kind(&self, kind: ActorKind) -> u64 {
        match kind {
            ActorKind::Player => self.player_ms,
            ActorKind::Companion => self.companion_ms,
            ActorKind::Helper => self.helper_ms,
        }
    }
}

/// Why a hit was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Actor is inside its invulnerability window
    Invulnerable,
    /// Actor already left play
    Inactive,
}

/// Result of resolving a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Nothing happened
    Ignored(IgnoreReason),
    /// Damage applied, actor survives
    Damaged {
        /// Remaining health
        remaining: i32,
    },
    /// Damage applied, actor defeated and deactivated
    Defeated,
}

/// Applies a hit to an actor.
///
/// Accepted hits reduce health, open an invulnerability window and knock the
/// actor away from the attacker. The caller schedules the window's end and
/// pushes the visual and HUD side effects.
pub fn resolve_hit(actor: &mut Actor, hit: &Hit, knockback: &Knockback) -> HitOutcome {
    if !actor.is_active() {
        return HitOutcome::Ignored(IgnoreReason::Inactive);
    }
    if actor.is_invulnerable() {
        return HitOutcome::Ignored(IgnoreReason::Invulnerable);
    }

    let change = match actor.take_damage(hit.damage) {
        Ok(change) => change,
        Err(_) => return HitOutcome::Ignored(IgnoreReason::Inactive),
    };
    debug!(
        "{} {} hit by {:?} for {} ({} -> {})",
        actor.kind.display_name(),
        actor.id,
        hit.source,
        hit.damage,
        change.before,
        change.after
    );

    if change.after == 0 {
        actor.deactivate();
        return HitOutcome::Defeated;
    }

    actor.begin_invulnerability();
    let away = if actor.body.position.x < hit.origin.x { -1.0 } else { 1.0 };
    actor.body.velocity = Vec2::new(away * knockback.horizontal, knockback.vertical);
    HitOutcome::Damaged {
        remaining: change.after,
    }
}

/// Fires once when every game-over-relevant actor is down.
#[derive(Debug, Clone, Default)]
pub struct GameOverLatch {
    fired: bool,
}

impl GameOverLatch {
    /// Creates an unfired latch.
    #[must_use]
    pub const fn new() -> Self {
        Self { fired: false }
    }

    /// Returns true exactly once, the first time all heroes are inactive.
    pub fn check<'a>(&mut self, actors: impl IntoIterator<Item = &'a Actor>) -> bool {
        if self.fired {
            return false;
        }
        let mut heroes = actors
            .into_iter()
            .filter(|actor| actor.kind.counts_for_game_over())
            .peekable();
        if heroes.peek().is_none() {
            return false;
        }
        if heroes.all(|actor| !actor.is_active()) {
            self.fired = true;
            return true;
        }
        false
    }

    /// Whether the signal already fired.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_common::{EntityId, SpriteHandle};

    fn actor(raw: u64, kind: ActorKind, health: i32) -> Actor {
        Actor::new(EntityId::from_raw(raw), kind, SpriteHandle::new(raw), Vec2::new(100.0, 450.0), 100)
            .with_health(health)
    }

    fn pig_hit(damage: i32, x: f32) -> Hit {
        Hit::new(DamageSource::Enemy(EnemyType::AngryPig), damage, Vec2::new(x, 450.0))
    }

    #[test]
    fn test_hit_applies_damage_and_knockback() {
        let mut player = actor(1, ActorKind::Player, 100);
        let outcome = resolve_hit(&mut player, &pig_hit(20, 150.0), &Knockback::default());
        assert_eq!(outcome, HitOutcome::Damaged { remaining: 80 });
        assert!(player.is_invulnerable());
        assert_eq!(player.body.velocity, Vec2::new(-200.0, -100.0));
    }

    #[test]
    fn test_knockback_points_away_from_attacker() {
        let mut player = actor(1, ActorKind::Player, 100);
        resolve_hit(&mut player, &pig_hit(10, 20.0), &Knockback::default());
        assert!(player.body.velocity.x > 0.0);
    }

    #[test]
    fn test_invulnerable_ignores_hit() {
        let mut player = actor(1, ActorKind::Player, 100);
        resolve_hit(&mut player, &pig_hit(20, 150.0), &Knockback::default());
        let outcome = resolve_hit(&mut player, &pig_hit(20, 150.0), &Knockback::default());
        assert_eq!(outcome, HitOutcome::Ignored(IgnoreReason::Invulnerable));
        assert_eq!(player.health(), 80);
    }

    #[test]
    fn test_lethal_hit_deactivates() {
        let mut companion = actor(2, ActorKind::Companion, 100);
        let outcome = resolve_hit(&mut companion, &pig_hit(100, 150.0), &Knockback::default());
        assert_eq!(outcome, HitOutcome::Defeated);
        assert!(!companion.is_active());
        let again = resolve_hit(&mut companion, &pig_hit(100, 150.0), &Knockback::default());
        assert_eq!(again, HitOutcome::Ignored(IgnoreReason::Inactive));
    }

    #[test]
    fn test_windows_per_role() {
        let windows = InvulnerabilityWindows::default();
        assert_eq!(windows.for_kind(ActorKind::Player), 1000);
        assert_eq!(windows.for_kind(ActorKind::Helper), 1200);
    }

    #[test]
    fn test_game_over_latch_fires_once() {
        let mut player = actor(1, ActorKind::Player, 100);
        let mut companion = actor(2, ActorKind::Companion, 100);
        let helper = actor(3, ActorKind::Helper, 100);
        let mut latch = GameOverLatch::new();

        player.deactivate();
        assert!(!latch.check([&player, &companion, &helper]));
        companion.deactivate();
        assert!(latch.check([&player, &companion, &helper]));
        assert!(!latch.check([&player, &companion, &helper]));
        assert!(latch.has_fired());
    }

    #[test]
    fn test_helper_alone_does_not_end_game() {
        let mut helper = actor(3, ActorKind::Helper, 100);
        helper.deactivate();
        let mut latch = GameOverLatch::new();
        assert!(!latch.check([&helper]));
    }
}
