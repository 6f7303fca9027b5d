//! Enemy behavior state machine.
//!
//! One call per enemy per frame. The function only mutates the enemy record
//! and reports what happened; the session turns the report into damage,
//! animations, timers and events.

use glam::Vec2;
use quincena_common::{signum_or_zero, EntityId, Facing};
use tracing::trace;

use crate::archetype::ArchetypeStats;
use crate::enemy::{AnimationCue, Enemy, EnemyState, Movement, POST_TOLERANCE};
use crate::error::{GameplayError, GameplayResult};
use crate::range::RangeBand;
use crate::target::TargetLock;

/// Steering gain used by flyers to home onto their path waypoint.
const FLIGHT_STEERING: f32 = 4.0;

/// Per-tick inputs for one enemy.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Current time (ms)
    pub now: u64,
    /// Frame delta (seconds)
    pub dt: f32,
    /// Archetype of the enemy
    pub stats: &'a ArchetypeStats,
    /// Nearest active target, if any
    pub target: Option<TargetLock>,
}

/// A strike that should land on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackCommand {
    /// Entity being struck
    pub target: EntityId,
    /// Damage to apply
    pub damage: i32,
}

/// What a tick did to an enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// State before the tick
    pub previous: EnemyState,
    /// State after the tick
    pub state: EnemyState,
    /// Strike started this tick
    pub attack: Option<AttackCommand>,
    /// New animation, only when it changed
    pub animation: Option<AnimationCue>,
    /// New facing, only when it changed
    pub facing: Option<Facing>,
    /// A hop was triggered
    pub jumped: bool,
}

impl TickOutcome {
    /// True if the state changed.
    #[must_use]
    pub fn state_changed(&self) -> bool {
        self.previous != self.state
    }
}

/// Runs one decision step for an enemy.
pub fn tick_enemy(
    enemy: &mut Enemy,
    input: &TickInput<'_>,
    rng: &mut fastrand::Rng,
) -> GameplayResult<TickOutcome> {
    if !enemy.is_active() {
        return Err(GameplayError::StaleReference(enemy.id));
    }

    let previous = enemy.state;
    let previous_cue = enemy.cue;
    let previous_facing = enemy.facing;
    let mut attack = None;
    let mut jumped = false;

    match input.target {
        None => {
            enemy.current_target = None;
            enemy.is_attacking = false;
            patrol(enemy, input);
        },
        Some(target) => {
            enemy.current_target = Some(target.id);
            enemy.facing = Facing::towards(enemy.body.position.x, target.position.x);

            if enemy.is_attacking {
                hold(enemy);
                enemy.state = EnemyState::Attack;
                enemy.cue = AnimationCue::Attack;
            } else {
                let band = input
                    .stats
                    .ranges
                    .classify(target.distance, enemy.state.is_engaged());
                match band {
                    RangeBand::Attack if input.now > enemy.attack_cooldown => {
                        attack = Some(start_attack(enemy, input, target.id));
                    },
                    RangeBand::Attack => {
                        hold(enemy);
                        enemy.state = EnemyState::Cooldown;
                        enemy.cue = AnimationCue::Idle;
                    },
                    RangeBand::Chase => {
                        jumped = chase(enemy, input, &target, rng);
                    },
                    RangeBand::Patrol => {
                        enemy.current_target = None;
                        patrol(enemy, input);
                    },
                }
            }
        },
    }

    enemy.is_chasing = enemy.state == EnemyState::Chase;

    let outcome = TickOutcome {
        previous,
        state: enemy.state,
        attack,
        animation: (enemy.cue != previous_cue || attack.is_some()).then_some(enemy.cue),
        facing: (enemy.facing != previous_facing).then_some(enemy.facing),
        jumped,
    };
    if outcome.state_changed() {
        trace!(
            "{} {} {:?} -> {:?}",
            enemy.enemy_type.tag(),
            enemy.id,
            previous,
            enemy.state
        );
    }
    Ok(outcome)
}

fn hold(enemy: &mut Enemy) {
    if enemy.body.gravity {
        enemy.body.halt_x();
    } else {
        enemy.body.halt();
    }
}

fn start_attack(enemy: &mut Enemy, input: &TickInput<'_>, target: EntityId) -> AttackCommand {
    hold(enemy);
    enemy.state = EnemyState::Attack;
    enemy.is_attacking = true;
    enemy.attack_cooldown = input.now + input.stats.cooldown_ms();
    enemy.last_attack_at = Some(input.now);
    enemy.cue = AnimationCue::Attack;
    AttackCommand {
        target,
        damage: enemy.damage,
    }
}

fn chase(enemy: &mut Enemy, input: &TickInput<'_>, target: &TargetLock, rng: &mut fastrand::Rng) -> bool {
    let stats = input.stats;
    let speed = stats.chase_speed();
    enemy.state = EnemyState::Chase;
    enemy.cue = AnimationCue::Moving;

    if !enemy.body.gravity {
        let heading = (target.position - enemy.body.position).normalize_or_zero();
        enemy.body.velocity = heading * speed;
        return false;
    }

    let dx = target.position.x - enemy.body.position.x;
    enemy.body.velocity.x = signum_or_zero(dx) * speed;

    let may_hop = enemy.is_aggressive
        && stats.jump_chance > 0.0
        && enemy.body.grounded
        && target.distance < stats.close_range;
    if may_hop && rng.f32() < stats.jump_chance {
        enemy.body.velocity.y = stats.jump_velocity;
        return true;
    }
    false
}

fn patrol(enemy: &mut Enemy, input: &TickInput<'_>) {
    let speed = input.stats.patrol_speed;
    enemy.state = EnemyState::Patrol;

    match &mut enemy.movement {
        Movement::Patrol(route) => {
            route.step(enemy.body.position.x);
            enemy.body.velocity.x = route.direction * speed;
            enemy.facing = Facing::from_sign(route.direction);
            enemy.cue = AnimationCue::Moving;
        },
        Movement::Flight(path) => {
            let waypoint = path.advance(input.dt, speed);
            let steer = (waypoint - enemy.body.position) * FLIGHT_STEERING;
            let limit = input.stats.chase_speed().max(speed);
            enemy.body.velocity = steer.clamp_length_max(limit);
            if enemy.body.velocity.x.abs() > f32::EPSILON {
                enemy.facing = Facing::from_sign(enemy.body.velocity.x);
            }
            enemy.cue = AnimationCue::Moving;
        },
        Movement::Stationary { anchor_x } => {
            let offset = *anchor_x - enemy.body.position.x;
            if offset.abs() > POST_TOLERANCE {
                enemy.body.velocity.x = signum_or_zero(offset) * speed;
                enemy.facing = Facing::from_sign(offset);
                enemy.cue = AnimationCue::Moving;
            } else {
                enemy.body.velocity.x = 0.0;
                enemy.cue = AnimationCue::Idle;
            }
        },
    }
}

/// Target lock at `position` measured from `enemy`.
#[must_use]
pub fn lock_on(enemy: &Enemy, id: EntityId, position: Vec2) -> TargetLock {
    TargetLock {
        id,
        position,
        distance: enemy.body.distance_to(position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::{ArchetypeTable, EnemyType};
    use crate::enemy::EnemySpawn;
    use proptest::prelude::*;
    use quincena_common::SpriteHandle;

    const HERO: EntityId = EntityId::from_raw(1);

    fn enemy(enemy_type: EnemyType, x: f32) -> (Enemy, ArchetypeStats) {
        let table = ArchetypeTable::builtin();
        let stats = table.get(enemy_type).expect("stats").clone();
        let spawn = EnemySpawn::new(enemy_type, Vec2::new(x, 400.0));
        let mut enemy = Enemy::spawn(EntityId::from_raw(50), SpriteHandle::new(50), &spawn, &stats);
        enemy.body.grounded = true;
        (enemy, stats)
    }

    fn tick(enemy: &mut Enemy, stats: &ArchetypeStats, now: u64, target_x: Option<f32>) -> TickOutcome {
        let mut rng = fastrand::Rng::with_seed(7);
        let target = target_x.map(|x| lock_on(enemy, HERO, Vec2::new(x, 400.0)));
        let input = TickInput {
            now,
            dt: 1.0 / 60.0,
            stats,
            target,
        };
        tick_enemy(enemy, &input, &mut rng).expect("active enemy")
    }

    #[test]
    fn test_patrols_without_target() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        let outcome = tick(&mut pig, &stats, 1000, None);
        assert_eq!(outcome.state, EnemyState::Patrol);
        assert!((pig.body.velocity.x.abs() - stats.patrol_speed).abs() < 1e-4);
        assert!(pig.current_target.is_none());
    }

    #[test]
    fn test_detects_then_chases() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        let outcome = tick(&mut pig, &stats, 1000, Some(650.0));
        assert_eq!(outcome.state, EnemyState::Chase);
        assert!(outcome.state_changed());
        assert!((pig.body.velocity.x - stats.chase_speed()).abs() < 1e-4);
        assert_eq!(pig.facing, Facing::Right);
        assert!(pig.is_chasing);
    }

    #[test]
    fn test_hysteresis_keeps_chase() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        tick(&mut pig, &stats, 1000, Some(650.0));
        // Between detection (200) and chase (300)
        let outcome = tick(&mut pig, &stats, 1016, Some(750.0));
        assert_eq!(outcome.state, EnemyState::Chase);
        let outcome = tick(&mut pig, &stats, 1032, Some(900.0));
        assert_eq!(outcome.state, EnemyState::Patrol);
    }

    #[test]
    fn test_idle_enemy_ignores_gap_target() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        let outcome = tick(&mut pig, &stats, 1000, Some(750.0));
        assert_eq!(outcome.state, EnemyState::Patrol);
    }

    #[test]
    fn test_attack_then_cooldown() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        let outcome = tick(&mut pig, &stats, 1000, Some(540.0));
        assert_eq!(outcome.state, EnemyState::Attack);
        assert_eq!(
            outcome.attack,
            Some(AttackCommand {
                target: HERO,
                damage: pig.damage
            })
        );
        assert_eq!(pig.attack_cooldown, 1000 + stats.cooldown_ms());
        assert_eq!(pig.body.velocity.x, 0.0);

        // Animation still running: hold
        let outcome = tick(&mut pig, &stats, 1100, Some(540.0));
        assert_eq!(outcome.state, EnemyState::Attack);
        assert!(outcome.attack.is_none());

        pig.finish_attack();
        let outcome = tick(&mut pig, &stats, 1600, Some(540.0));
        assert_eq!(outcome.state, EnemyState::Cooldown);
        assert!(outcome.attack.is_none());

        let outcome = tick(&mut pig, &stats, 1000 + stats.cooldown_ms() + 1, Some(540.0));
        assert!(outcome.attack.is_some());
    }

    #[test]
    fn test_cooldown_to_chase_when_target_backs_off() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        tick(&mut pig, &stats, 1000, Some(540.0));
        pig.finish_attack();
        tick(&mut pig, &stats, 1200, Some(540.0));
        let outcome = tick(&mut pig, &stats, 1300, Some(700.0));
        assert_eq!(outcome.state, EnemyState::Chase);
    }

    #[test]
    fn test_flyer_chases_in_two_dimensions() {
        let (mut bird, stats) = enemy(EnemyType::Bluebird, 500.0);
        let mut rng = fastrand::Rng::with_seed(1);
        let target = lock_on(&bird, HERO, Vec2::new(600.0, 500.0));
        let input = TickInput {
            now: 1000,
            dt: 1.0 / 60.0,
            stats: &stats,
            target: Some(target),
        };
        let outcome = tick_enemy(&mut bird, &input, &mut rng).expect("active");
        assert_eq!(outcome.state, EnemyState::Chase);
        assert!(bird.body.velocity.x > 0.0 && bird.body.velocity.y > 0.0);
        assert!((bird.body.velocity.length() - stats.chase_speed()).abs() < 1e-3);
    }

    #[test]
    fn test_stationary_guard_returns_to_post() {
        let (mut rino, stats) = enemy(EnemyType::Rino, 1300.0);
        rino.body.position.x = 1400.0;
        tick(&mut rino, &stats, 1000, None);
        assert!(rino.body.velocity.x < 0.0);
        rino.body.position.x = 1302.0;
        let outcome = tick(&mut rino, &stats, 1016, None);
        assert_eq!(rino.body.velocity.x, 0.0);
        assert_eq!(outcome.animation, Some(AnimationCue::Idle));
    }

    #[test]
    fn test_inactive_enemy_is_stale() {
        let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
        pig.deactivate();
        let mut rng = fastrand::Rng::with_seed(1);
        let input = TickInput {
            now: 1000,
            dt: 1.0 / 60.0,
            stats: &stats,
            target: None,
        };
        assert!(tick_enemy(&mut pig, &input, &mut rng).is_err());
    }

    #[test]
    fn test_aggressive_hop_only_when_close_and_grounded() {
        let (mut pig, mut stats) = enemy(EnemyType::AngryPig, 500.0);
        stats.jump_chance = 1.0;
        // Chase band but outside close range: no hop
        let outcome = tick(&mut pig, &stats, 1000, Some(690.0));
        assert!(!outcome.jumped);
        // Close and grounded: hop
        let outcome = tick(&mut pig, &stats, 1016, Some(600.0));
        assert!(outcome.jumped);
        assert_eq!(pig.body.velocity.y, stats.jump_velocity);
        // Airborne: no hop
        pig.body.grounded = false;
        let outcome = tick(&mut pig, &stats, 1032, Some(600.0));
        assert!(!outcome.jumped);
    }

    proptest! {
        #[test]
        fn prop_attacks_respect_cooldown(steps in proptest::collection::vec(1u64..400, 1..200)) {
            let (mut pig, stats) = enemy(EnemyType::AngryPig, 500.0);
            let mut now = 1000u64;
            let mut attacks = Vec::new();
            for step in steps {
                now += step;
                let outcome = tick(&mut pig, &stats, now, Some(530.0));
                if outcome.attack.is_some() {
                    attacks.push(now);
                }
                if now >= pig.last_attack_at.unwrap_or(0) + stats.attack_animation_ms {
                    pig.finish_attack();
                }
            }
            for pair in attacks.windows(2) {
                prop_assert!(pair[1] - pair[0] >= stats.cooldown_ms());
            }
        }
    }
}
