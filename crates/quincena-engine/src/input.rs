//! Scripted input for the player and companion.
//!
//! The player walks right, hops for coins overhead and swings at anything in
//! reach. The companion trails the player and does the same, or takes over
//! the walk once the player is down.

use glam::Vec2;
use quincena_common::Facing;
use quincena_gameplay::{ActorKind, Host, LevelSession, PickupKind};
use tracing::{debug, trace};

use crate::config::{EngineConfig, InputMode};

/// Gap the companion keeps behind the player (px).
const TRAIL_GAP: f32 = 40.0;
/// Horizontal slack before the companion moves (px).
const TRAIL_SLACK: f32 = 8.0;
/// Horizontal window for jumping at a coin (px).
const COIN_WINDOW: f32 = 16.0;
/// How far above the hero a coin must be to jump for it (px).
const COIN_CLEARANCE: f32 = 20.0;

/// Per-frame hero driver.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedInput {
    mode: InputMode,
    walk_speed: f32,
    jump_velocity: f32,
}

impl ScriptedInput {
    /// Driver configured from the engine settings.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            mode: config.input,
            walk_speed: config.walk_speed,
            jump_velocity: config.jump_velocity,
        }
    }

    /// Sets hero velocities and triggers attacks for this frame.
    pub fn drive(&self, session: &mut LevelSession, now: u64, host: &mut impl Host) {
        for kind in [ActorKind::Player, ActorKind::Companion] {
            let Some(plan) = self.plan(session, kind) else {
                continue;
            };
            if let Some(actor) = session.actor_mut(kind) {
                actor.body.velocity.x = plan.velocity_x;
                actor.facing = plan.facing;
                if plan.jump && actor.body.grounded {
                    actor.body.velocity.y = self.jump_velocity;
                    actor.body.grounded = false;
                }
            }
            if plan.attack {
                match session.actor_attack(kind, now, host) {
                    Ok(0) => {},
                    Ok(hits) => debug!("{} hit {hits} enemies", kind.display_name()),
                    Err(err) => trace!("{} attack skipped: {err}", kind.display_name()),
                }
            }
        }
    }

    fn plan(&self, session: &LevelSession, kind: ActorKind) -> Option<Plan> {
        let actor = session.actor(kind).filter(|actor| actor.is_active())?;
        let position = actor.position();

        if self.mode == InputMode::Idle {
            return Some(Plan {
                velocity_x: 0.0,
                facing: actor.facing,
                jump: false,
                attack: false,
            });
        }

        let reach = session.tuning().attack_reach;
        let threat = session
            .enemies()
            .iter()
            .filter(|enemy| enemy.is_active())
            .map(|enemy| enemy.position())
            .filter(|enemy| enemy.distance(position) < reach)
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)));
        if let Some(threat) = threat {
            return Some(Plan {
                velocity_x: 0.0,
                facing: Facing::towards(position.x, threat.x),
                jump: false,
                attack: true,
            });
        }

        let leader = session
            .actor(ActorKind::Player)
            .filter(|player| kind == ActorKind::Companion && player.is_active())
            .map(|player| player.position().x - TRAIL_GAP);
        let velocity_x = match leader {
            Some(target_x) if (target_x - position.x).abs() > TRAIL_SLACK => {
                (target_x - position.x).signum() * self.walk_speed
            },
            Some(_) => 0.0,
            None => self.walk_speed,
        };

        Some(Plan {
            velocity_x,
            facing: if velocity_x.abs() < f32::EPSILON {
                actor.facing
            } else {
                Facing::from_sign(velocity_x)
            },
            jump: coin_overhead(session, position),
            attack: false,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    velocity_x: f32,
    facing: Facing,
    jump: bool,
    attack: bool,
}

fn coin_overhead(session: &LevelSession, position: Vec2) -> bool {
    session.pickups().iter().any(|pickup| {
        pickup.active
            && pickup.kind == PickupKind::Coin
            && (pickup.position.x - position.x).abs() < COIN_WINDOW
            && pickup.position.y < position.y - COIN_CLEARANCE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_gameplay::{ArchetypeTable, EnemySpawn, EnemyType, LevelId, LevelSpec, MockHost, SessionTuning};

    fn session(spec: LevelSpec) -> (LevelSession, MockHost) {
        let mut host = MockHost::new();
        let mut session = LevelSession::new(spec, ArchetypeTable::builtin(), SessionTuning::default(), None, 3)
            .expect("session");
        session.start(0, &mut host).expect("start");
        (session, host)
    }

    fn empty_level() -> LevelSpec {
        let mut spec = LevelSpec::builtin(LevelId::One);
        spec.enemies.clear();
        spec
    }

    #[test]
    fn test_player_walks_and_companion_trails() {
        let (mut session, mut host) = session(empty_level());
        let input = ScriptedInput::from_config(&EngineConfig::default());
        input.drive(&mut session, 16, &mut host);

        let player = session.actor(ActorKind::Player).expect("player");
        assert_eq!(player.body.velocity.x, 160.0);
        assert_eq!(player.facing, Facing::Right);
        // Trail point is 60, companion starts at 50
        let companion = session.actor(ActorKind::Companion).expect("companion");
        assert_eq!(companion.body.velocity.x, 160.0);
    }

    #[test]
    fn test_attacks_enemy_in_reach() {
        let mut spec = empty_level();
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, spec.player_start + Vec2::new(30.0, 0.0)).with_stats(100, 10));
        let (mut session, mut host) = session(spec);
        let input = ScriptedInput::from_config(&EngineConfig::default());
        input.drive(&mut session, 16, &mut host);

        assert_eq!(session.actor(ActorKind::Player).expect("player").body.velocity.x, 0.0);
        assert_eq!(session.enemies()[0].health(), 75);
    }

    #[test]
    fn test_idle_mode_stands_still() {
        let (mut session, mut host) = session(empty_level());
        let mut config = EngineConfig::default();
        config.input = InputMode::Idle;
        ScriptedInput::from_config(&config).drive(&mut session, 16, &mut host);
        assert_eq!(session.actor(ActorKind::Player).expect("player").body.velocity.x, 0.0);
    }
}
