//! End-to-end scenarios driving a full level session through the mock host.
//!
//! These exercise the cross-module guarantees: invulnerability between
//! hits, the single game-over signal, enemy health monotonicity and
//! cannonball cleanup without collisions.

#![cfg(test)]

use glam::Vec2;
use proptest::prelude::*;
use quincena_common::EntityId;

use crate::prelude::*;

const FRAME_MS: u64 = 16;
const FRAME_DT: f32 = 0.016;

fn empty_level(id: LevelId) -> LevelSpec {
    let mut spec = LevelSpec::builtin(id);
    spec.enemies.clear();
    spec.cannons.clear();
    spec.helper = false;
    spec
}

fn start(spec: LevelSpec, tuning: SessionTuning) -> (LevelSession, MockHost) {
    let mut host = MockHost::new();
    let mut session =
        LevelSession::new(spec, ArchetypeTable::builtin(), tuning, None, 42).expect("session should build");
    session.start(0, &mut host).expect("session should start");
    (session, host)
}

fn hero(session: &LevelSession, kind: ActorKind) -> EntityId {
    session.actor(kind).expect("hero present").id
}

/// Player-side damage and game over
mod damage_tests {
    use super::*;

    #[test]
    fn e2e_player_survives_three_spaced_hits() {
        let mut spec = empty_level(LevelId::One);
        spec.companion_start = Vec2::new(2000.0, 450.0);
        spec.enemies.push(
            EnemySpawn::new(EnemyType::AngryPig, spec.player_start + Vec2::new(40.0, 0.0)).with_stats(500, 20),
        );
        let tuning = SessionTuning {
            auto_heal_amount: 0,
            ..SessionTuning::default()
        };
        let (mut session, mut host) = start(spec, tuning);
        let player = hero(&session, ActorKind::Player);
        let pig = session.enemies()[0].id;

        let mut now = 0;
        let mut blocked = 0;
        while now < 2400 {
            now += 100;
            session.tick(now, 0.1, &mut host).expect("tick");
            if session.actor(ActorKind::Player).expect("player").is_invulnerable() {
                // Touching the pig inside the window does nothing
                let outcome = session
                    .on_actor_enemy_contact(player, pig, &mut host)
                    .expect("contact");
                assert_eq!(outcome, HitOutcome::Ignored(IgnoreReason::Invulnerable));
                blocked += 1;
            }
        }

        let player = session.actor(ActorKind::Player).expect("player");
        assert_eq!(player.health(), 40, "three hits of 20 should land");
        assert!(player.is_active());
        assert!(blocked > 0);
        let hits = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::ActorDamaged { kind: ActorKind::Player, .. }))
            .count();
        assert_eq!(hits, 3);
    }

    #[test]
    fn e2e_companion_death_after_player_fires_single_game_over() {
        let mut spec = empty_level(LevelId::One);
        spec.enemies
            .push(EnemySpawn::new(EnemyType::Rino, Vec2::new(2200.0, 450.0)).with_stats(80, 100));
        let (mut session, mut host) = start(spec, SessionTuning::default());
        let player = hero(&session, ActorKind::Player);
        let companion = hero(&session, ActorKind::Companion);
        let rino = session.enemies()[0].id;

        let first = session.on_actor_enemy_contact(player, rino, &mut host).expect("contact");
        assert_eq!(first, HitOutcome::Defeated);
        assert_eq!(host.game_overs(), 0);

        let second = session
            .on_actor_enemy_contact(companion, rino, &mut host)
            .expect("contact");
        assert_eq!(second, HitOutcome::Defeated);
        assert!(!session.actor(ActorKind::Companion).expect("companion").is_active());
        assert_eq!(session.status(), SessionStatus::GameOver);

        // Re-entrant checks stay silent
        let _ = session.on_actor_enemy_contact(companion, rino, &mut host);
        let _ = session.on_actor_enemy_contact(player, rino, &mut host);
        for step in 1..=10 {
            session.tick(step * 500, 0.5, &mut host).expect("tick");
        }

        assert_eq!(host.game_overs(), 1);
        let signals = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(signals, 1);
        assert_eq!(session.pending_timers(), 0);
    }
}

/// Level flow across sessions
mod level_tests {
    use super::*;

    #[test]
    fn e2e_level_one_completion_carries_into_level_two() {
        let mut spec = LevelSpec::builtin(LevelId::One);
        spec.enemies.clear();
        let (mut session, mut host) = start(spec, SessionTuning::default());
        let player = hero(&session, ActorKind::Player);
        let coins: Vec<_> = session
            .pickups()
            .iter()
            .filter(|p| p.kind == PickupKind::Coin)
            .map(|p| p.id)
            .collect();

        for coin in coins {
            session.on_pickup(player, coin, &mut host).expect("coin");
        }
        assert_eq!(session.status(), SessionStatus::Completing);

        let mut now = 0;
        while !session.status().is_finished() && now < 10_000 {
            now += FRAME_MS;
            session.tick(now, FRAME_DT, &mut host).expect("tick");
        }
        assert_eq!(host.level_completions(), 1);
        assert!(now >= 5000);

        let payload = session.state().payload();
        assert_eq!(payload.coins_collected, 4);
        assert_eq!(payload.score, 400);
        session.teardown();

        let next = LevelSession::new(
            LevelSpec::builtin(LevelId::Two),
            ArchetypeTable::builtin(),
            SessionTuning::default(),
            Some(&payload),
            42,
        )
        .expect("level two");
        assert_eq!(next.state().coins_collected, 0);
        assert_eq!(next.state().score, 400);
        assert_eq!(next.helper_phase(), HelperPhase::Waiting);
    }

    #[test]
    fn e2e_helper_joins_and_follows_player() {
        let mut spec = empty_level(LevelId::Two);
        spec.helper = true;
        let (mut session, mut host) = start(spec, SessionTuning::default());
        assert!(session.begin_helper_entry(0));

        // The session does not integrate positions; emulate the host
        let mut now = 0;
        while now < 20_000 {
            now += FRAME_MS;
            session.tick(now, FRAME_DT, &mut host).expect("tick");
            if let Some(helper) = session.actor_mut(ActorKind::Helper) {
                let velocity = helper.body.velocity;
                helper.body.position.x += velocity.x * FRAME_DT;
            }
        }

        assert_eq!(session.helper_phase(), HelperPhase::Following);
        let helper = session.actor(ActorKind::Helper).expect("helper").position();
        let player = session.actor(ActorKind::Player).expect("player").position();
        let gap = (player.x - helper.x).abs();
        assert!((gap - 70.0).abs() < 5.0, "helper should settle near follow distance, gap {gap}");
    }

    #[test]
    fn e2e_helper_wedged_against_wall_hops_and_pushes() {
        const WALL_X: f32 = 600.0;
        let mut spec = empty_level(LevelId::Two);
        spec.helper = true;
        spec.player_start = Vec2::new(WALL_X + 100.0, 450.0);
        let (mut session, mut host) = start(spec, SessionTuning::default());
        let params = session.tuning().follow;
        assert!(session.begin_helper_entry(0));

        let mut wedged = None;
        let mut now = 0;
        while wedged.is_none() && now < 15_000 {
            now += FRAME_MS;
            session.tick(now, FRAME_DT, &mut host).expect("tick");
            let phase = session.helper_phase();
            let helper = session.actor_mut(ActorKind::Helper).expect("helper");
            if phase == HelperPhase::Following && helper.body.blocked_right {
                wedged = Some(helper.body.velocity);
                break;
            }

            // Host side: flat ground with a wall the helper cannot pass
            let velocity_x = helper.body.velocity.x;
            helper.body.position.x += velocity_x * FRAME_DT;
            helper.body.velocity.y = 0.0;
            helper.body.grounded = true;
            helper.body.blocked_right = helper.body.position.x >= WALL_X;
            if helper.body.blocked_right {
                helper.body.position.x = WALL_X;
                helper.body.velocity.x = 0.0;
            }
        }

        let velocity = wedged.expect("helper should reach the wall while following");
        assert_eq!(velocity.y, params.jump_velocity);
        let expected = desired_speed(100.0, &params) * params.lerp + params.unstick_push;
        assert!((velocity.x - expected).abs() < 1e-3, "expected push to {expected}, got {}", velocity.x);
    }
}

/// Projectiles
mod cannon_tests {
    use super::*;

    #[test]
    fn e2e_ball_retired_after_lifespan_without_collisions() {
        let mut spec = empty_level(LevelId::Three);
        spec.player_start = Vec2::new(1000.0, 250.0);
        spec.cannons = LevelSpec::builtin(LevelId::Three).cannons;
        let (mut session, mut host) = start(spec, SessionTuning::default());

        let mut now = 0;
        let mut first_ball = None;
        while first_ball.is_none() && now < 10_000 {
            now += FRAME_MS;
            session.tick(now, FRAME_DT, &mut host).expect("tick");
            first_ball = session.balls().first().map(|b| (b.id, b.birth_time, b.lifespan_ms));
        }
        let (ball, born, lifespan) = first_ball.expect("cannon should fire");
        assert_eq!(session.balls()[0].velocity.x, -300.0);

        while now <= born + lifespan + FRAME_MS {
            now += FRAME_MS;
            session.tick(now, FRAME_DT, &mut host).expect("tick");
        }
        assert!(session.balls().iter().all(|b| b.id != ball));
        assert!(session
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::CannonBallExploded { ball: id, .. } if *id == ball)));
    }
}

proptest! {
    #[test]
    fn e2e_enemy_health_never_recovers(
        gaps in prop::collection::vec(50u64..800, 1..40),
    ) {
        let mut spec = empty_level(LevelId::One);
        spec.enemies.push(
            EnemySpawn::new(EnemyType::Skeleton, spec.player_start + Vec2::new(50.0, 0.0)).with_stats(200, 5),
        );
        let tuning = SessionTuning {
            auto_heal_amount: 0,
            ..SessionTuning::default()
        };
        let (mut session, mut host) = start(spec, tuning);

        let mut now = 0;
        let mut last_health = session.enemies()[0].health();
        let mut was_active = true;
        for gap in gaps {
            now += gap;
            session.tick(now, gap as f32 / 1000.0, &mut host).expect("tick");
            if session.status() != SessionStatus::Running {
                break;
            }
            let _ = session.actor_attack(ActorKind::Player, now, &mut host);

            let enemy = &session.enemies()[0];
            prop_assert!(enemy.health() <= last_health);
            prop_assert!(was_active || !enemy.is_active());
            if enemy.health() == 0 {
                prop_assert!(!enemy.is_active());
            }
            last_health = enemy.health();
            was_active = enemy.is_active();
        }
    }
}
