//! Headless game driver.
//!
//! Runs levels back to back on a fixed-step clock: scripted input, session
//! tick, arcade physics, then contact dispatch. A level ends when the session
//! hands a transition to the host or the time limit runs out.

use anyhow::Context;
use quincena_gameplay::{GameEvent, LevelId, LevelPayload, LevelSession, LevelSpec};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::host::{HeadlessHost, LevelOutcome};
use crate::input::ScriptedInput;
use crate::timing::FrameTiming;
use crate::world::{ArcadeWorld, Contact};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The last level was completed
    GameComplete,
    /// Both heroes went down
    GameOver,
    /// The time limit elapsed first
    TimedOut,
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Level being played when the run ended
    pub level: u8,
    /// Simulated time (ms)
    pub elapsed_ms: u64,
    /// Fixed steps taken
    pub steps: u64,
    /// Final progress
    pub payload: LevelPayload,
}

/// Per-run collaborators shared by every level.
struct Driver<'a> {
    config: &'a EngineConfig,
    input: ScriptedInput,
    timing: FrameTiming,
    deadline: Option<u64>,
}

/// Plays from the configured start level until completion, game over or the
/// time limit.
pub fn run(config: &EngineConfig) -> anyhow::Result<RunSummary> {
    let archetypes = config.archetypes().context("loading archetypes")?;
    let tuning = config.session_tuning();
    let mut level = config.start_level()?;
    let mut carry: Option<LevelPayload> = None;

    let mut driver = Driver {
        config,
        input: ScriptedInput::from_config(config),
        timing: FrameTiming::new(config.target_fps).with_fixed_dt(config.fixed_dt),
        deadline: config.duration_ms(),
    };

    loop {
        let spec = LevelSpec::builtin(level);
        let seed = config.seed.wrapping_add(u64::from(level.number()));
        let mut session = LevelSession::new(spec, archetypes.clone(), tuning, carry.as_ref(), seed)
            .with_context(|| format!("building level {}", level.number()))?;
        let mut host = HeadlessHost::new(&archetypes);

        info!(
            "Level {} start: {} enemies, {} cannons, {} coins",
            level.number(),
            session.enemies().len(),
            session.cannons().len(),
            session.spec().total_coins()
        );

        let outcome = driver.play_level(&mut session, &mut host)?;
        let cancelled = session.teardown();
        debug!(
            "Level {} torn down, {cancelled} timers cancelled, {} camera shakes, HUD {:?}",
            level.number(),
            host.shakes(),
            host.hud()
        );

        let (outcome, payload) = match outcome {
            Some(LevelOutcome::Complete(payload)) => match level.next() {
                Some(next) => {
                    carry = Some(payload);
                    level = next;
                    continue;
                },
                None => (RunOutcome::GameComplete, payload),
            },
            Some(LevelOutcome::GameOver(payload)) => (RunOutcome::GameOver, payload),
            None => (RunOutcome::TimedOut, session.state().payload()),
        };

        return Ok(driver.summary(outcome, level, payload));
    }
}

impl Driver<'_> {
    /// Runs one level. Returns `None` if the time limit hit first.
    fn play_level(
        &mut self,
        session: &mut LevelSession,
        host: &mut HeadlessHost,
    ) -> anyhow::Result<Option<LevelOutcome>> {
        let world = ArcadeWorld::new(self.config.gravity, self.config.ground_y, *session.bounds());
        let dt = self.timing.fixed_dt();

        session.start(self.timing.now_ms(), host)?;
        if session.begin_helper_entry(self.timing.now_ms()) {
            debug!("Helper entry scheduled");
        }

        loop {
            let steps = if self.config.realtime {
                let frame_dt = self.timing.delta_time();
                self.timing.accumulate(frame_dt)
            } else {
                1
            };

            for _ in 0..steps {
                let now = self.timing.advance();

                self.input.drive(session, now, host);
                session.tick(now, dt, host)?;
                world.step(session, dt);
                for contact in world.contacts(session) {
                    dispatch(session, contact, host);
                }
                log_events(session.drain_events());

                if let Some(outcome) = host.take_outcome() {
                    return Ok(Some(outcome));
                }
                if self.deadline.is_some_and(|deadline| now >= deadline) {
                    info!("Time limit reached at {now}ms");
                    return Ok(None);
                }
            }

            if self.config.realtime {
                self.timing.sleep_remainder();
            }
        }
    }

    fn summary(&self, outcome: RunOutcome, level: LevelId, payload: LevelPayload) -> RunSummary {
        RunSummary {
            outcome,
            level: level.number(),
            elapsed_ms: self.timing.now_ms(),
            steps: self.timing.steps(),
            payload,
        }
    }
}

/// Routes one overlap to its session callback. Stale references are normal
/// here since an earlier contact in the same frame may have removed the body.
fn dispatch(session: &mut LevelSession, contact: Contact, host: &mut HeadlessHost) {
    let result = match contact {
        Contact::ActorEnemy { actor, enemy } => session.on_actor_enemy_contact(actor, enemy, host).map(drop),
        Contact::ActorCannon { actor, cannon } => session.on_actor_cannon_contact(actor, cannon, host).map(drop),
        Contact::ActorBall { actor, ball } => session.on_actor_ball_contact(actor, ball, host).map(drop),
        Contact::BallGround { ball } => session.on_ball_platform_contact(ball, host).map(drop),
        Contact::Pickup { actor, pickup } => session.on_pickup(actor, pickup, host),
    };
    if let Err(err) = result {
        debug!("Contact {:?} dropped: {err}", contact);
    }
}

fn log_events(events: Vec<GameEvent>) {
    for event in events {
        match event {
            GameEvent::EnemyStateChanged { enemy, from, to } => {
                debug!("Enemy {:?}: {:?} -> {:?}", enemy, from, to);
            },
            GameEvent::CannonFired { cannon, ball } => debug!("Cannon {:?} fired {:?}", cannon, ball),
            GameEvent::CannonBallExploded { ball, position } => debug!("Ball {:?} exploded at {position}", ball),
            GameEvent::ActorDamaged {
                kind,
                damage,
                remaining,
                ..
            } => info!("{} took {damage} damage, {remaining} left", kind.display_name()),
            GameEvent::ActorDefeated { kind, .. } => warn!("{} is down", kind.display_name()),
            GameEvent::EnemyDefeated { enemy_type, .. } => info!("{:?} defeated", enemy_type),
            GameEvent::BossDefeated { silenced, .. } => info!("Boss defeated, {silenced} skeletons silenced"),
            GameEvent::CoinCollected { collected, total } => info!("Coin {collected}/{total}"),
            GameEvent::LevelComplete { payload } => info!("All coins collected: {:?}", payload),
            GameEvent::GameOver { payload } => info!("Game over: {:?}", payload),
        }
    }
}
