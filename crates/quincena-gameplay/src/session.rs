//! Level session: owns every gameplay record of one level instance and runs
//! the per-frame tick.
//!
//! Tick order is fixed: due timers, enemy AI (target resolution, state
//! transition, velocity and animation), helper follow, projectile retirement,
//! boss health push. The host integrates physics after `tick` returns and
//! reports overlaps through the `on_*` callbacks.

use glam::Vec2;
use quincena_common::{EntityId, Facing, IdAllocator, SpriteHandle, WorldBounds};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actor::{Actor, ActorKind};
use crate::archetype::ArchetypeTable;
use crate::behavior::{tick_enemy, TickInput};
use crate::cannon::{BallFate, Cannon, CannonBall, CannonPose, CannonTuning, Explosion};
use crate::combat::{resolve_hit, DamageSource, GameOverLatch, Hit, HitOutcome, IgnoreReason, InvulnerabilityWindows, Knockback};
use crate::companion::{pick_follow_target, update_follow, FollowAnimation, FollowParams};
use crate::enemy::{AnimationCue, Enemy, EnemyHit};
use crate::error::{GameplayError, GameplayResult};
use crate::events::{EventBus, GameEvent};
use crate::game_state::{GameState, LevelPayload};
use crate::hooks::{play_with_fallback, Host, Presenter};
use crate::level::LevelSpec;
use crate::target::find_closest_target;
use crate::timers::{FiredTimer, TimerAction, TimerRegistry};

/// Tint applied while an actor is invulnerable.
pub const HIT_TINT: u32 = 0xFF0000;

/// Helper run animation.
pub const HELPER_RUN_ANIMATION: &str = "motocle_run_anim";
/// Helper idle animation.
pub const HELPER_IDLE_ANIMATION: &str = "motocle_quieto2_anim";

/// Session-wide constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Invulnerability windows per role
    pub invulnerability: InvulnerabilityWindows,
    /// Knockback on hit
    pub knockback: Knockback,
    /// Helper follow parameters
    pub follow: FollowParams,
    /// Cannon parameters
    pub cannon: CannonTuning,
    /// Player max health
    pub player_max_health: i32,
    /// Companion max health
    pub companion_max_health: i32,
    /// Helper max health
    pub helper_max_health: i32,
    /// Health regained per auto-heal pulse
    pub auto_heal_amount: i32,
    /// Auto-heal interval (ms)
    pub auto_heal_interval_ms: u64,
    /// Delay between level completion and the scene transition (ms)
    pub completion_delay_ms: u64,
    /// Delay before the helper enters (ms)
    pub helper_entry_delay_ms: u64,
    /// Helper run-in speed (px/s)
    pub helper_entry_speed: f32,
    /// Hero melee reach (px)
    pub attack_reach: f32,
    /// Hero attack cooldown (ms)
    pub attack_cooldown_ms: u64,
    /// Hero attack damage
    pub attack_damage: i32,
    /// Points per enemy killed
    pub kill_points: u32,
    /// Bonus for killing the boss
    pub boss_bonus: u32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            invulnerability: InvulnerabilityWindows::default(),
            knockback: Knockback::default(),
            follow: FollowParams::default(),
            cannon: CannonTuning::default(),
            player_max_health: 100,
            companion_max_health: 100,
            helper_max_health: 200,
            auto_heal_amount: 2,
            auto_heal_interval_ms: 2000,
            completion_delay_ms: 5000,
            helper_entry_delay_ms: 3000,
            helper_entry_speed: 124.0,
            attack_reach: 70.0,
            attack_cooldown_ms: 400,
            attack_damage: 25,
            kill_points: 100,
            boss_bonus: 1000,
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Created, `start` not yet called
    Idle,
    /// Level in play
    Running,
    /// All coins collected, waiting for the transition delay
    Completing,
    /// Transition delivered to the scene director
    Complete,
    /// Both heroes down
    GameOver,
    /// Torn down; every call fails
    TornDown,
}

impl SessionStatus {
    /// True once nothing more will happen.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::GameOver | Self::TornDown)
    }
}

/// Where the helper is in its one-time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperPhase {
    /// No helper in this level
    Absent,
    /// Off-screen, entry not started
    Waiting,
    /// Running in to its entry mark
    Entering,
    /// Following the heroes
    Following,
}

/// Collectible kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickupKind {
    /// Worth points; all of them complete the level
    Coin,
    /// Restores health
    Potion,
}

/// A collectible placed in the level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    /// Entity ID
    pub id: EntityId,
    /// Kind
    pub kind: PickupKind,
    /// Position
    pub position: Vec2,
    /// Still on the ground
    pub active: bool,
}

/// One running level.
#[derive(Debug)]
pub struct LevelSession {
    spec: LevelSpec,
    tuning: SessionTuning,
    archetypes: ArchetypeTable,
    bounds: WorldBounds,
    ids: IdAllocator,
    actors: Vec<Actor>,
    enemies: Vec<Enemy>,
    cannons: Vec<Cannon>,
    balls: Vec<CannonBall>,
    pickups: Vec<Pickup>,
    state: GameState,
    timers: TimerRegistry,
    events: EventBus,
    rng: fastrand::Rng,
    game_over: GameOverLatch,
    status: SessionStatus,
    helper_phase: HelperPhase,
    helper_entry_started: bool,
    helper_animation: Option<FollowAnimation>,
    boss: Option<EntityId>,
    now: u64,
}

fn sprite_for(id: EntityId) -> SpriteHandle {
    SpriteHandle::new(id.raw())
}

impl LevelSession {
    /// Builds a session from a level layout.
    ///
    /// `carry` is the payload of the previous level: score, kills and player
    /// health carry over, coins start from zero.
    pub fn new(
        spec: LevelSpec,
        archetypes: ArchetypeTable,
        tuning: SessionTuning,
        carry: Option<&LevelPayload>,
        seed: u64,
    ) -> GameplayResult<Self> {
        archetypes.validate()?;
        let bounds = WorldBounds::from_size(spec.world_width, spec.world_height)?;
        let mut ids = IdAllocator::new();

        let player_health = carry.map_or(tuning.player_max_health, |payload| payload.health.max(1));
        let mut actors = Vec::with_capacity(3);
        let player_id = ids.next_id();
        actors.push(
            Actor::new(player_id, ActorKind::Player, sprite_for(player_id), spec.player_start, tuning.player_max_health)
                .with_health(player_health)
                .with_attack_damage(tuning.attack_damage),
        );
        let companion_id = ids.next_id();
        actors.push(
            Actor::new(
                companion_id,
                ActorKind::Companion,
                sprite_for(companion_id),
                spec.companion_start,
                tuning.companion_max_health,
            )
            .with_attack_damage(tuning.attack_damage),
        );
        if spec.helper {
            let helper_id = ids.next_id();
            actors.push(Actor::new(
                helper_id,
                ActorKind::Helper,
                sprite_for(helper_id),
                spec.helper_start,
                tuning.helper_max_health,
            ));
        }

        let mut enemies = Vec::with_capacity(spec.enemies.len());
        let mut boss = None;
        for spawn in &spec.enemies {
            let stats = archetypes.get(spawn.enemy_type)?;
            let id = ids.next_id();
            if spawn.enemy_type.is_boss() {
                boss = Some(id);
            }
            enemies.push(Enemy::spawn(id, sprite_for(id), spawn, stats));
        }

        let cannons = spec
            .cannons
            .iter()
            .map(|spawn| {
                let id = ids.next_id();
                Cannon::new(id, sprite_for(id), spawn)
            })
            .collect();

        let mut pickups = Vec::with_capacity(spec.coins.len() + spec.potions.len());
        for (kind, positions) in [(PickupKind::Coin, &spec.coins), (PickupKind::Potion, &spec.potions)] {
            for position in positions {
                pickups.push(Pickup {
                    id: ids.next_id(),
                    kind,
                    position: *position,
                    active: true,
                });
            }
        }

        let state = match carry {
            Some(payload) => GameState::carried_over(spec.id, spec.total_coins(), payload),
            None => GameState::new(spec.id, spec.total_coins(), player_health),
        };
        let helper_phase = if spec.helper {
            HelperPhase::Waiting
        } else {
            HelperPhase::Absent
        };

        Ok(Self {
            spec,
            tuning,
            archetypes,
            bounds,
            ids,
            actors,
            enemies,
            cannons,
            balls: Vec::new(),
            pickups,
            state,
            timers: TimerRegistry::new(),
            events: EventBus::default(),
            rng: fastrand::Rng::with_seed(seed),
            game_over: GameOverLatch::new(),
            status: SessionStatus::Idle,
            helper_phase,
            helper_entry_started: false,
            helper_animation: None,
            boss,
            now: 0,
        })
    }

    /// Starts the level: repeating timers, initial HUD state and cannon poses.
    pub fn start(&mut self, now: u64, host: &mut impl Host) -> GameplayResult<()> {
        if self.status != SessionStatus::Idle {
            return Err(GameplayError::InvalidState(format!("session already {:?}", self.status)));
        }
        self.now = now;
        self.status = SessionStatus::Running;

        self.timers
            .schedule_every(None, now, self.tuning.auto_heal_interval_ms, TimerAction::AutoHeal);
        if !self.cannons.is_empty() {
            self.timers.schedule_every(
                None,
                now,
                self.tuning.cannon.check_interval_ms,
                TimerAction::CannonCheck,
            );
        }

        for cannon in &self.cannons {
            host.set_texture(cannon.sprite, cannon.pose().texture());
            host.set_flip_x(cannon.sprite, cannon.flip_x());
        }
        for actor in &self.actors {
            if actor.kind == ActorKind::Helper {
                host.set_visible(actor.sprite, false);
            }
        }
        self.push_actor_health(ActorKind::Player, host);
        self.push_actor_health(ActorKind::Companion, host);
        host.update_score(self.state.score);
        host.update_coins(self.state.coins_collected, self.state.total_coins);
        if self.boss.is_some() {
            host.update_boss_health(1.0);
        }

        info!(
            "Level {} started: {} enemies, {} cannons, {} coins",
            self.spec.id.number(),
            self.enemies.len(),
            self.cannons.len(),
            self.state.total_coins
        );
        Ok(())
    }

    /// Starts the helper's one-time entry. Later calls in the same session do nothing.
    pub fn begin_helper_entry(&mut self, now: u64) -> bool {
        if self.helper_entry_started || self.helper_phase != HelperPhase::Waiting {
            return false;
        }
        self.helper_entry_started = true;
        let owner = self.actor(ActorKind::Helper).map(|helper| helper.id);
        self.timers
            .schedule_once(owner, now, self.tuning.helper_entry_delay_ms, TimerAction::HelperEntry);
        debug!("Helper entry scheduled");
        true
    }

    /// Runs one frame.
    pub fn tick(&mut self, now: u64, dt: f32, host: &mut impl Host) -> GameplayResult<()> {
        match self.status {
            SessionStatus::Idle => {
                return Err(GameplayError::InvalidState("session not started".to_string()));
            },
            SessionStatus::TornDown => {
                return Err(GameplayError::InvalidState("session torn down".to_string()));
            },
            _ => {},
        }
        self.now = now;
        self.run_timers(now, host);

        if self.status != SessionStatus::Running {
            return Ok(());
        }

        self.update_enemies(now, dt, host);
        if let Err(err) = self.update_helper(host) {
            warn!("Helper update skipped: {err}");
        }
        self.retire_balls(now, host);

        if let Some(boss) = self.boss.and_then(|id| self.enemy(id)) {
            if boss.is_active() {
                host.update_boss_health(boss.health_fraction());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn run_timers(&mut self, now: u64, host: &mut impl Host) {
        for timer in self.timers.drain_due(now) {
            if let Err(err) = self.fire_timer(timer, host) {
                debug!("Timer {:?} skipped: {err}", timer.action);
            }
        }
    }

    fn fire_timer(&mut self, timer: FiredTimer, host: &mut impl Host) -> GameplayResult<()> {
        match timer.action {
            TimerAction::EndInvulnerability => {
                let id = timer.owner.ok_or_else(|| orphan(timer))?;
                let actor = self.live_actor_mut(id)?;
                actor.end_invulnerability();
                host.clear_tint(actor.sprite);
            },
            TimerAction::FinishAttack => {
                let id = timer.owner.ok_or_else(|| orphan(timer))?;
                self.finish_enemy_attack(id, host)?;
            },
            TimerAction::SettleCannon => {
                let id = timer.owner.ok_or_else(|| orphan(timer))?;
                let cannon = self
                    .cannons
                    .iter_mut()
                    .find(|cannon| cannon.id == id)
                    .ok_or(GameplayError::StaleReference(id))?;
                if cannon.settle() {
                    host.set_texture(cannon.sprite, CannonPose::Idle.texture());
                    host.set_flip_x(cannon.sprite, cannon.flip_x());
                }
            },
            TimerAction::CannonCheck => {
                if self.status == SessionStatus::Running {
                    self.cannon_check(self.now, host);
                }
            },
            TimerAction::AutoHeal => {
                if self.status == SessionStatus::Running {
                    self.auto_heal(host);
                }
            },
            TimerAction::HelperEntry => {
                let id = timer.owner.ok_or_else(|| orphan(timer))?;
                let helper = self.live_actor_mut(id)?;
                host.set_visible(helper.sprite, true);
                play_with_fallback(host, helper.sprite, HELPER_RUN_ANIMATION, HELPER_IDLE_ANIMATION);
                self.helper_animation = Some(FollowAnimation::Run);
                self.helper_phase = HelperPhase::Entering;
                info!("Motocle enters the level");
            },
            TimerAction::LevelTransition => {
                if self.status == SessionStatus::Completing {
                    self.status = SessionStatus::Complete;
                    let payload = self.state.payload();
                    info!("Level {} complete, handing over {:?}", self.spec.id.number(), payload);
                    host.level_complete(payload);
                }
            },
        }
        Ok(())
    }

    fn auto_heal(&mut self, host: &mut impl Host) {
        let amount = self.tuning.auto_heal_amount;
        let Some(player) = self
            .actors
            .iter_mut()
            .find(|actor| actor.kind == ActorKind::Player)
        else {
            return;
        };
        if !player.is_active() || player.health() >= player.max_health() {
            return;
        }
        if let Ok(change) = player.heal(amount) {
            if change.delta() > 0 {
                self.push_actor_health(ActorKind::Player, host);
            }
        }
    }

    // ========================================================================
    // Enemies
    // ========================================================================

    fn update_enemies(&mut self, now: u64, dt: f32, host: &mut impl Host) {
        for index in 0..self.enemies.len() {
            if !self.enemies[index].is_active() {
                continue;
            }
            if let Err(err) = self.step_enemy(index, now, dt, host) {
                warn!("Enemy {} skipped this tick: {err}", self.enemies[index].id);
            }
            if self.status != SessionStatus::Running {
                break;
            }
        }
    }

    fn step_enemy(&mut self, index: usize, now: u64, dt: f32, host: &mut impl Host) -> GameplayResult<()> {
        let enemy_type = self.enemies[index].enemy_type;
        let stats = self.archetypes.get(enemy_type)?;
        let enemy = &mut self.enemies[index];
        let heroes = self
            .actors
            .iter()
            .filter(|actor| actor.kind.counts_for_game_over());
        let target = find_closest_target(enemy.position(), heroes);
        let input = TickInput {
            now,
            dt,
            stats,
            target,
        };
        let outcome = tick_enemy(enemy, &input, &mut self.rng)?;

        let sprite = enemy.sprite;
        let id = enemy.id;
        let origin = enemy.position();
        if let Some(cue) = outcome.animation {
            let key = match cue {
                AnimationCue::Idle => stats.animations.idle.as_str(),
                AnimationCue::Moving => stats.animations.moving.as_str(),
                AnimationCue::Attack => stats.animations.attack_or_idle(),
            };
            play_with_fallback(host, sprite, key, &stats.animations.idle);
        }
        if let Some(facing) = outcome.facing {
            host.set_flip_x(sprite, facing.flip_x());
        }
        if outcome.state_changed() {
            self.events.publish(GameEvent::EnemyStateChanged {
                enemy: id,
                from: outcome.previous,
                to: outcome.state,
            });
        }

        if let Some(attack) = outcome.attack {
            let shake = stats.attack_shake;
            self.timers
                .schedule_once(Some(id), now, stats.attack_animation_ms, TimerAction::FinishAttack);
            if let Some((duration_ms, intensity)) = shake {
                host.camera_shake(duration_ms, intensity);
            }
            let hit = Hit::new(DamageSource::Enemy(enemy_type), attack.damage, origin);
            self.damage_actor(attack.target, &hit, host)?;
        }
        Ok(())
    }

    fn finish_enemy_attack(&mut self, id: EntityId, host: &mut impl Host) -> GameplayResult<()> {
        let enemy = self
            .enemies
            .iter_mut()
            .find(|enemy| enemy.id == id)
            .ok_or(GameplayError::StaleReference(id))?;
        if !enemy.is_active() {
            return Err(GameplayError::StaleReference(id));
        }
        if enemy.finish_attack() {
            let stats = self.archetypes.get(enemy.enemy_type)?;
            enemy.cue = AnimationCue::Moving;
            play_with_fallback(host, enemy.sprite, &stats.animations.moving, &stats.animations.idle);
        }
        Ok(())
    }

    /// Attack-animation completion reported by the host. Idempotent with the
    /// fallback timer: whichever arrives first clears the attack.
    pub fn on_animation_complete(&mut self, enemy: EntityId, host: &mut impl Host) -> GameplayResult<()> {
        self.timers.cancel_action(enemy, TimerAction::FinishAttack);
        self.finish_enemy_attack(enemy, host)
    }

    fn defeat_enemy(&mut self, index: usize, host: &mut impl Host) {
        let enemy = &self.enemies[index];
        let (id, enemy_type, sprite) = (enemy.id, enemy.enemy_type, enemy.sprite);
        self.timers.cancel_owned_by(id);
        host.set_visible(sprite, false);
        self.state.record_kill(self.tuning.kill_points);
        self.events.publish(GameEvent::EnemyDefeated { enemy: id, enemy_type });
        info!("{} {} defeated", enemy_type.tag(), id);

        if enemy_type.is_boss() {
            let mut silenced = 0;
            for other in self.enemies.iter_mut().filter(|e| e.enemy_type.is_skeleton() && e.is_active()) {
                other.deactivate();
                self.timers.cancel_owned_by(other.id);
                host.set_visible(other.sprite, false);
                silenced += 1;
            }
            self.state.add_score(self.tuning.boss_bonus);
            host.update_boss_health(0.0);
            self.events.publish(GameEvent::BossDefeated { boss: id, silenced });
            info!("Boss defeated, {silenced} skeletons silenced");
        }
        host.update_score(self.state.score);
    }

    // ========================================================================
    // Actors
    // ========================================================================

    fn damage_actor(&mut self, id: EntityId, hit: &Hit, host: &mut impl Host) -> GameplayResult<HitOutcome> {
        let knockback = self.tuning.knockback;
        let windows = self.tuning.invulnerability;
        let now = self.now;
        let actor = self
            .actors
            .iter_mut()
            .find(|actor| actor.id == id)
            .ok_or(GameplayError::StaleReference(id))?;
        let before = actor.health();
        let outcome = resolve_hit(actor, hit, &knockback);
        let (kind, sprite, after) = (actor.kind, actor.sprite, actor.health());

        match outcome {
            HitOutcome::Ignored(_) => return Ok(outcome),
            HitOutcome::Damaged { remaining } => {
                host.set_tint(sprite, HIT_TINT);
                self.timers
                    .schedule_once(Some(id), now, windows.for_kind(kind), TimerAction::EndInvulnerability);
                self.events.publish(GameEvent::ActorDamaged {
                    actor: id,
                    kind,
                    damage: before - remaining,
                    remaining,
                });
            },
            HitOutcome::Defeated => {
                self.timers.cancel_owned_by(id);
                host.clear_tint(sprite);
                host.set_visible(sprite, false);
                self.events.publish(GameEvent::ActorDamaged {
                    actor: id,
                    kind,
                    damage: before - after,
                    remaining: after,
                });
                self.events.publish(GameEvent::ActorDefeated { actor: id, kind });
                info!("{} {} defeated", kind.display_name(), id);
            },
        }
        self.push_actor_health(kind, host);

        if outcome == HitOutcome::Defeated && self.game_over.check(self.actors.iter()) {
            self.enter_game_over(host);
        }
        Ok(outcome)
    }

    fn enter_game_over(&mut self, host: &mut impl Host) {
        self.status = SessionStatus::GameOver;
        let cancelled = self.timers.cancel_all();
        let payload = self.state.payload();
        self.events.publish(GameEvent::GameOver { payload });
        info!("Game over ({cancelled} timers cancelled): {:?}", payload);
        host.game_over(payload);
    }

    fn push_actor_health(&mut self, kind: ActorKind, host: &mut impl Host) {
        let Some((current, max)) = self
            .actor(kind)
            .map(|actor| (actor.health(), actor.max_health()))
        else {
            return;
        };
        match kind {
            ActorKind::Player => {
                self.state.health = current;
                host.update_health(current, max);
            },
            ActorKind::Companion => host.update_companion_health(current, max),
            ActorKind::Helper => host.update_helper_health(current, max),
        }
    }

    fn live_actor_mut(&mut self, id: EntityId) -> GameplayResult<&mut Actor> {
        self.actors
            .iter_mut()
            .find(|actor| actor.id == id && actor.is_active())
            .ok_or(GameplayError::StaleReference(id))
    }

    fn update_helper(&mut self, host: &mut impl Host) -> GameplayResult<()> {
        if matches!(self.helper_phase, HelperPhase::Absent | HelperPhase::Waiting) {
            return Ok(());
        }
        let leader = pick_follow_target(&self.actors).map(Actor::position);
        let phase = self.helper_phase;
        let entry_x = self.spec.helper_entry_x;
        let entry_speed = self.tuning.helper_entry_speed;
        let follow = self.tuning.follow;

        let helper = self
            .actors
            .iter_mut()
            .find(|actor| actor.kind == ActorKind::Helper)
            .ok_or_else(|| GameplayError::InvalidState("helper phase set without a helper".to_string()))?;
        if !helper.is_active() {
            return Ok(());
        }

        let animation = if phase == HelperPhase::Entering {
            let remaining = entry_x - helper.body.position.x;
            if remaining.abs() <= 5.0 {
                helper.body.halt_x();
                self.helper_phase = HelperPhase::Following;
                FollowAnimation::Idle
            } else {
                helper.body.velocity.x = remaining.signum() * entry_speed;
                helper.facing = Facing::from_sign(remaining);
                FollowAnimation::Run
            }
        } else {
            let previous_facing = helper.facing;
            let step = update_follow(&mut helper.body, helper.facing, leader, &follow);
            helper.facing = step.facing;
            if step.facing != previous_facing {
                host.set_flip_x(helper.sprite, step.facing.flip_x());
            }
            step.animation
        };

        if self.helper_animation != Some(animation) {
            let key = match animation {
                FollowAnimation::Run => HELPER_RUN_ANIMATION,
                FollowAnimation::Idle => HELPER_IDLE_ANIMATION,
            };
            play_with_fallback(host, helper.sprite, key, HELPER_IDLE_ANIMATION);
            self.helper_animation = Some(animation);
        }
        Ok(())
    }

    /// Hero melee attack: strikes every active enemy within reach on the
    /// attacker's facing side. Returns the number of enemies hit.
    pub fn actor_attack(&mut self, kind: ActorKind, now: u64, host: &mut impl Host) -> GameplayResult<usize> {
        if self.status != SessionStatus::Running {
            return Err(GameplayError::InvalidState(format!("cannot attack while {:?}", self.status)));
        }
        if !kind.counts_for_game_over() {
            return Err(GameplayError::InvalidState(format!("{} cannot attack", kind.display_name())));
        }
        let cooldown = self.tuning.attack_cooldown_ms;
        let reach = self.tuning.attack_reach;
        let actor = self
            .actors
            .iter_mut()
            .find(|actor| actor.kind == kind)
            .ok_or_else(|| GameplayError::InvalidState(format!("no {} in level", kind.display_name())))?;
        if !actor.is_active() {
            return Err(GameplayError::StaleReference(actor.id));
        }
        if !actor.try_begin_attack(now, cooldown) {
            return Err(GameplayError::InvalidState("attack on cooldown".to_string()));
        }
        let (origin, facing, damage) = (actor.position(), actor.facing, actor.attack_damage);

        let mut hits = 0;
        for index in 0..self.enemies.len() {
            let enemy = &mut self.enemies[index];
            if !enemy.is_active() {
                continue;
            }
            if enemy.body.distance_to(origin) >= reach || !facing.faces(origin.x, enemy.position().x) {
                continue;
            }
            hits += 1;
            match enemy.take_damage(damage)? {
                EnemyHit::Damaged { remaining } => {
                    debug!("{} {} hit, {} hp left", enemy.enemy_type.tag(), enemy.id, remaining);
                },
                EnemyHit::Defeated => self.defeat_enemy(index, host),
            }
        }
        Ok(hits)
    }

    // ========================================================================
    // Cannons and balls
    // ========================================================================

    fn cannon_check(&mut self, now: u64, host: &mut impl Host) {
        let targets: Vec<Vec2> = self
            .actors
            .iter()
            .filter(|actor| actor.kind.counts_for_game_over() && actor.is_active())
            .map(Actor::position)
            .collect();
        for index in 0..self.cannons.len() {
            let cannon = &self.cannons[index];
            if !cannon.is_ready(now) || !cannon.target_in_range(&targets, &self.tuning.cannon) {
                continue;
            }
            if let Err(err) = self.fire_cannon(index, now, host) {
                warn!("Cannon {} did not fire: {err}", self.cannons[index].id);
            }
        }
    }

    fn fire_cannon(&mut self, index: usize, now: u64, host: &mut impl Host) -> GameplayResult<()> {
        let tuning = self.tuning.cannon;
        let ball_id = self.ids.next_id();
        let cannon = &mut self.cannons[index];
        let mut ball = cannon.fire(now, ball_id, &tuning)?;
        ball.sprite = sprite_for(ball_id);

        host.set_texture(cannon.sprite, CannonPose::Firing.texture());
        host.set_flip_x(cannon.sprite, cannon.flip_x());
        host.spawn_projectile(ball.sprite, ball.position, ball.velocity);
        host.camera_shake(tuning.fire_shake.0, tuning.fire_shake.1);
        self.timers
            .schedule_once(Some(cannon.id), now, tuning.fire_flash_ms, TimerAction::SettleCannon);
        self.events.publish(GameEvent::CannonFired {
            cannon: cannon.id,
            ball: ball_id,
        });
        self.balls.push(ball);
        Ok(())
    }

    fn retire_balls(&mut self, now: u64, host: &mut impl Host) {
        let tuning = self.tuning.cannon;
        for ball in self.balls.iter_mut().filter(|ball| ball.is_active()) {
            match ball.fate(now, &self.bounds, tuning.bounds_margin) {
                BallFate::Flying => {},
                BallFate::Expired => {
                    if let Some(explosion) = ball.explode(tuning.explosion_radius) {
                        explosion_effects(host, &self.events, &tuning, ball, explosion);
                    }
                },
                BallFate::OutOfBounds => {
                    if ball.discard() {
                        host.despawn(ball.sprite);
                    }
                },
            }
        }
        self.balls.retain(CannonBall::is_active);
    }

    fn explode_ball(&mut self, id: EntityId, host: &mut impl Host) -> GameplayResult<Option<(i32, Vec2)>> {
        let tuning = self.tuning.cannon;
        let ball = self
            .balls
            .iter_mut()
            .find(|ball| ball.id == id)
            .ok_or(GameplayError::StaleReference(id))?;
        Ok(ball.explode(tuning.explosion_radius).map(|explosion| {
            explosion_effects(host, &self.events, &tuning, ball, explosion);
            (ball.damage, explosion.position)
        }))
    }

    // ========================================================================
    // Overlap callbacks
    // ========================================================================

    /// Actor touched an enemy.
    pub fn on_actor_enemy_contact(
        &mut self,
        actor: EntityId,
        enemy: EntityId,
        host: &mut impl Host,
    ) -> GameplayResult<HitOutcome> {
        if self.status != SessionStatus::Running || self.is_hidden_helper(actor) {
            return Ok(HitOutcome::Ignored(IgnoreReason::Inactive));
        }
        let enemy = self.enemy(enemy).ok_or(GameplayError::StaleReference(enemy))?;
        if !enemy.is_active() {
            return Err(GameplayError::StaleReference(enemy.id));
        }
        let hit = Hit::new(DamageSource::Enemy(enemy.enemy_type), enemy.damage, enemy.position());
        self.damage_actor(actor, &hit, host)
    }

    /// Actor touched a cannon body.
    pub fn on_actor_cannon_contact(
        &mut self,
        actor: EntityId,
        cannon: EntityId,
        host: &mut impl Host,
    ) -> GameplayResult<HitOutcome> {
        if self.status != SessionStatus::Running || self.is_hidden_helper(actor) {
            return Ok(HitOutcome::Ignored(IgnoreReason::Inactive));
        }
        let cannon = self
            .cannons
            .iter()
            .find(|c| c.id == cannon)
            .ok_or(GameplayError::StaleReference(cannon))?;
        if cannon.is_destroyed {
            return Ok(HitOutcome::Ignored(IgnoreReason::Inactive));
        }
        let hit = Hit::new(DamageSource::Cannon, cannon.damage, cannon.position);
        self.damage_actor(actor, &hit, host)
    }

    /// Actor touched a cannonball: the ball explodes, then its damage lands.
    pub fn on_actor_ball_contact(
        &mut self,
        actor: EntityId,
        ball: EntityId,
        host: &mut impl Host,
    ) -> GameplayResult<HitOutcome> {
        if self.is_hidden_helper(actor) {
            return Ok(HitOutcome::Ignored(IgnoreReason::Inactive));
        }
        match self.explode_ball(ball, host)? {
            Some((damage, position)) if self.status == SessionStatus::Running => {
                let hit = Hit::new(DamageSource::CannonBall, damage, position);
                self.damage_actor(actor, &hit, host)
            },
            _ => Ok(HitOutcome::Ignored(IgnoreReason::Inactive)),
        }
    }

    /// Cannonball hit a platform. Returns true if it exploded now.
    pub fn on_ball_platform_contact(&mut self, ball: EntityId, host: &mut impl Host) -> GameplayResult<bool> {
        Ok(self.explode_ball(ball, host)?.is_some())
    }

    /// Actor walked over a coin or potion.
    pub fn on_pickup(&mut self, actor: EntityId, pickup: EntityId, host: &mut impl Host) -> GameplayResult<()> {
        if self.status != SessionStatus::Running {
            return Ok(());
        }
        let collector = self
            .actors
            .iter()
            .find(|a| a.id == actor && a.is_active())
            .ok_or(GameplayError::StaleReference(actor))?;
        if !collector.kind.counts_for_game_over() {
            return Ok(());
        }
        let collector_kind = collector.kind;
        let item = self
            .pickups
            .iter_mut()
            .find(|p| p.id == pickup && p.active)
            .ok_or(GameplayError::StaleReference(pickup))?;
        item.active = false;
        let kind = item.kind;
        host.despawn(sprite_for(pickup));

        match kind {
            PickupKind::Coin => {
                let complete = self.state.record_coin(self.spec.coin_value);
                host.update_score(self.state.score);
                host.update_coins(self.state.coins_collected, self.state.total_coins);
                self.events.publish(GameEvent::CoinCollected {
                    collected: self.state.coins_collected,
                    total: self.state.total_coins,
                });
                if complete {
                    self.begin_completion();
                }
            },
            PickupKind::Potion => {
                let effect = self.spec.potion;
                if effect.heal > 0 {
                    self.live_actor_mut(actor)?.heal(effect.heal)?;
                    self.push_actor_health(collector_kind, host);
                }
                if effect.score > 0 {
                    self.state.add_score(effect.score);
                    host.update_score(self.state.score);
                }
            },
        }
        Ok(())
    }

    fn begin_completion(&mut self) {
        if self.status != SessionStatus::Running {
            return;
        }
        self.status = SessionStatus::Completing;
        for enemy in &mut self.enemies {
            enemy.body.halt();
        }
        let payload = self.state.payload();
        self.events.publish(GameEvent::LevelComplete { payload });
        self.timers
            .schedule_once(None, self.now, self.tuning.completion_delay_ms, TimerAction::LevelTransition);
        info!("All coins collected in level {}", self.spec.id.number());
    }

    fn is_hidden_helper(&self, id: EntityId) -> bool {
        matches!(self.helper_phase, HelperPhase::Waiting)
            && self
                .actors
                .iter()
                .any(|actor| actor.id == id && actor.kind == ActorKind::Helper)
    }

    /// Cancels every outstanding timer and retires the session.
    pub fn teardown(&mut self) -> usize {
        let cancelled = self.timers.cancel_all();
        self.status = SessionStatus::TornDown;
        info!("Level {} torn down, {cancelled} timers cancelled", self.spec.id.number());
        cancelled
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Helper entry phase.
    #[must_use]
    pub const fn helper_phase(&self) -> HelperPhase {
        self.helper_phase
    }

    /// Level layout.
    #[must_use]
    pub const fn spec(&self) -> &LevelSpec {
        &self.spec
    }

    /// Level progress.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Level bounds.
    #[must_use]
    pub const fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    /// Session tuning.
    #[must_use]
    pub const fn tuning(&self) -> &SessionTuning {
        &self.tuning
    }

    /// Actor of a role.
    #[must_use]
    pub fn actor(&self, kind: ActorKind) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.kind == kind)
    }

    /// Mutable actor of a role, for the host to sync movement and facing.
    pub fn actor_mut(&mut self, kind: ActorKind) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.kind == kind)
    }

    /// All actors.
    #[must_use]
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// All actors, mutable. The slice length is fixed for the session.
    pub fn actors_mut(&mut self) -> &mut [Actor] {
        &mut self.actors
    }

    /// Enemy by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }

    /// All enemies, including defeated ones.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// All enemies, mutable.
    pub fn enemies_mut(&mut self) -> &mut [Enemy] {
        &mut self.enemies
    }

    /// Cannons.
    #[must_use]
    pub fn cannons(&self) -> &[Cannon] {
        &self.cannons
    }

    /// Balls in flight.
    #[must_use]
    pub fn balls(&self) -> &[CannonBall] {
        &self.balls
    }

    /// Balls in flight, mutable.
    pub fn balls_mut(&mut self) -> &mut [CannonBall] {
        &mut self.balls
    }

    /// Pickups, including collected ones.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Boss entity, if the level has one.
    #[must_use]
    pub const fn boss(&self) -> Option<EntityId> {
        self.boss
    }

    /// Pending timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Drains events published since the last call.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }
}

fn orphan(timer: FiredTimer) -> GameplayError {
    GameplayError::InvalidState(format!("timer {:?} has no owner", timer.action))
}

fn explosion_effects<H: Presenter + ?Sized>(
    host: &mut H,
    events: &EventBus,
    tuning: &CannonTuning,
    ball: &CannonBall,
    explosion: Explosion,
) {
    host.despawn(ball.sprite);
    host.spawn_explosion(explosion.position, explosion.radius);
    host.camera_shake(tuning.explosion_shake.0, tuning.explosion_shake.1);
    events.publish(GameEvent::CannonBallExploded {
        ball: ball.id,
        position: explosion.position,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::EnemyType;
    use crate::enemy::EnemySpawn;
    use crate::hooks::{HostCall, MockHost};
    use crate::level::LevelId;

    fn bare_level(id: LevelId) -> LevelSpec {
        let mut spec = LevelSpec::builtin(id);
        spec.enemies.clear();
        spec.cannons.clear();
        spec.helper = false;
        spec
    }

    fn session(spec: LevelSpec) -> (LevelSession, MockHost) {
        let mut host = MockHost::new();
        let mut session = LevelSession::new(spec, ArchetypeTable::builtin(), SessionTuning::default(), None, 1)
            .expect("session");
        session.start(0, &mut host).expect("start");
        (session, host)
    }

    fn id_of(session: &LevelSession, kind: ActorKind) -> EntityId {
        session.actor(kind).expect("actor").id
    }

    #[test]
    fn test_tick_requires_start() {
        let mut host = MockHost::new();
        let mut session = LevelSession::new(
            bare_level(LevelId::One),
            ArchetypeTable::builtin(),
            SessionTuning::default(),
            None,
            1,
        )
        .expect("session");
        assert!(session.tick(16, 0.016, &mut host).is_err());
        session.start(0, &mut host).expect("start");
        assert!(session.start(0, &mut host).is_err());
    }

    #[test]
    fn test_enemy_attack_damages_player() {
        let mut spec = bare_level(LevelId::One);
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, spec.player_start + Vec2::new(40.0, 0.0)).with_stats(20, 20));
        let (mut session, mut host) = session(spec);

        session.tick(100, 0.016, &mut host).expect("tick");
        let player = session.actor(ActorKind::Player).expect("player");
        assert_eq!(player.health(), 80);
        assert!(player.is_invulnerable());
        assert_eq!(host.last_health(), Some(80));
        assert!(host.calls.contains(&HostCall::Tint {
            sprite: player.sprite,
            rgb: HIT_TINT
        }));
    }

    #[test]
    fn test_invulnerability_expires_via_timer() {
        let mut spec = bare_level(LevelId::One);
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, spec.player_start + Vec2::new(40.0, 0.0)).with_stats(20, 20));
        let (mut session, mut host) = session(spec);
        session.tick(100, 0.016, &mut host).expect("tick");
        session.tick(1100, 0.016, &mut host).expect("tick");
        let player = session.actor(ActorKind::Player).expect("player");
        assert!(!player.is_invulnerable());
    }

    #[test]
    fn test_contact_respects_invulnerability() {
        let mut spec = bare_level(LevelId::One);
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, Vec2::new(2000.0, 450.0)).with_stats(20, 10));
        let (mut session, mut host) = session(spec);
        let player = id_of(&session, ActorKind::Player);
        let pig = session.enemies()[0].id;

        let first = session.on_actor_enemy_contact(player, pig, &mut host).expect("contact");
        assert_eq!(first, HitOutcome::Damaged { remaining: 90 });
        let second = session.on_actor_enemy_contact(player, pig, &mut host).expect("contact");
        assert_eq!(second, HitOutcome::Ignored(IgnoreReason::Invulnerable));
    }

    #[test]
    fn test_boss_defeat_silences_skeletons() {
        let mut spec = bare_level(LevelId::Three);
        let start = spec.player_start;
        spec.enemies.push(
            EnemySpawn::new(EnemyType::SkeletonBoss, start + Vec2::new(30.0, 0.0)).with_stats(20, 50),
        );
        spec.enemies
            .push(EnemySpawn::new(EnemyType::SkeletonMinion, Vec2::new(3000.0, 450.0)));
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, Vec2::new(3500.0, 450.0)));
        let (mut session, mut host) = session(spec);

        let hits = session
            .actor_attack(ActorKind::Player, 10, &mut host)
            .expect("attack");
        assert_eq!(hits, 1);
        let active: Vec<_> = session
            .enemies()
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.enemy_type)
            .collect();
        assert_eq!(active, vec![EnemyType::AngryPig]);
        assert_eq!(session.state().enemies_killed, 1);
        assert_eq!(session.state().score, 1100);
        assert_eq!(host.last_boss_fraction(), Some(0.0));
        let events = session.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::BossDefeated { silenced: 1, .. })));
    }

    #[test]
    fn test_attack_needs_facing_and_cooldown() {
        let mut spec = bare_level(LevelId::One);
        spec.enemies.push(
            EnemySpawn::new(EnemyType::AngryPig, spec.player_start - Vec2::new(40.0, 0.0)).with_stats(100, 10),
        );
        let (mut session, mut host) = session(spec);

        // Facing right, enemy on the left
        assert_eq!(session.actor_attack(ActorKind::Player, 10, &mut host), Ok(0));
        session.actor_mut(ActorKind::Player).expect("player").facing = Facing::Left;
        assert!(session.actor_attack(ActorKind::Player, 100, &mut host).is_err());
        assert_eq!(session.actor_attack(ActorKind::Player, 500, &mut host), Ok(1));
        assert_eq!(session.enemies()[0].health(), 75);
        assert!(session.actor_attack(ActorKind::Helper, 1000, &mut host).is_err());
    }

    #[test]
    fn test_coins_complete_level_once() {
        let mut spec = bare_level(LevelId::One);
        spec.coins.truncate(2);
        let (mut session, mut host) = session(spec);
        let player = id_of(&session, ActorKind::Player);
        let coins: Vec<_> = session
            .pickups()
            .iter()
            .filter(|p| p.kind == PickupKind::Coin)
            .map(|p| p.id)
            .collect();

        session.on_pickup(player, coins[0], &mut host).expect("coin");
        assert!(session.on_pickup(player, coins[0], &mut host).is_err());
        session.on_pickup(player, coins[1], &mut host).expect("coin");
        assert_eq!(session.status(), SessionStatus::Completing);
        assert_eq!(session.state().score, 200);

        session.tick(4000, 0.016, &mut host).expect("tick");
        assert_eq!(host.level_completions(), 0);
        session.tick(5000, 0.016, &mut host).expect("tick");
        session.tick(9000, 0.016, &mut host).expect("tick");
        assert_eq!(host.level_completions(), 1);
        assert_eq!(session.status(), SessionStatus::Complete);
    }

    #[test]
    fn test_potion_heals_capped() {
        let spec = bare_level(LevelId::Two);
        let mut host = MockHost::new();
        let carry = LevelPayload {
            score: 500,
            coins_collected: 4,
            enemies_killed: 3,
            health: 70,
            level: 1,
        };
        let mut session = LevelSession::new(
            spec,
            ArchetypeTable::builtin(),
            SessionTuning::default(),
            Some(&carry),
            1,
        )
        .expect("session");
        session.start(0, &mut host).expect("start");
        assert_eq!(session.state().coins_collected, 0);
        assert_eq!(session.state().score, 500);

        let player = id_of(&session, ActorKind::Player);
        let potion = session
            .pickups()
            .iter()
            .find(|p| p.kind == PickupKind::Potion)
            .expect("potion")
            .id;
        session.on_pickup(player, potion, &mut host).expect("potion");
        assert_eq!(session.actor(ActorKind::Player).expect("player").health(), 100);
        assert_eq!(host.last_health(), Some(100));
    }

    #[test]
    fn test_auto_heal() {
        let (mut session, mut host) = session(bare_level(LevelId::One));
        let player = id_of(&session, ActorKind::Player);
        let pig = Hit::new(DamageSource::Enemy(EnemyType::AngryPig), 10, Vec2::ZERO);
        session.damage_actor(player, &pig, &mut host).expect("hit");
        session.tick(2000, 0.016, &mut host).expect("tick");
        assert_eq!(session.actor(ActorKind::Player).expect("player").health(), 92);
    }

    #[test]
    fn test_cannon_fires_and_ball_expires() {
        let mut spec = bare_level(LevelId::Three);
        spec.player_start = Vec2::new(1000.0, 250.0);
        spec.companion_start = Vec2::new(3900.0, 450.0);
        spec.cannons = LevelSpec::builtin(LevelId::Three).cannons;
        let (mut session, mut host) = session(spec);

        // First check at 1000 ms: left cannon sees the player ahead of it,
        // right cannon sees nobody on its side
        session.tick(1000, 0.016, &mut host).expect("tick");
        assert_eq!(session.balls().len(), 0);
        session.tick(4000, 0.016, &mut host).expect("tick");
        assert_eq!(session.balls().len(), 1);
        let ball = session.balls()[0].clone();
        assert_eq!(ball.velocity.x, -300.0);
        assert_eq!(ball.position, Vec2::new(1160.0, 235.0));

        // Idle pose restored after the flash, flip preserved
        session.tick(4300, 0.016, &mut host).expect("tick");
        assert_eq!(session.cannons()[0].pose(), CannonPose::Idle);
        assert!(session.cannons()[0].flip_x());

        session.tick(9001, 0.016, &mut host).expect("tick");
        assert!(session.balls().iter().all(|b| b.id != ball.id));
        assert!(host.count(|c| matches!(c, HostCall::Explosion { .. })) >= 1);
    }

    #[test]
    fn test_ball_contact_explodes_once() {
        let mut spec = bare_level(LevelId::Three);
        spec.player_start = Vec2::new(1000.0, 250.0);
        spec.cannons = LevelSpec::builtin(LevelId::Three).cannons;
        let (mut session, mut host) = session(spec);
        session.tick(4000, 0.016, &mut host).expect("tick");
        let ball = session.balls()[0].id;
        let player = id_of(&session, ActorKind::Player);

        let outcome = session.on_actor_ball_contact(player, ball, &mut host).expect("contact");
        assert_eq!(outcome, HitOutcome::Damaged { remaining: 85 });
        let again = session.on_actor_ball_contact(player, ball, &mut host).expect("contact");
        assert_eq!(again, HitOutcome::Ignored(IgnoreReason::Inactive));
        assert!(!session.on_ball_platform_contact(ball, &mut host).expect("platform"));
        assert_eq!(host.count(|c| matches!(c, HostCall::Explosion { .. })), 1);
    }

    #[test]
    fn test_helper_entry_runs_once_per_session() {
        let mut spec = bare_level(LevelId::Two);
        spec.helper = true;
        let (mut session, mut host) = session(spec.clone());
        assert_eq!(session.helper_phase(), HelperPhase::Waiting);
        assert!(session.begin_helper_entry(0));
        assert!(!session.begin_helper_entry(10));
        session.tick(3000, 0.016, &mut host).expect("tick");
        assert_eq!(session.helper_phase(), HelperPhase::Entering);
        assert!(session.actor(ActorKind::Helper).expect("helper").body.velocity.x > 0.0);

        let (mut fresh, _) = self::session(spec);
        assert!(fresh.begin_helper_entry(0));
    }

    #[test]
    fn test_teardown_cancels_timers() {
        let mut spec = bare_level(LevelId::Three);
        spec.cannons = LevelSpec::builtin(LevelId::Three).cannons;
        let (mut session, mut host) = session(spec);
        assert!(session.pending_timers() >= 2);
        assert!(session.teardown() >= 2);
        assert_eq!(session.pending_timers(), 0);
        assert!(session.tick(5000, 0.016, &mut host).is_err());
    }

    #[test]
    fn test_missing_enemy_animation_falls_back() {
        let mut spec = bare_level(LevelId::One);
        spec.enemies
            .push(EnemySpawn::new(EnemyType::AngryPig, Vec2::new(2000.0, 450.0)));
        let mut host = MockHost::new().without_animation("angrypig-run");
        let mut session = LevelSession::new(spec, ArchetypeTable::builtin(), SessionTuning::default(), None, 1)
            .expect("session");
        session.start(0, &mut host).expect("start");
        session.tick(16, 0.016, &mut host).expect("tick");
        let sprite = session.enemies()[0].sprite;
        assert!(host.calls.contains(&HostCall::Animation {
            sprite,
            key: "angrypig-idle".to_string()
        }));
    }
}
