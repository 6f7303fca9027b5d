//! Cannons and cannonballs.
//!
//! A cannon's sprite flip is never stored: it is derived from `direction`,
//! and so are the muzzle offset and launch velocity of every ball it fires.

use glam::Vec2;
use quincena_common::{EntityId, Facing, SpriteHandle, WorldBounds};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{GameplayError, GameplayResult};

/// Which targets a cannon may fire at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannonRangePolicy {
    /// Any active target within detection range
    Omnidirectional,
    /// Only targets on the side the cannon points to
    #[default]
    FacingSide,
}

/// Cannon and projectile tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannonTuning {
    /// Target detection radius (px)
    pub detection_range: f32,
    /// Range check policy
    pub policy: CannonRangePolicy,
    /// Horizontal muzzle offset (px)
    pub muzzle_offset: f32,
    /// Muzzle height above the cannon center (px)
    pub muzzle_rise: f32,
    /// Ball horizontal speed (px/s)
    pub ball_speed: f32,
    /// Ball vertical launch impulse (negative is up)
    pub arc_impulse: f32,
    /// Ball lifespan (ms)
    pub lifespan_ms: u64,
    /// Fire pose duration (ms)
    pub fire_flash_ms: u64,
    /// Interval of the fire check timer (ms)
    pub check_interval_ms: u64,
    /// Explosion radius (px)
    pub explosion_radius: f32,
    /// Distance past the level edges after which a ball is discarded (px)
    pub bounds_margin: f32,
    /// Camera shake on fire, as (duration ms, intensity)
    pub fire_shake: (u64, f32),
    /// Camera shake on explosion, as (duration ms, intensity)
    pub explosion_shake: (u64, f32),
}

impl Default for CannonTuning {
    fn default() -> Self {
        Self {
            detection_range: 500.0,
            policy: CannonRangePolicy::FacingSide,
            muzzle_offset: 40.0,
            muzzle_rise: 15.0,
            ball_speed: 300.0,
            arc_impulse: -50.0,
            lifespan_ms: 5000,
            fire_flash_ms: 300,
            check_interval_ms: 1000,
            explosion_radius: 48.0,
            bounds_margin: 100.0,
            fire_shake: (100, 0.015),
            explosion_shake: (200, 0.025),
        }
    }
}

/// Visual pose of a cannon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CannonPose {
    /// Resting
    Idle,
    /// Showing the fire frame
    Firing,
    /// Wrecked
    Destroyed,
}

impl CannonPose {
    /// Texture key of the pose.
    #[must_use]
    pub const fn texture(self) -> &'static str {
        match self {
            Self::Idle => "cannonIdle",
            Self::Firing => "cannonFire",
            Self::Destroyed => "cannonDestroyed",
        }
    }
}

/// Placement data for a cannon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannonSpawn {
    /// Position
    pub position: Vec2,
    /// Direction the barrel points
    pub direction: Facing,
    /// Minimum time between shots (ms)
    pub fire_rate_ms: u64,
    /// Damage per ball and per body contact
    pub damage: i32,
}

/// A stationary cannon.
#[derive(Debug, Clone)]
pub struct Cannon {
    /// Entity ID
    pub id: EntityId,
    /// Host sprite
    pub sprite: SpriteHandle,
    /// Position
    pub position: Vec2,
    /// Minimum time between shots (ms)
    pub fire_rate_ms: u64,
    /// Time of the last shot (ms)
    pub last_fire: u64,
    /// Damage per ball and per body contact
    pub damage: i32,
    /// Wrecked cannons neither fire nor hurt
    pub is_destroyed: bool,
    direction: Facing,
    pose: CannonPose,
}

impl Cannon {
    /// Creates an idle cannon.
    #[must_use]
    pub fn new(id: EntityId, sprite: SpriteHandle, spawn: &CannonSpawn) -> Self {
        Self {
            id,
            sprite,
            position: spawn.position,
            fire_rate_ms: spawn.fire_rate_ms,
            last_fire: 0,
            damage: spawn.damage,
            is_destroyed: false,
            direction: spawn.direction,
            pose: CannonPose::Idle,
        }
    }

    /// Direction the barrel points.
    #[must_use]
    pub const fn direction(&self) -> Facing {
        self.direction
    }

    /// Sprite flip, always derived from `direction`.
    #[must_use]
    pub const fn flip_x(&self) -> bool {
        self.direction.flip_x()
    }

    /// Current pose.
    #[must_use]
    pub const fn pose(&self) -> CannonPose {
        self.pose
    }

    /// Fire-rate gate.
    #[must_use]
    pub fn is_ready(&self, now: u64) -> bool {
        !self.is_destroyed && now.saturating_sub(self.last_fire) > self.fire_rate_ms
    }

    /// Range check against candidate target positions.
    #[must_use]
    pub fn target_in_range(&self, targets: &[Vec2], tuning: &CannonTuning) -> bool {
        targets.iter().any(|target| {
            let near = self.position.distance(*target) < tuning.detection_range;
            let on_side = match tuning.policy {
                CannonRangePolicy::Omnidirectional => true,
                CannonRangePolicy::FacingSide => self.direction.faces(self.position.x, target.x),
            };
            near && on_side
        })
    }

    /// Fires one ball, entering the fire pose.
    pub fn fire(&mut self, now: u64, ball_id: EntityId, tuning: &CannonTuning) -> GameplayResult<CannonBall> {
        if self.is_destroyed {
            return Err(GameplayError::InvalidState(format!("cannon {} is destroyed", self.id)));
        }
        if self.pose == CannonPose::Firing {
            return Err(GameplayError::InvalidState(format!("cannon {} is already firing", self.id)));
        }

        let sign = self.direction.sign();
        let position = self.position + Vec2::new(sign * tuning.muzzle_offset, -tuning.muzzle_rise);
        let velocity = Vec2::new(sign * tuning.ball_speed, tuning.arc_impulse);
        self.last_fire = now;
        self.pose = CannonPose::Firing;
        debug!("Cannon {} fired ball {} facing {:?}", self.id, ball_id, self.direction);

        Ok(CannonBall {
            id: ball_id,
            sprite: SpriteHandle::DETACHED,
            position,
            velocity,
            damage: self.damage,
            birth_time: now,
            lifespan_ms: tuning.lifespan_ms,
            active: true,
        })
    }

    /// Returns to the idle pose after firing. Flip is untouched.
    pub fn settle(&mut self) -> bool {
        if self.pose == CannonPose::Firing {
            self.pose = CannonPose::Idle;
            true
        } else {
            false
        }
    }

    /// Wrecks the cannon.
    pub fn destroy(&mut self) {
        self.is_destroyed = true;
        self.pose = CannonPose::Destroyed;
    }
}

/// An explosion left by a ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    /// Center
    pub position: Vec2,
    /// Visual radius
    pub radius: f32,
}

/// Why a ball should leave play this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallFate {
    /// Keep flying
    Flying,
    /// Outlived its lifespan: explode
    Expired,
    /// Left the level: discard silently
    OutOfBounds,
}

/// A cannon projectile.
#[derive(Debug, Clone)]
pub struct CannonBall {
    /// Entity ID
    pub id: EntityId,
    /// Host sprite
    pub sprite: SpriteHandle,
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Damage on actor contact
    pub damage: i32,
    /// Spawn time (ms)
    pub birth_time: u64,
    /// Lifespan (ms)
    pub lifespan_ms: u64,
    active: bool,
}

impl CannonBall {
    /// Whether the ball is still in play.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Age at `now` (ms).
    #[must_use]
    pub const fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.birth_time)
    }

    /// Retirement check for this frame.
    #[must_use]
    pub fn fate(&self, now: u64, bounds: &WorldBounds, margin: f32) -> BallFate {
        if !bounds.contains_x_with_margin(self.position.x, margin) {
            BallFate::OutOfBounds
        } else if self.age(now) > self.lifespan_ms {
            BallFate::Expired
        } else {
            BallFate::Flying
        }
    }

    /// Explodes the ball. A second call is a no-op returning `None`.
    pub fn explode(&mut self, radius: f32) -> Option<Explosion> {
        if !self.active {
            return None;
        }
        self.active = false;
        self.velocity = Vec2::ZERO;
        trace!("Ball {} exploded at {:?}", self.id, self.position);
        Some(Explosion {
            position: self.position,
            radius,
        })
    }

    /// Removes the ball without an explosion.
    pub fn discard(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        was_active
    }
}
