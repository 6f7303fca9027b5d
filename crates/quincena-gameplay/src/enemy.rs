//! Enemy records and their idle movement data.

use glam::Vec2;
use quincena_common::{EntityId, Facing, SpriteHandle};
use serde::{Deserialize, Serialize};

use crate::archetype::{ArchetypeStats, EnemyType, FlightPattern, MovementKind};
use crate::body::Body;
use crate::error::{GameplayError, GameplayResult};

/// Distance at which a patrol point counts as reached.
pub const PATROL_POINT_TOLERANCE: f32 = 12.0;
/// Distance from its post before a stationary guard walks back.
pub const POST_TOLERANCE: f32 = 10.0;
/// Circle flight radius.
pub const CIRCLE_RADIUS: f32 = 60.0;
/// Figure-eight flight half-width.
pub const FIGURE_EIGHT_WIDTH: f32 = 80.0;
/// Hover bob amplitude.
pub const HOVER_AMPLITUDE: f32 = 12.0;

/// Behavior state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// Idle movement, no target in reach
    #[default]
    Patrol,
    /// Pursuing a target
    Chase,
    /// Attack animation in progress
    Attack,
    /// In attack range but waiting for the cooldown
    Cooldown,
}

impl EnemyState {
    /// True while the enemy is locked onto a target. Engaged enemies use the
    /// wider chase radius.
    #[must_use]
    pub const fn is_engaged(self) -> bool {
        !matches!(self, Self::Patrol)
    }
}

/// Animation an enemy is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimationCue {
    /// Standing still
    #[default]
    Idle,
    /// Walking, running or flying
    Moving,
    /// Striking
    Attack,
}

/// Two-point ping-pong patrol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    /// The two x coordinates walked between
    pub points: [f32; 2],
    /// Index of the point currently walked to
    pub current: usize,
    /// Walking direction, -1 or +1
    pub direction: f32,
}

impl PatrolRoute {
    /// Creates a route heading for the first point from `start_x`.
    #[must_use]
    pub fn new(start_x: f32, points: [f32; 2]) -> Self {
        let direction = if points[0] < start_x { -1.0 } else { 1.0 };
        Self {
            points,
            current: 0,
            direction,
        }
    }

    /// X coordinate currently walked to.
    #[must_use]
    pub const fn target_x(&self) -> f32 {
        self.points[self.current]
    }

    /// Advances to the other point once `x` is within tolerance, flipping direction.
    ///
    /// Otherwise re-aims at the current point, which recovers a route after a
    /// chase carried the enemy past it.
    pub fn step(&mut self, x: f32) -> bool {
        if (x - self.target_x()).abs() < PATROL_POINT_TOLERANCE {
            self.current = (self.current + 1) % self.points.len();
            self.direction = -self.direction;
            true
        } else {
            self.direction = if self.target_x() < x { -1.0 } else { 1.0 };
            false
        }
    }
}

/// A parametric flight path around a fixed center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightPath {
    /// Path shape
    pub pattern: FlightPattern,
    /// Path center (the spawn point)
    pub center: Vec2,
    /// Current phase (radians)
    pub phase: f32,
}

impl FlightPath {
    /// Creates a path starting at phase zero.
    #[must_use]
    pub const fn new(pattern: FlightPattern, center: Vec2) -> Self {
        Self {
            pattern,
            center,
            phase: 0.0,
        }
    }

    /// Angular speed for a given linear speed (rad/s).
    #[must_use]
    pub fn angular_speed(&self, speed: f32) -> f32 {
        match self.pattern {
            FlightPattern::Circle => speed / CIRCLE_RADIUS,
            FlightPattern::FigureEight => speed / FIGURE_EIGHT_WIDTH,
            FlightPattern::Hover => 2.0,
        }
    }

    /// Advances the phase by `dt` seconds at `speed` and returns the new waypoint.
    pub fn advance(&mut self, dt: f32, speed: f32) -> Vec2 {
        self.phase = (self.phase + self.angular_speed(speed) * dt) % std::f32::consts::TAU;
        self.point()
    }

    /// Waypoint at the current phase.
    #[must_use]
    pub fn point(&self) -> Vec2 {
        let p = self.phase;
        let offset = match self.pattern {
            FlightPattern::Circle => Vec2::new(p.cos(), p.sin()) * CIRCLE_RADIUS,
            FlightPattern::FigureEight => {
                Vec2::new(FIGURE_EIGHT_WIDTH * p.sin(), FIGURE_EIGHT_WIDTH * 0.5 * (2.0 * p).sin())
            },
            FlightPattern::Hover => Vec2::new(0.0, HOVER_AMPLITUDE * p.sin()),
        };
        self.center + offset
    }
}

/// Idle movement state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Movement {
    /// Walks between two points
    Patrol(PatrolRoute),
    /// Flies a path
    Flight(FlightPath),
    /// Guards a post
    Stationary {
        /// X coordinate of the post
        anchor_x: f32,
    },
}

/// Outcome of a hit on an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyHit {
    /// Survived with the given health
    Damaged {
        /// Remaining health
        remaining: i32,
    },
    /// Health reached zero; the enemy is now inactive
    Defeated,
}

/// An enemy in a level.
#[derive(Debug, Clone)]
pub struct Enemy {
    /// Entity ID
    pub id: EntityId,
    /// Species
    pub enemy_type: EnemyType,
    /// Host sprite
    pub sprite: SpriteHandle,
    /// Kinematic state
    pub body: Body,
    /// Damage per strike
    pub damage: i32,
    /// Behavior state
    pub state: EnemyState,
    /// Earliest time (ms) at which the next attack may start
    pub attack_cooldown: u64,
    /// Attack animation in progress
    pub is_attacking: bool,
    /// Currently chasing
    pub is_chasing: bool,
    /// May hop at close range
    pub is_aggressive: bool,
    /// Idle movement
    pub movement: Movement,
    /// Facing
    pub facing: Facing,
    /// Target locked on the last tick
    pub current_target: Option<EntityId>,
    /// Time the last attack started (ms)
    pub last_attack_at: Option<u64>,
    /// Animation currently shown
    pub cue: AnimationCue,
    health: i32,
    max_health: i32,
    active: bool,
}

/// Placement data needed to create an enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Species
    pub enemy_type: EnemyType,
    /// Spawn point
    pub position: Vec2,
    /// Health override
    #[serde(default)]
    pub health: Option<i32>,
    /// Damage override
    #[serde(default)]
    pub damage: Option<i32>,
    /// Flight pattern override for flyers
    #[serde(default)]
    pub flight: Option<FlightPattern>,
    /// Patrol point offsets from the spawn x
    #[serde(default)]
    pub patrol_offsets: Option<(f32, f32)>,
}

impl EnemySpawn {
    /// Spawn with archetype defaults.
    #[must_use]
    pub const fn new(enemy_type: EnemyType, position: Vec2) -> Self {
        Self {
            enemy_type,
            position,
            health: None,
            damage: None,
            flight: None,
            patrol_offsets: None,
        }
    }

    /// Overrides health and damage.
    #[must_use]
    pub const fn with_stats(mut self, health: i32, damage: i32) -> Self {
        self.health = Some(health);
        self.damage = Some(damage);
        self
    }

    /// Overrides the flight pattern.
    #[must_use]
    pub const fn with_flight(mut self, pattern: FlightPattern) -> Self {
        self.flight = Some(pattern);
        self
    }

    /// Overrides the patrol points as offsets from the spawn x.
    #[must_use]
    pub const fn with_patrol(mut self, left: f32, right: f32) -> Self {
        self.patrol_offsets = Some((left, right));
        self
    }
}

impl Enemy {
    /// Creates an enemy from a spawn record and its archetype stats.
    #[must_use]
    pub fn spawn(id: EntityId, sprite: SpriteHandle, spawn: &EnemySpawn, stats: &ArchetypeStats) -> Self {
        let position = spawn.position;
        let movement = match stats.movement {
            MovementKind::Patrol => {
                let (left, right) = spawn
                    .patrol_offsets
                    .unwrap_or((-stats.patrol_half_width, stats.patrol_half_width));
                Movement::Patrol(PatrolRoute::new(position.x, [position.x + left, position.x + right]))
            },
            MovementKind::Flight(pattern) => {
                Movement::Flight(FlightPath::new(spawn.flight.unwrap_or(pattern), position))
            },
            MovementKind::Stationary => Movement::Stationary { anchor_x: position.x },
        };
        let body = if spawn.enemy_type.is_airborne() {
            Body::floating(position)
        } else {
            Body::at(position)
        };
        let max_health = spawn.health.unwrap_or(stats.health).max(1);

        Self {
            id,
            enemy_type: spawn.enemy_type,
            sprite,
            body,
            damage: spawn.damage.unwrap_or(stats.damage),
            state: EnemyState::Patrol,
            attack_cooldown: 0,
            is_attacking: false,
            is_chasing: false,
            is_aggressive: stats.aggression.is_aggressive(),
            movement,
            facing: Facing::Right,
            current_target: None,
            last_attack_at: None,
            cue: AnimationCue::Idle,
            health: max_health,
            max_health,
            active: true,
        }
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

    /// Whether the enemy is still in play.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Applies damage; defeats the enemy at zero health.
    pub fn take_damage(&mut self, amount: i32) -> GameplayResult<EnemyHit> {
        if !self.active {
            return Err(GameplayError::StaleReference(self.id));
        }
        self.health = (self.health - amount.max(0)).max(0);
        if self.health == 0 {
            self.deactivate();
            Ok(EnemyHit::Defeated)
        } else {
            Ok(EnemyHit::Damaged { remaining: self.health })
        }
    }

    /// Removes the enemy from play. Deactivation is permanent.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.is_attacking = false;
        self.is_chasing = false;
        self.current_target = None;
        self.body.halt();
    }

    /// Clears the attack flag. Returns false if it was already clear.
    pub fn finish_attack(&mut self) -> bool {
        let was_attacking = self.is_attacking;
        self.is_attacking = false;
        was_attacking
    }
}
