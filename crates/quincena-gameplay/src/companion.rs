//! Follow heuristic for the AI helper.
//!
//! The helper lerps its horizontal velocity toward a point `follow_distance`
//! short of its leader, sprints when far behind, hops when blocked or when
//! the leader stands higher, and pushes sideways when wedged against a wall.
//! It is not pathfinding: complex geometry can still trap it.

use glam::Vec2;
use quincena_common::Facing;
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorKind};
use crate::body::Body;

/// Tunables of the follow heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowParams {
    /// Gap kept to the leader (px)
    pub follow_distance: f32,
    /// Proportional gain on the gap error
    pub gain: f32,
    /// Speed clamp at normal pace (px/s)
    pub max_speed: f32,
    /// Distance beyond which the helper sprints (px)
    pub sprint_distance: f32,
    /// Speed and clamp multiplier while sprinting
    pub sprint_multiplier: f32,
    /// Velocity smoothing factor per tick
    pub lerp: f32,
    /// Speed above which the run animation plays (px/s)
    pub run_threshold: f32,
    /// Speed needed to turn the sprite around (px/s)
    pub flip_threshold: f32,
    /// Horizontal range within which a hop is worth it (px)
    pub jump_range: f32,
    /// Height difference that counts as "leader is above" (px)
    pub height_margin: f32,
    /// Vertical hop impulse (negative is up)
    pub jump_velocity: f32,
    /// Lateral push applied while wedged (px/s)
    pub unstick_push: f32,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            follow_distance: 70.0,
            gain: 2.4,
            max_speed: 160.0,
            sprint_distance: 300.0,
            sprint_multiplier: 1.6,
            lerp: 0.2,
            run_threshold: 15.0,
            flip_threshold: 12.0,
            jump_range: 180.0,
            height_margin: 20.0,
            jump_velocity: -340.0,
            unstick_push: 60.0,
        }
    }
}

/// Animation the helper should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowAnimation {
    /// Standing
    Idle,
    /// Running
    Run,
}

/// Result of one follow step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowStep {
    /// Animation to play
    pub animation: FollowAnimation,
    /// Facing after the step
    pub facing: Facing,
    /// A hop was issued
    pub jumped: bool,
    /// The anti-stall push was applied
    pub unstuck: bool,
}

/// Leader the helper should follow: the player while alive, else the companion.
pub fn pick_follow_target(actors: &[Actor]) -> Option<&Actor> {
    let alive = |kind: ActorKind| actors.iter().find(|a| a.kind == kind && a.is_active());
    alive(ActorKind::Player).or_else(|| alive(ActorKind::Companion))
}

/// Side of the helper the leader is on. A leader right on top counts as
/// being to the left, so the helper backs off instead of standing still.
fn leader_side(dx: f32) -> f32 {
    if dx < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Velocity the helper wants before smoothing.
#[must_use]
pub fn desired_speed(dx: f32, params: &FollowParams) -> f32 {
    let error = dx - leader_side(dx) * params.follow_distance;
    let mut speed = (error * params.gain).clamp(-params.max_speed, params.max_speed);
    if dx.abs() > params.sprint_distance {
        let sprint_cap = params.max_speed * params.sprint_multiplier;
        speed = (speed * params.sprint_multiplier).clamp(-sprint_cap, sprint_cap);
    }
    speed
}

/// Runs one follow step, writing the new velocity into `body`.
pub fn update_follow(body: &mut Body, facing: Facing, target: Option<Vec2>, params: &FollowParams) -> FollowStep {
    let Some(target) = target else {
        body.halt_x();
        return FollowStep {
            animation: FollowAnimation::Idle,
            facing,
            jumped: false,
            unstuck: false,
        };
    };

    let dx = target.x - body.position.x;
    let desired = desired_speed(dx, params);
    let vx = body.velocity.x + (desired - body.velocity.x) * params.lerp;
    body.velocity.x = vx;

    let animation = if vx.abs() > params.run_threshold {
        FollowAnimation::Run
    } else {
        FollowAnimation::Idle
    };

    let facing = if vx < -params.flip_threshold {
        Facing::Left
    } else if vx > params.flip_threshold {
        Facing::Right
    } else {
        facing
    };

    let blocked = body.blocked_horizontally();
    let leader_above = target.y + params.height_margin < body.position.y;
    let close_enough = dx.abs() < params.jump_range;
    let jumped = body.grounded && (blocked || leader_above) && close_enough;
    if jumped {
        body.velocity.y = params.jump_velocity;
    }

    let unstuck = blocked && body.grounded;
    if unstuck {
        body.velocity.x = vx + leader_side(dx) * params.unstick_push;
    }

    FollowStep {
        animation,
        facing,
        jumped,
        unstuck,
    }
}
