//! Kinematic body state shared by actors, enemies and projectiles.
//!
//! The host physics engine owns integration. Gameplay reads position and
//! contact flags and writes velocity; the host copies both ways each frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Position, velocity and contact flags of an arcade body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    /// World position (pixels)
    pub position: Vec2,
    /// Velocity (pixels per second)
    pub velocity: Vec2,
    /// Standing on ground or a platform
    pub grounded: bool,
    /// Touching a wall on the left
    pub blocked_left: bool,
    /// Touching a wall on the right
    pub blocked_right: bool,
    /// Whether gravity applies (false for flyers and the cannon)
    pub gravity: bool,
}

impl Body {
    /// Creates a resting body affected by gravity.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            gravity: true,
            ..Self::default()
        }
    }

    /// Creates a body that ignores gravity.
    #[must_use]
    pub fn floating(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// True when touching a wall on either side.
    #[must_use]
    pub const fn blocked_horizontally(&self) -> bool {
        self.blocked_left || self.blocked_right
    }

    /// Distance between body centers.
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position.distance(point)
    }

    /// Zeroes horizontal velocity.
    pub fn halt_x(&mut self) {
        self.velocity.x = 0.0;
    }

    /// Zeroes both velocity components.
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let walker = Body::at(Vec2::new(10.0, 20.0));
        assert!(walker.gravity);
        let flyer = Body::floating(Vec2::new(10.0, 20.0));
        assert!(!flyer.gravity);
        assert!(!flyer.blocked_horizontally());
    }

    #[test]
    fn test_distance_to() {
        let body = Body::at(Vec2::new(0.0, 0.0));
        assert!((body.distance_to(Vec2::new(3.0, 4.0)) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_halt() {
        let mut body = Body::at(Vec2::ZERO);
        body.velocity = Vec2::new(30.0, -40.0);
        body.halt_x();
        assert_eq!(body.velocity, Vec2::new(0.0, -40.0));
        body.halt();
        assert_eq!(body.velocity, Vec2::ZERO);
    }
}
