//! Geometry helpers: horizontal facing and world bounds.

use crate::error::{CommonError, CommonResult};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Horizontal facing of a sprite.
///
/// Sprites are authored facing right, so `Left` maps to a flipped sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Facing negative x
    Left,
    /// Facing positive x
    #[default]
    Right,
}

impl Facing {
    /// Facing from the sign of a horizontal delta. Zero keeps `Right`.
    #[must_use]
    pub fn from_sign(dx: f32) -> Self {
        if dx < 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// Facing an entity at `from_x` needs to look at `to_x`.
    #[must_use]
    pub fn towards(from_x: f32, to_x: f32) -> Self {
        Self::from_sign(to_x - from_x)
    }

    /// -1.0 for left, +1.0 for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Sprite flip flag for this facing.
    #[must_use]
    pub const fn flip_x(self) -> bool {
        matches!(self, Self::Left)
    }

    /// Facing implied by a sprite flip flag.
    #[must_use]
    pub const fn from_flip(flip_x: bool) -> Self {
        if flip_x {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// The opposite facing.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Returns true if `x` lies on the side this facing points to, seen from `origin_x`.
    #[must_use]
    pub fn faces(self, origin_x: f32, x: f32) -> bool {
        match self {
            Self::Left => x <= origin_x,
            Self::Right => x >= origin_x,
        }
    }
}

/// Axis-aligned playable area of a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl WorldBounds {
    /// Creates bounds, rejecting empty or inverted rectangles.
    pub fn new(min: Vec2, max: Vec2) -> CommonResult<Self> {
        if min.x >= max.x {
            return Err(CommonError::InvalidBounds { min: min.x, max: max.x });
        }
        if min.y >= max.y {
            return Err(CommonError::InvalidBounds { min: min.y, max: max.y });
        }
        Ok(Self { min, max })
    }

    /// Bounds spanning `width` x `height` from the origin.
    pub fn from_size(width: f32, height: f32) -> CommonResult<Self> {
        Self::new(Vec2::ZERO, Vec2::new(width, height))
    }

    /// Level width.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Returns true if `x` is inside the horizontal span widened by `margin` on each side.
    #[must_use]
    pub fn contains_x_with_margin(&self, x: f32, margin: f32) -> bool {
        x >= self.min.x - margin && x <= self.max.x + margin
    }

    /// Clamps a point into the rectangle.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Sign of `value` as -1, 0 or +1, with zero mapping to zero.
#[must_use]
pub fn signum_or_zero(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_facing_flip_roundtrip() {
        for facing in [Facing::Left, Facing::Right] {
            assert_eq!(Facing::from_flip(facing.flip_x()), facing);
            assert_eq!(facing.reversed().reversed(), facing);
        }
    }

    #[test]
    fn test_faces_side() {
        assert!(Facing::Left.faces(100.0, 20.0));
        assert!(!Facing::Left.faces(100.0, 180.0));
        assert!(Facing::Right.faces(100.0, 180.0));
    }

    #[test]
    fn test_bounds_reject_inverted() {
        assert!(WorldBounds::new(Vec2::new(10.0, 0.0), Vec2::new(5.0, 10.0)).is_err());
        assert!(WorldBounds::from_size(0.0, 600.0).is_err());
    }

    #[test]
    fn test_margin_check() {
        let bounds = WorldBounds::from_size(4000.0, 600.0).expect("valid bounds");
        assert!(bounds.contains_x_with_margin(-99.0, 100.0));
        assert!(!bounds.contains_x_with_margin(-101.0, 100.0));
        assert!(!bounds.contains_x_with_margin(4101.0, 100.0));
    }

    #[test]
    fn test_signum_or_zero() {
        assert_eq!(signum_or_zero(3.0), 1.0);
        assert_eq!(signum_or_zero(-0.5), -1.0);
        assert_eq!(signum_or_zero(0.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_clamp_stays_inside(x in -1.0e4f32..1.0e4, y in -1.0e4f32..1.0e4) {
            let bounds = WorldBounds::from_size(2400.0, 600.0).expect("valid bounds");
            let p = bounds.clamp(Vec2::new(x, y));
            prop_assert!(p.x >= 0.0 && p.x <= 2400.0);
            prop_assert!(p.y >= 0.0 && p.y <= 600.0);
        }
    }
}
