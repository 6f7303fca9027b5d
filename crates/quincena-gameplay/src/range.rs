//! Range classification with hysteresis.
//!
//! An idle enemy starts chasing at `detection_range` but, once engaged, keeps
//! chasing out to the wider `chase_range`. The gap between the two stops the
//! patrol/chase state from flickering when a target hovers at the edge.

use serde::{Deserialize, Serialize};

use crate::error::{GameplayError, GameplayResult};

/// Distance band a target falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeBand {
    /// Close enough to strike
    Attack,
    /// Worth pursuing
    Chase,
    /// Out of interest
    Patrol,
}

/// The three radii that drive an enemy's decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeProfile {
    /// Radius inside which the enemy attacks
    pub attack_range: f32,
    /// Radius at which an idle enemy notices a target
    pub detection_range: f32,
    /// Radius at which an engaged enemy gives up
    pub chase_range: f32,
}

impl RangeProfile {
    /// Creates a validated profile.
    pub fn new(attack_range: f32, detection_range: f32, chase_range: f32) -> GameplayResult<Self> {
        let profile = Self {
            attack_range,
            detection_range,
            chase_range,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks `0 <= attack < detection < chase`.
    pub fn validate(&self) -> GameplayResult<()> {
        let ordered = self.attack_range >= 0.0
            && self.attack_range < self.detection_range
            && self.detection_range < self.chase_range;
        if ordered {
            Ok(())
        } else {
            Err(GameplayError::Configuration(format!(
                "range radii must satisfy attack < detection < chase, got {} / {} / {}",
                self.attack_range, self.detection_range, self.chase_range
            )))
        }
    }

    /// Classifies a target distance.
    ///
    /// `engaged` is true while the enemy is chasing, attacking or cooling down.
    #[must_use]
    pub fn classify(&self, distance: f32, engaged: bool) -> RangeBand {
        let pursuit_radius = if engaged {
            self.chase_range
        } else {
            self.detection_range
        };

        if distance < self.attack_range {
            RangeBand::Attack
        } else if distance < pursuit_radius {
            RangeBand::Chase
        } else {
            RangeBand::Patrol
        }
    }
}
