//! Enemy archetypes and their tuning table.
//!
//! Each enemy type carries fixed stats. The built-in table matches the
//! shipped levels; a RON file can override any subset of entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GameplayError, GameplayResult};
use crate::range::RangeProfile;

/// Enemy species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyType {
    /// Ground brawler that hops at close range
    AngryPig,
    /// Heavy guard that charges from a fixed post
    Rino,
    /// Flyer on a circle or figure-eight path
    Bluebird,
    /// Hovering flyer
    Skull,
    /// Patrolling skeleton
    Skeleton,
    /// Skeleton that chases and strikes
    SkeletonMinion,
    /// Level 3 boss
    SkeletonBoss,
}

impl EnemyType {
    /// Every enemy type, in table order.
    pub const ALL: [Self; 7] = [
        Self::AngryPig,
        Self::Rino,
        Self::Bluebird,
        Self::Skull,
        Self::Skeleton,
        Self::SkeletonMinion,
        Self::SkeletonBoss,
    ];

    /// Returns true for the boss.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::SkeletonBoss)
    }

    /// Returns true for members of the skeleton family (silenced when the boss dies).
    #[must_use]
    pub const fn is_skeleton(self) -> bool {
        matches!(self, Self::Skeleton | Self::SkeletonMinion | Self::SkeletonBoss)
    }

    /// Returns true for types that ignore gravity.
    #[must_use]
    pub const fn is_airborne(self) -> bool {
        matches!(self, Self::Bluebird | Self::Skull)
    }

    /// Tag used in logs and data files.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::AngryPig => "angrypig",
            Self::Rino => "rino",
            Self::Bluebird => "bluebird",
            Self::Skull => "skull",
            Self::Skeleton => "skeleton",
            Self::SkeletonMinion => "skeleton_minion",
            Self::SkeletonBoss => "skeleton_boss",
        }
    }
}

/// How hard an enemy presses; shortens the attack cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggression {
    /// Base cooldown
    #[default]
    Calm,
    /// Cooldown divided by 1.5, may hop at close range
    Aggressive,
    /// Cooldown halved
    Frenzied,
}

impl Aggression {
    /// Cooldown divisor.
    #[must_use]
    pub const fn factor(self) -> f32 {
        match self {
            Self::Calm => 1.0,
            Self::Aggressive => 1.5,
            Self::Frenzied => 2.0,
        }
    }

    /// Whether the enemy counts as aggressive.
    #[must_use]
    pub const fn is_aggressive(self) -> bool {
        !matches!(self, Self::Calm)
    }
}

/// Flight path shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPattern {
    /// Circle around the spawn point
    Circle,
    /// Lissajous figure-eight
    FigureEight,
    /// Gentle vertical bob
    Hover,
}

/// Idle movement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Walk between two patrol points
    Patrol,
    /// Follow a flight path
    Flight(FlightPattern),
    /// Hold a post
    Stationary,
}

/// Animation keys for an archetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSet {
    /// Idle loop; also the fallback for missing keys
    pub idle: String,
    /// Walk/run/fly loop
    pub moving: String,
    /// Attack animation, if the art has one
    #[serde(default)]
    pub attack: Option<String>,
}

impl AnimationSet {
    fn new(idle: &str, moving: &str, attack: Option<&str>) -> Self {
        Self {
            idle: idle.to_string(),
            moving: moving.to_string(),
            attack: attack.map(str::to_string),
        }
    }

    /// Attack key, or idle when the art has none.
    #[must_use]
    pub fn attack_or_idle(&self) -> &str {
        self.attack.as_deref().unwrap_or(&self.idle)
    }
}

/// Fixed stats of an enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Starting health
    pub health: i32,
    /// Damage per strike
    pub damage: i32,
    /// Patrol speed (px/s)
    pub patrol_speed: f32,
    /// Chase speed as a multiple of patrol speed
    pub chase_multiplier: f32,
    /// Decision radii
    pub ranges: RangeProfile,
    /// Base attack cooldown before the aggression factor (ms)
    pub attack_cooldown_ms: u64,
    /// Aggression tier
    pub aggression: Aggression,
    /// Idle movement
    pub movement: MovementKind,
    /// Length of the attack animation (ms)
    pub attack_animation_ms: u64,
    /// Per-tick chance of a hop while close to the target
    pub jump_chance: f32,
    /// Vertical impulse of a hop (negative is up)
    pub jump_velocity: f32,
    /// Distance under which hops are considered
    pub close_range: f32,
    /// Patrol half-width around the spawn point
    pub patrol_half_width: f32,
    /// Camera shake on attack, as (duration ms, intensity)
    #[serde(default)]
    pub attack_shake: Option<(u64, f32)>,
    /// Animation keys
    pub animations: AnimationSet,
}

impl ArchetypeStats {
    /// Chase speed (px/s).
    #[must_use]
    pub fn chase_speed(&self) -> f32 {
        self.patrol_speed * self.chase_multiplier
    }

    /// Attack cooldown after the aggression factor (ms).
    #[must_use]
    pub fn cooldown_ms(&self) -> u64 {
        (self.attack_cooldown_ms as f32 / self.aggression.factor()).round() as u64
    }

    /// Checks the invariants every archetype must satisfy.
    pub fn validate(&self, enemy_type: EnemyType) -> GameplayResult<()> {
        let tag = enemy_type.tag();
        self.ranges
            .validate()
            .map_err(|err| GameplayError::Configuration(format!("{tag}: {err}")))?;
        if self.health <= 0 {
            return Err(GameplayError::Configuration(format!("{tag}: health must be positive")));
        }
        if self.damage < 0 {
            return Err(GameplayError::Configuration(format!("{tag}: damage must not be negative")));
        }
        if self.patrol_speed < 0.0 || self.chase_multiplier < 1.0 {
            return Err(GameplayError::Configuration(format!(
                "{tag}: patrol speed must be >= 0 and chase multiplier >= 1"
            )));
        }
        if !(0.0..=1.0).contains(&self.jump_chance) {
            return Err(GameplayError::Configuration(format!("{tag}: jump chance must be in [0, 1]")));
        }
        if self.attack_cooldown_ms == 0 {
            return Err(GameplayError::Configuration(format!("{tag}: attack cooldown must be positive")));
        }
        Ok(())
    }
}

/// Lookup table from enemy type to stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeTable {
    entries: BTreeMap<EnemyType, ArchetypeStats>,
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ArchetypeTable {
    /// The shipped tuning.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        for enemy_type in EnemyType::ALL {
            entries.insert(enemy_type, builtin_stats(enemy_type));
        }
        Self { entries }
    }

    /// Parses a RON override map and merges it over the built-in table.
    ///
    /// The RON document is a map from enemy tag to a full stats record.
    pub fn from_ron_overrides(source: &str) -> GameplayResult<Self> {
        let overrides: BTreeMap<EnemyType, ArchetypeStats> = ron::from_str(source)
            .map_err(|err| GameplayError::Configuration(format!("archetype overrides: {err}")))?;

        let mut table = Self::builtin();
        for (enemy_type, stats) in overrides {
            debug!("Overriding archetype {}", enemy_type.tag());
            table.entries.insert(enemy_type, stats);
        }
        table.validate()?;
        info!("Loaded archetype table with {} entries", table.entries.len());
        Ok(table)
    }

    /// Serializes the table to pretty RON.
    pub fn to_ron(&self) -> GameplayResult<String> {
        ron::ser::to_string_pretty(&self.entries, ron::ser::PrettyConfig::default())
            .map_err(|err| GameplayError::Configuration(format!("archetype serialization: {err}")))
    }

    /// Validates every entry.
    pub fn validate(&self) -> GameplayResult<()> {
        for (enemy_type, stats) in &self.entries {
            stats.validate(*enemy_type)?;
        }
        Ok(())
    }

    /// Stats for a type.
    pub fn get(&self, enemy_type: EnemyType) -> GameplayResult<&ArchetypeStats> {
        self.entries.get(&enemy_type).ok_or_else(|| {
            GameplayError::Configuration(format!("no archetype for {}", enemy_type.tag()))
        })
    }

    /// Replaces the stats for a type.
    pub fn insert(&mut self, enemy_type: EnemyType, stats: ArchetypeStats) -> GameplayResult<()> {
        stats.validate(enemy_type)?;
        self.entries.insert(enemy_type, stats);
        Ok(())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn ranges(attack: f32, detection: f32, chase: f32) -> RangeProfile {
    RangeProfile {
        attack_range: attack,
        detection_range: detection,
        chase_range: chase,
    }
}

fn builtin_stats(enemy_type: EnemyType) -> ArchetypeStats {
    match enemy_type {
        EnemyType::AngryPig => ArchetypeStats {
            health: 20,
            damage: 10,
            patrol_speed: 60.0,
            chase_multiplier: 1.5,
            ranges: ranges(70.0, 200.0, 300.0),
            attack_cooldown_ms: 1500,
            aggression: Aggression::Aggressive,
            movement: MovementKind::Patrol,
            attack_animation_ms: 500,
            jump_chance: 0.015,
            jump_velocity: -300.0,
            close_range: 120.0,
            patrol_half_width: 100.0,
            attack_shake: None,
            animations: AnimationSet::new("angrypig-idle", "angrypig-run", None),
        },
        EnemyType::Rino => ArchetypeStats {
            health: 80,
            damage: 30,
            patrol_speed: 80.0,
            chase_multiplier: 1.5,
            ranges: ranges(90.0, 180.0, 260.0),
            attack_cooldown_ms: 2000,
            aggression: Aggression::Calm,
            movement: MovementKind::Stationary,
            attack_animation_ms: 600,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 0.0,
            attack_shake: None,
            animations: AnimationSet::new("rino-idle", "rino-run", None),
        },
        EnemyType::Bluebird => ArchetypeStats {
            health: 60,
            damage: 30,
            patrol_speed: 70.0,
            chase_multiplier: 1.5,
            ranges: ranges(90.0, 250.0, 320.0),
            attack_cooldown_ms: 1800,
            aggression: Aggression::Calm,
            movement: MovementKind::Flight(FlightPattern::Circle),
            attack_animation_ms: 400,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 0.0,
            attack_shake: None,
            animations: AnimationSet::new("bluebird-flying", "bluebird-flying", None),
        },
        EnemyType::Skull => ArchetypeStats {
            health: 70,
            damage: 25,
            patrol_speed: 50.0,
            chase_multiplier: 1.5,
            ranges: ranges(90.0, 220.0, 300.0),
            attack_cooldown_ms: 1600,
            aggression: Aggression::Aggressive,
            movement: MovementKind::Flight(FlightPattern::Hover),
            attack_animation_ms: 400,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 0.0,
            attack_shake: None,
            animations: AnimationSet::new("skull-idle1", "skull-idle1", None),
        },
        EnemyType::Skeleton => ArchetypeStats {
            health: 90,
            damage: 20,
            patrol_speed: 60.0,
            chase_multiplier: 1.5,
            ranges: ranges(70.0, 180.0, 250.0),
            attack_cooldown_ms: 1500,
            aggression: Aggression::Calm,
            movement: MovementKind::Patrol,
            attack_animation_ms: 600,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 150.0,
            attack_shake: None,
            animations: AnimationSet::new(
                "skeleton_walk_anim",
                "skeleton_walk_anim",
                Some("skeleton_attack_anim"),
            ),
        },
        EnemyType::SkeletonMinion => ArchetypeStats {
            health: 100,
            damage: 35,
            patrol_speed: 40.0,
            chase_multiplier: 1.5,
            ranges: ranges(80.0, 250.0, 320.0),
            attack_cooldown_ms: 1500,
            aggression: Aggression::Calm,
            movement: MovementKind::Patrol,
            attack_animation_ms: 600,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 100.0,
            attack_shake: None,
            animations: AnimationSet::new(
                "skeleton_walk_anim",
                "skeleton_walk_anim",
                Some("skeleton_attack_anim"),
            ),
        },
        EnemyType::SkeletonBoss => ArchetypeStats {
            health: 250,
            damage: 50,
            patrol_speed: 50.0,
            chase_multiplier: 1.6,
            ranges: ranges(120.0, 250.0, 340.0),
            attack_cooldown_ms: 1500,
            aggression: Aggression::Aggressive,
            movement: MovementKind::Patrol,
            attack_animation_ms: 700,
            jump_chance: 0.0,
            jump_velocity: 0.0,
            close_range: 0.0,
            patrol_half_width: 125.0,
            attack_shake: Some((300, 0.02)),
            animations: AnimationSet::new(
                "skeleton_walk_anim",
                "skeleton_walk_anim",
                Some("skeleton_attack_anim"),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = ArchetypeTable::builtin();
        assert_eq!(table.len(), EnemyType::ALL.len());
        table.validate().expect("builtin table validates");
    }

    #[test]
    fn test_cooldown_follows_aggression() {
        let table = ArchetypeTable::builtin();
        let boss = table.get(EnemyType::SkeletonBoss).expect("boss");
        assert_eq!(boss.cooldown_ms(), 1000);
        let minion = table.get(EnemyType::SkeletonMinion).expect("minion");
        assert_eq!(minion.cooldown_ms(), 1500);
        assert!((boss.chase_speed() - 80.0).abs() < 1e-4);
        assert!((minion.chase_speed() - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_attack_animation_fallback() {
        let table = ArchetypeTable::builtin();
        let pig = table.get(EnemyType::AngryPig).expect("pig");
        assert_eq!(pig.animations.attack_or_idle(), "angrypig-idle");
        let boss = table.get(EnemyType::SkeletonBoss).expect("boss");
        assert_eq!(boss.animations.attack_or_idle(), "skeleton_attack_anim");
    }

    #[test]
    fn test_ron_override_merges() {
        let mut pig = builtin_stats(EnemyType::AngryPig);
        pig.health = 45;
        let mut overrides = BTreeMap::new();
        overrides.insert(EnemyType::AngryPig, pig);
        let source = ron::to_string(&overrides).expect("serialize overrides");

        let table = ArchetypeTable::from_ron_overrides(&source).expect("parse overrides");
        assert_eq!(table.get(EnemyType::AngryPig).expect("pig").health, 45);
        assert_eq!(table.get(EnemyType::Rino).expect("rino").health, 80);
    }

    #[test]
    fn test_ron_override_rejects_bad_ranges() {
        let mut pig = builtin_stats(EnemyType::AngryPig);
        pig.ranges.detection_range = 10.0;
        let mut overrides = BTreeMap::new();
        overrides.insert(EnemyType::AngryPig, pig);
        let source = ron::to_string(&overrides).expect("serialize overrides");

        let err = ArchetypeTable::from_ron_overrides(&source).expect_err("must reject");
        assert!(matches!(err, GameplayError::Configuration(_)));
    }

    #[test]
    fn test_table_roundtrips_through_ron() {
        let table = ArchetypeTable::builtin();
        let text = table.to_ron().expect("serialize");
        let parsed = ArchetypeTable::from_ron_overrides(&text).expect("parse");
        assert_eq!(parsed, table);
    }
}
