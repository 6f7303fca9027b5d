//! Level identifiers and spawn tables for the three shipped levels.

use glam::Vec2;
use quincena_common::Facing;
use serde::{Deserialize, Serialize};

use crate::archetype::{EnemyType, FlightPattern};
use crate::cannon::CannonSpawn;
use crate::enemy::EnemySpawn;

/// Ground line the heroes stand on at level start.
pub const BASE_Y: f32 = 450.0;

/// Which level is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelId {
    /// Training grounds
    One,
    /// The skies
    Two,
    /// The skeleton fortress
    Three,
}

impl LevelId {
    /// 1-based level number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Level from its number.
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }

    /// The level that follows, or `None` after the last one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => None,
        }
    }
}

/// What a potion does when picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotionEffect {
    /// Health restored to the actor who picked it up
    pub heal: i32,
    /// Points awarded
    pub score: u32,
}

/// Static description of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Level
    pub id: LevelId,
    /// World width (px)
    pub world_width: f32,
    /// World height (px)
    pub world_height: f32,
    /// Points per coin
    pub coin_value: u32,
    /// Coin positions
    pub coins: Vec<Vec2>,
    /// Potion positions
    pub potions: Vec<Vec2>,
    /// Potion effect
    pub potion: PotionEffect,
    /// Whether Motocle joins this level
    pub helper: bool,
    /// Player start
    pub player_start: Vec2,
    /// Companion start
    pub companion_start: Vec2,
    /// Helper start (off-screen)
    pub helper_start: Vec2,
    /// Where the helper runs to when it enters
    pub helper_entry_x: f32,
    /// Enemy placements
    pub enemies: Vec<EnemySpawn>,
    /// Cannon placements
    pub cannons: Vec<CannonSpawn>,
}

fn points(raw: &[(f32, f32)]) -> Vec<Vec2> {
    raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}

impl LevelSpec {
    /// Built-in layout of a level.
    #[must_use]
    pub fn builtin(id: LevelId) -> Self {
        match id {
            LevelId::One => Self::level_one(),
            LevelId::Two => Self::level_two(),
            LevelId::Three => Self::level_three(),
        }
    }

    /// Number of coins placed.
    #[must_use]
    pub fn total_coins(&self) -> u32 {
        self.coins.len() as u32
    }

    /// Whether a boss is placed.
    #[must_use]
    pub fn has_boss(&self) -> bool {
        self.enemies.iter().any(|spawn| spawn.enemy_type.is_boss())
    }

    fn base(id: LevelId, world_width: f32) -> Self {
        Self {
            id,
            world_width,
            world_height: 600.0,
            coin_value: 100,
            coins: Vec::new(),
            potions: Vec::new(),
            potion: PotionEffect { heal: 0, score: 50 },
            helper: true,
            player_start: Vec2::new(100.0, BASE_Y),
            companion_start: Vec2::new(50.0, BASE_Y),
            helper_start: Vec2::new(-200.0, BASE_Y),
            helper_entry_x: 320.0,
            enemies: Vec::new(),
            cannons: Vec::new(),
        }
    }

    fn level_one() -> Self {
        let pig = |x, y| EnemySpawn::new(EnemyType::AngryPig, Vec2::new(x, y)).with_stats(20, 10);
        Self {
            coin_value: 100,
            coins: points(&[(750.0, 350.0), (1200.0, 430.0), (1600.0, 300.0), (2000.0, 370.0)]),
            potions: points(&[(1000.0, 200.0), (1800.0, 150.0)]),
            enemies: vec![pig(500.0, 400.0), pig(1000.0, 380.0), pig(1500.0, 300.0)],
            ..Self::base(LevelId::One, 2400.0)
        }
    }

    fn level_two() -> Self {
        let spawn = |enemy_type, x, y, health, damage| {
            EnemySpawn::new(enemy_type, Vec2::new(x, y)).with_stats(health, damage)
        };
        let bird = |x, y| spawn(EnemyType::Bluebird, x, y, 60, 30).with_flight(FlightPattern::Circle);

        let mut enemies = Vec::new();
        for (x, y) in [(700.0, 400.0), (1300.0, 350.0), (2100.0, 450.0), (2900.0, 380.0)] {
            enemies.push(spawn(EnemyType::AngryPig, x, y, 75, 25));
        }
        for (x, y) in [(800.0, 400.0), (1900.0, 300.0), (3000.0, 450.0)] {
            enemies.push(spawn(EnemyType::Skull, x, y, 70, 25));
        }
        for (x, y) in [(1100.0, 150.0), (1600.0, 120.0), (2200.0, 180.0), (2700.0, 100.0)] {
            enemies.push(bird(x, y));
        }
        for (x, y) in [(1400.0, 350.0), (2500.0, 420.0)] {
            enemies.push(spawn(EnemyType::Rino, x, y, 80, 30));
        }

        Self {
            coin_value: 150,
            coins: points(&[
                (600.0, 400.0),
                (900.0, 330.0),
                (1300.0, 270.0),
                (1700.0, 430.0),
                (2000.0, 200.0),
                (2400.0, 350.0),
                (2600.0, 150.0),
                (2800.0, 300.0),
            ]),
            potions: points(&[(1000.0, 200.0), (1500.0, 150.0), (2100.0, 100.0), (2600.0, 250.0)]),
            potion: PotionEffect { heal: 60, score: 0 },
            enemies,
            ..Self::base(LevelId::Two, 4000.0)
        }
    }

    fn level_three() -> Self {
        let world_width = 4000.0;
        let spawn = |enemy_type, x, y, health, damage| {
            EnemySpawn::new(enemy_type, Vec2::new(x, y)).with_stats(health, damage)
        };

        let mut enemies = vec![spawn(EnemyType::Skeleton, 300.0, 500.0, 90, 20).with_patrol(0.0, 300.0)];
        for (x, y) in [(600.0, 450.0), (2400.0, 350.0)] {
            enemies.push(spawn(EnemyType::AngryPig, x, y, 70, 15));
        }
        for (x, y) in [(900.0, 330.0), (1700.0, 430.0), (2800.0, 300.0)] {
            enemies.push(spawn(EnemyType::Bluebird, x, y, 60, 15).with_flight(FlightPattern::FigureEight));
        }
        enemies.push(spawn(EnemyType::Rino, 1300.0, 270.0, 100, 20));
        for (x, y) in [(800.0, 500.0), (1400.0, 450.0), (2200.0, 480.0), (2600.0, 420.0)] {
            enemies.push(spawn(EnemyType::SkeletonMinion, x, y, 100, 35).with_patrol(-100.0, 100.0));
        }
        enemies.push(
            spawn(EnemyType::SkeletonBoss, world_width - 200.0, 500.0, 250, 50).with_patrol(-150.0, 100.0),
        );

        let cannons = vec![
            CannonSpawn {
                position: Vec2::new(1200.0, 250.0),
                direction: Facing::Left,
                fire_rate_ms: 3500,
                damage: 15,
            },
            CannonSpawn {
                position: Vec2::new(2800.0, 350.0),
                direction: Facing::Right,
                fire_rate_ms: 4000,
                damage: 15,
            },
        ];

        Self {
            coin_value: 200,
            coins: points(&[
                (200.0, 450.0),
                (250.0, 450.0),
                (300.0, 450.0),
                (600.0, 400.0),
                (650.0, 400.0),
                (700.0, 400.0),
                (900.0, 350.0),
                (950.0, 350.0),
                (1000.0, 350.0),
                (400.0, 250.0),
                (800.0, 200.0),
                (1200.0, 150.0),
                (1300.0, 300.0),
                (1350.0, 300.0),
                (1400.0, 300.0),
                (1700.0, 430.0),
                (2000.0, 200.0),
                (2400.0, 350.0),
                (2600.0, 150.0),
                (2800.0, 300.0),
            ]),
            potions: points(&[
                (1000.0, 200.0),
                (1500.0, 150.0),
                (2100.0, 100.0),
                (2600.0, 250.0),
                (800.0, 180.0),
                (1300.0, 250.0),
            ]),
            potion: PotionEffect { heal: 80, score: 0 },
            helper: false,
            enemies,
            cannons,
            ..Self::base(LevelId::Three, world_width)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_numbers() {
        for id in [LevelId::One, LevelId::Two, LevelId::Three] {
            assert_eq!(LevelId::from_number(id.number()), Some(id));
        }
        assert_eq!(LevelId::from_number(4), None);
        assert_eq!(LevelId::Three.next(), None);
    }

    #[test]
    fn test_builtin_counts() {
        let one = LevelSpec::builtin(LevelId::One);
        assert_eq!(one.total_coins(), 4);
        assert_eq!(one.enemies.len(), 3);
        assert!(one.cannons.is_empty());

        let two = LevelSpec::builtin(LevelId::Two);
        assert_eq!(two.total_coins(), 8);
        assert_eq!(two.enemies.len(), 13);
        assert!(two.helper);

        let three = LevelSpec::builtin(LevelId::Three);
        assert_eq!(three.total_coins(), 20);
        assert_eq!(three.cannons.len(), 2);
        assert!(three.has_boss());
        assert!(!three.helper);
    }
}
