//! Per-level progress and the payload handed between levels.

use serde::{Deserialize, Serialize};

use crate::level::LevelId;

/// Progress carried between levels and reported at game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPayload {
    /// Score so far
    pub score: u32,
    /// Coins collected in the level that produced the payload
    pub coins_collected: u32,
    /// Enemies killed so far
    pub enemies_killed: u32,
    /// Player health
    pub health: i32,
    /// Level number (1-based)
    pub level: u8,
}

/// Mutable progress for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Current level
    pub level: LevelId,
    /// Score
    pub score: u32,
    /// Player health as last reported
    pub health: i32,
    /// Coins picked up in this level
    pub coins_collected: u32,
    /// Coins placed in this level
    pub total_coins: u32,
    /// Enemies killed across the run
    pub enemies_killed: u32,
}

impl GameState {
    /// Fresh state for a level.
    #[must_use]
    pub const fn new(level: LevelId, total_coins: u32, health: i32) -> Self {
        Self {
            level,
            score: 0,
            health,
            coins_collected: 0,
            total_coins,
            enemies_killed: 0,
        }
    }

    /// State for a level entered from a previous one. Coins reset; score,
    /// kills and health carry over.
    #[must_use]
    pub const fn carried_over(level: LevelId, total_coins: u32, previous: &LevelPayload) -> Self {
        Self {
            level,
            score: previous.score,
            health: previous.health,
            coins_collected: 0,
            total_coins,
            enemies_killed: previous.enemies_killed,
        }
    }

    /// Adds points.
    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Records a coin worth `value` points. Returns true once every coin is in.
    pub fn record_coin(&mut self, value: u32) -> bool {
        self.coins_collected += 1;
        self.add_score(value);
        self.all_coins_collected()
    }

    /// Records a kill worth `points`.
    pub fn record_kill(&mut self, points: u32) {
        self.enemies_killed += 1;
        self.add_score(points);
    }

    /// Whether every coin has been picked up.
    #[must_use]
    pub const fn all_coins_collected(&self) -> bool {
        self.coins_collected >= self.total_coins
    }

    /// Snapshot for scene transitions.
    #[must_use]
    pub const fn payload(&self) -> LevelPayload {
        LevelPayload {
            score: self.score,
            coins_collected: self.coins_collected,
            enemies_killed: self.enemies_killed,
            health: self.health,
            level: self.level.number(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coins_complete_level() {
        let mut state = GameState::new(LevelId::One, 2, 100);
        assert!(!state.record_coin(100));
        assert!(state.record_coin(100));
        assert_eq!(state.score, 200);
    }

    #[test]
    fn test_carry_over_resets_coins() {
        let mut state = GameState::new(LevelId::One, 4, 100);
        state.record_coin(100);
        state.record_kill(50);
        state.health = 70;
        let payload = state.payload();
        assert_eq!(payload.level, 1);

        let next = GameState::carried_over(LevelId::Two, 8, &payload);
        assert_eq!(next.coins_collected, 0);
        assert_eq!(next.score, 150);
        assert_eq!(next.health, 70);
        assert_eq!(next.enemies_killed, 1);
    }

    #[test]
    fn test_payload_json_shape() {
        let state = GameState::new(LevelId::Three, 20, 55);
        let json = serde_json::to_string(&state.payload()).expect("serialize");
        assert_eq!(
            json,
            r#"{"score":0,"coinsCollected":0,"enemiesKilled":0,"health":55,"level":3}"#
        );
    }
}
