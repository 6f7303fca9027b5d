//! Headless host: implements the gameplay collaborator traits with logging
//! instead of sprites, and captures the scene transition that ends a level.

use ahash::{AHashMap, AHashSet};
use glam::Vec2;
use quincena_common::SpriteHandle;
use quincena_gameplay::{
    ArchetypeTable, EnemyType, GameplayError, GameplayResult, Hud, LevelPayload, Presenter, SceneDirector,
    HELPER_IDLE_ANIMATION, HELPER_RUN_ANIMATION,
};
use tracing::{debug, info, trace};

/// How a level ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    /// Every coin collected and the transition delay elapsed
    Complete(LevelPayload),
    /// Both heroes down
    GameOver(LevelPayload),
}

/// Last values pushed to the HUD.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HudSnapshot {
    /// Player health
    pub health: i32,
    /// Companion health
    pub companion_health: i32,
    /// Score
    pub score: u32,
    /// Coins collected
    pub coins: u32,
    /// Boss health fraction, once shown
    pub boss: Option<f32>,
}

/// Host with no renderer.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    animations: AHashSet<String>,
    playing: AHashMap<SpriteHandle, String>,
    outcome: Option<LevelOutcome>,
    hud: HudSnapshot,
    shakes: u32,
}

impl HeadlessHost {
    /// Creates a host that knows every animation named by `archetypes`.
    #[must_use]
    pub fn new(archetypes: &ArchetypeTable) -> Self {
        let mut animations = AHashSet::new();
        for enemy_type in EnemyType::ALL {
            if let Ok(stats) = archetypes.get(enemy_type) {
                animations.insert(stats.animations.idle.clone());
                animations.insert(stats.animations.moving.clone());
                if let Some(attack) = &stats.animations.attack {
                    animations.insert(attack.clone());
                }
            }
        }
        animations.insert(HELPER_RUN_ANIMATION.to_string());
        animations.insert(HELPER_IDLE_ANIMATION.to_string());
        Self {
            animations,
            ..Self::default()
        }
    }

    /// Takes the captured scene transition, if one happened.
    pub fn take_outcome(&mut self) -> Option<LevelOutcome> {
        self.outcome.take()
    }

    /// HUD state.
    #[must_use]
    pub const fn hud(&self) -> &HudSnapshot {
        &self.hud
    }

    /// Camera shakes requested so far.
    #[must_use]
    pub const fn shakes(&self) -> u32 {
        self.shakes
    }
}

impl Presenter for HeadlessHost {
    fn play_animation(&mut self, sprite: SpriteHandle, key: &str) -> GameplayResult<()> {
        if !self.animations.contains(key) {
            return Err(GameplayError::Configuration(format!("unknown animation {key}")));
        }
        if self.playing.get(&sprite).map(String::as_str) != Some(key) {
            trace!("sprite {:?} plays {key}", sprite);
            self.playing.insert(sprite, key.to_string());
        }
        Ok(())
    }

    fn set_texture(&mut self, sprite: SpriteHandle, key: &str) {
        trace!("sprite {:?} texture {key}", sprite);
    }

    fn set_flip_x(&mut self, _sprite: SpriteHandle, _flip: bool) {}

    fn set_tint(&mut self, _sprite: SpriteHandle, _rgb: u32) {}

    fn clear_tint(&mut self, _sprite: SpriteHandle) {}

    fn set_visible(&mut self, sprite: SpriteHandle, visible: bool) {
        trace!("sprite {:?} visible={visible}", sprite);
    }

    fn camera_shake(&mut self, duration_ms: u64, intensity: f32) {
        self.shakes += 1;
        trace!("camera shake {duration_ms}ms x{intensity}");
    }

    fn spawn_projectile(&mut self, sprite: SpriteHandle, position: Vec2, velocity: Vec2) {
        trace!("projectile {:?} at {position} moving {velocity}", sprite);
    }

    fn despawn(&mut self, sprite: SpriteHandle) {
        self.playing.remove(&sprite);
        trace!("despawn {:?}", sprite);
    }

    fn spawn_explosion(&mut self, position: Vec2, radius: f32) {
        debug!("explosion at {position} r={radius}");
    }
}

impl Hud for HeadlessHost {
    fn update_health(&mut self, current: i32, max: i32) {
        if self.hud.health != current {
            debug!("HUD player health {current}/{max}");
        }
        self.hud.health = current;
    }

    fn update_companion_health(&mut self, current: i32, max: i32) {
        if self.hud.companion_health != current {
            debug!("HUD companion health {current}/{max}");
        }
        self.hud.companion_health = current;
    }

    fn update_score(&mut self, score: u32) {
        self.hud.score = score;
    }

    fn update_coins(&mut self, collected: u32, total: u32) {
        if self.hud.coins != collected {
            debug!("HUD coins {collected}/{total}");
        }
        self.hud.coins = collected;
    }

    fn update_boss_health(&mut self, fraction: f32) {
        self.hud.boss = Some(fraction);
    }
}

impl SceneDirector for HeadlessHost {
    fn game_over(&mut self, payload: LevelPayload) {
        info!("Scene: game over");
        self.outcome = Some(LevelOutcome::GameOver(payload));
    }

    fn level_complete(&mut self, payload: LevelPayload) {
        info!("Scene: level {} complete", payload.level);
        self.outcome = Some(LevelOutcome::Complete(payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_gameplay::play_with_fallback;

    #[test]
    fn test_knows_archetype_animations() {
        let mut host = HeadlessHost::new(&ArchetypeTable::builtin());
        let sprite = SpriteHandle::new(1);
        assert!(host.play_animation(sprite, "skeleton_attack_anim").is_ok());
        assert!(host.play_animation(sprite, HELPER_RUN_ANIMATION).is_ok());
        assert_eq!(host.playing.get(&sprite).map(String::as_str), Some(HELPER_RUN_ANIMATION));

        // Unknown clip leaves the current one in place
        assert!(host.play_animation(sprite, "rino-hit").is_err());
        assert_eq!(host.playing.get(&sprite).map(String::as_str), Some(HELPER_RUN_ANIMATION));
    }

    #[test]
    fn test_fallback_clip_is_played() {
        let mut host = HeadlessHost::new(&ArchetypeTable::builtin());
        let sprite = SpriteHandle::new(7);
        play_with_fallback(&mut host, sprite, "rino-hit", "rino-idle");
        assert_eq!(host.playing.get(&sprite).map(String::as_str), Some("rino-idle"));

        play_with_fallback(&mut host, sprite, "rino-run", "rino-idle");
        assert_eq!(host.playing.get(&sprite).map(String::as_str), Some("rino-run"));

        host.despawn(sprite);
        assert!(!host.playing.contains_key(&sprite));
    }

    #[test]
    fn test_outcome_taken_once() {
        let mut host = HeadlessHost::default();
        let payload = LevelPayload {
            score: 10,
            coins_collected: 0,
            enemies_killed: 0,
            health: 0,
            level: 2,
        };
        host.game_over(payload);
        assert_eq!(host.take_outcome(), Some(LevelOutcome::GameOver(payload)));
        assert_eq!(host.take_outcome(), None);
    }
}
