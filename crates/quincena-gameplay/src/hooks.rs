//! Collaborator traits implemented by the host engine.
//!
//! The gameplay core never touches sprites, the HUD or scenes directly. It
//! issues fire-and-forget commands through these traits; the only call that
//! can fail is playing an animation whose key the host does not know.

use ahash::AHashSet;
use glam::Vec2;
use quincena_common::SpriteHandle;

use crate::error::{GameplayError, GameplayResult};
use crate::game_state::LevelPayload;

/// Sprite and camera commands.
pub trait Presenter {
    /// Plays a looping animation. Fails with `Configuration` if the key is unknown.
    fn play_animation(&mut self, sprite: SpriteHandle, key: &str) -> GameplayResult<()>;

    /// Swaps the sprite's static texture.
    fn set_texture(&mut self, sprite: SpriteHandle, key: &str);

    /// Sets horizontal flip.
    fn set_flip_x(&mut self, sprite: SpriteHandle, flip: bool);

    /// Tints the sprite (0xRRGGBB).
    fn set_tint(&mut self, sprite: SpriteHandle, rgb: u32);

    /// Removes any tint.
    fn clear_tint(&mut self, sprite: SpriteHandle);

    /// Shows or hides the sprite.
    fn set_visible(&mut self, sprite: SpriteHandle, visible: bool);

    /// Shakes the camera.
    fn camera_shake(&mut self, duration_ms: u64, intensity: f32);

    /// Creates a projectile sprite.
    fn spawn_projectile(&mut self, sprite: SpriteHandle, position: Vec2, velocity: Vec2);

    /// Destroys a sprite.
    fn despawn(&mut self, sprite: SpriteHandle);

    /// Shows an explosion effect.
    fn spawn_explosion(&mut self, position: Vec2, radius: f32);
}

/// HUD setters.
pub trait Hud {
    /// Player health bar.
    fn update_health(&mut self, current: i32, max: i32);

    /// Companion health bar.
    fn update_companion_health(&mut self, current: i32, max: i32);

    /// Helper health bar, if the HUD has one.
    fn update_helper_health(&mut self, _current: i32, _max: i32) {}

    /// Score counter.
    fn update_score(&mut self, score: u32);

    /// Coin counter.
    fn update_coins(&mut self, collected: u32, total: u32);

    /// Boss health bar, as a fraction in `0.0..=1.0`.
    fn update_boss_health(&mut self, fraction: f32);
}

/// Scene transitions.
pub trait SceneDirector {
    /// Both heroes are down.
    fn game_over(&mut self, payload: LevelPayload);

    /// The level's coins are all collected and the transition delay elapsed.
    fn level_complete(&mut self, payload: LevelPayload);
}

/// Everything a level session needs from its host.
pub trait Host: Presenter + Hud + SceneDirector {}

impl<T: Presenter + Hud + SceneDirector> Host for T {}

/// A recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// `play_animation`
    Animation {
        /// Sprite
        sprite: SpriteHandle,
        /// Key
        key: String,
    },
    /// `set_texture`
    Texture {
        /// Sprite
        sprite: SpriteHandle,
        /// Key
        key: String,
    },
    /// `set_flip_x`
    Flip {
        /// Sprite
        sprite: SpriteHandle,
        /// Flip flag
        flip: bool,
    },
    /// `set_tint`
    Tint {
        /// Sprite
        sprite: SpriteHandle,
        /// Color
        rgb: u32,
    },
    /// `clear_tint`
    ClearTint {
        /// Sprite
        sprite: SpriteHandle,
    },
    /// `set_visible`
    Visible {
        /// Sprite
        sprite: SpriteHandle,
        /// Visibility
        visible: bool,
    },
    /// `camera_shake`
    Shake {
        /// Duration (ms)
        duration_ms: u64,
        /// Intensity
        intensity: f32,
    },
    /// `spawn_projectile`
    Projectile {
        /// Sprite
        sprite: SpriteHandle,
        /// Position
        position: Vec2,
        /// Velocity
        velocity: Vec2,
    },
    /// `despawn`
    Despawn {
        /// Sprite
        sprite: SpriteHandle,
    },
    /// `spawn_explosion`
    Explosion {
        /// Center
        position: Vec2,
        /// Radius
        radius: f32,
    },
    /// `update_health`
    Health(i32, i32),
    /// `update_companion_health`
    CompanionHealth(i32, i32),
    /// `update_helper_health`
    HelperHealth(i32, i32),
    /// `update_score`
    Score(u32),
    /// `update_coins`
    Coins(u32, u32),
    /// `update_boss_health`
    BossHealth(f32),
    /// `game_over`
    GameOver(LevelPayload),
    /// `level_complete`
    LevelComplete(LevelPayload),
}

/// Mock host for testing: records every call.
#[derive(Debug, Default)]
pub struct MockHost {
    /// Calls in order
    pub calls: Vec<HostCall>,
    missing_animations: AHashSet<String>,
}

impl MockHost {
    /// Creates a new mock host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `play_animation` fail for `key`.
    #[must_use]
    pub fn without_animation(mut self, key: &str) -> Self {
        self.missing_animations.insert(key.to_string());
        self
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|&call| predicate(call)).count()
    }

    /// Number of `game_over` calls.
    #[must_use]
    pub fn game_overs(&self) -> usize {
        self.count(|call| matches!(call, HostCall::GameOver(_)))
    }

    /// Number of `level_complete` calls.
    #[must_use]
    pub fn level_completions(&self) -> usize {
        self.count(|call| matches!(call, HostCall::LevelComplete(_)))
    }

    /// Last player health pushed to the HUD.
    #[must_use]
    pub fn last_health(&self) -> Option<i32> {
        self.calls.iter().rev().find_map(|call| match call {
            HostCall::Health(current, _) => Some(*current),
            _ => None,
        })
    }

    /// Last boss fraction pushed to the HUD.
    #[must_use]
    pub fn last_boss_fraction(&self) -> Option<f32> {
        self.calls.iter().rev().find_map(|call| match call {
            HostCall::BossHealth(fraction) => Some(*fraction),
            _ => None,
        })
    }

    /// Forgets recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Presenter for MockHost {
    fn play_animation(&mut self, sprite: SpriteHandle, key: &str) -> GameplayResult<()> {
        if self.missing_animations.contains(key) {
            return Err(GameplayError::Configuration(format!("missing animation {key}")));
        }
        self.calls.push(HostCall::Animation {
            sprite,
            key: key.to_string(),
        });
        Ok(())
    }

    fn set_texture(&mut self, sprite: SpriteHandle, key: &str) {
        self.calls.push(HostCall::Texture {
            sprite,
            key: key.to_string(),
        });
    }

    fn set_flip_x(&mut self, sprite: SpriteHandle, flip: bool) {
        self.calls.push(HostCall::Flip { sprite, flip });
    }

    fn set_tint(&mut self, sprite: SpriteHandle, rgb: u32) {
        self.calls.push(HostCall::Tint { sprite, rgb });
    }

    fn clear_tint(&mut self, sprite: SpriteHandle) {
        self.calls.push(HostCall::ClearTint { sprite });
    }

    fn set_visible(&mut self, sprite: SpriteHandle, visible: bool) {
        self.calls.push(HostCall::Visible { sprite, visible });
    }

    fn camera_shake(&mut self, duration_ms: u64, intensity: f32) {
        self.calls.push(HostCall::Shake {
            duration_ms,
            intensity,
        });
    }

    fn spawn_projectile(&mut self, sprite: SpriteHandle, position: Vec2, velocity: Vec2) {
        self.calls.push(HostCall::Projectile {
            sprite,
            position,
            velocity,
        });
    }

    fn despawn(&mut self, sprite: SpriteHandle) {
        self.calls.push(HostCall::Despawn { sprite });
    }

    fn spawn_explosion(&mut self, position: Vec2, radius: f32) {
        self.calls.push(HostCall::Explosion { position, radius });
    }
}

impl Hud for MockHost {
    fn update_health(&mut self, current: i32, max: i32) {
        self.calls.push(HostCall::Health(current, max));
    }

    fn update_companion_health(&mut self, current: i32, max: i32) {
        self.calls.push(HostCall::CompanionHealth(current, max));
    }

    fn update_helper_health(&mut self, current: i32, max: i32) {
        self.calls.push(HostCall::HelperHealth(current, max));
    }

    fn update_score(&mut self, score: u32) {
        self.calls.push(HostCall::Score(score));
    }

    fn update_coins(&mut self, collected: u32, total: u32) {
        self.calls.push(HostCall::Coins(collected, total));
    }

    fn update_boss_health(&mut self, fraction: f32) {
        self.calls.push(HostCall::BossHealth(fraction));
    }
}

impl SceneDirector for MockHost {
    fn game_over(&mut self, payload: LevelPayload) {
        self.calls.push(HostCall::GameOver(payload));
    }

    fn level_complete(&mut self, payload: LevelPayload) {
        self.calls.push(HostCall::LevelComplete(payload));
    }
}

/// Plays `key`, falling back to `fallback` when the host lacks it.
pub fn play_with_fallback<H: Presenter + ?Sized>(host: &mut H, sprite: SpriteHandle, key: &str, fallback: &str) {
    if let Err(err) = host.play_animation(sprite, key) {
        tracing::debug!("{err}; falling back to {fallback}");
        if key != fallback {
            if let Err(err) = host.play_animation(sprite, fallback) {
                tracing::warn!("Fallback animation failed for sprite {:?}: {err}", sprite);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_animation() {
        let mut host = MockHost::new().without_animation("angrypig-hit");
        let sprite = SpriteHandle::new(4);
        play_with_fallback(&mut host, sprite, "angrypig-hit", "angrypig-idle");
        assert_eq!(
            host.calls,
            vec![HostCall::Animation {
                sprite,
                key: "angrypig-idle".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_fallback_is_tolerated() {
        let mut host = MockHost::new().without_animation("a").without_animation("b");
        play_with_fallback(&mut host, SpriteHandle::new(1), "a", "b");
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_counters() {
        let mut host = MockHost::new();
        host.update_health(80, 100);
        host.update_health(60, 100);
        host.update_boss_health(0.5);
        host.game_over(LevelPayload {
            score: 0,
            coins_collected: 0,
            enemies_killed: 0,
            health: 0,
            level: 1,
        });
        assert_eq!(host.last_health(), Some(60));
        assert_eq!(host.last_boss_fraction(), Some(0.5));
        assert_eq!(host.game_overs(), 1);
        assert_eq!(host.level_completions(), 0);
    }
}
