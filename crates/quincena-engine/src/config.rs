//! Engine configuration.
//!
//! Provides the headless driver's clock, level selection, arcade physics and
//! gameplay tuning. Configuration can be loaded from and saved to a TOML file;
//! enemy archetypes can be overridden from a RON file.

use quincena_gameplay::{ArchetypeTable, CannonRangePolicy, GameplayError, LevelId, SessionTuning};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "quincena.toml";

/// Errors raised while turning configuration into a runnable session.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Override file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Archetype overrides were rejected
    #[error("archetype overrides rejected: {0}")]
    Archetypes(#[from] GameplayError),

    /// No built-in level with this number
    #[error("unknown level {0}")]
    UnknownLevel(u8),
}

/// How the player and companion are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Walk right, jump for coins overhead, attack anything close
    #[default]
    Scripted,
    /// Stand still and let the enemies come
    Idle,
}

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Clock ===
    /// Target frames per second (real-time mode)
    pub target_fps: u32,
    /// Fixed simulation step in seconds
    pub fixed_dt: f32,
    /// Pace the simulation against the wall clock instead of running flat out
    pub realtime: bool,
    /// Simulated time limit in seconds (0 = until game over or completion)
    pub duration_secs: f32,

    // === Run ===
    /// Level to start at (1-3)
    pub start_level: u8,
    /// RNG seed for enemy hops
    pub seed: u64,
    /// Player and companion driver
    pub input: InputMode,
    /// Optional RON file overriding enemy archetypes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archetype_overrides: Option<PathBuf>,

    // === Physics ===
    /// Gravity (px/s²)
    pub gravity: f32,
    /// Ground line (px)
    pub ground_y: f32,
    /// Hero walk speed (px/s)
    pub walk_speed: f32,
    /// Hero jump impulse (px/s, negative is up)
    pub jump_velocity: f32,

    // === Gameplay ===
    /// Cannon range policy
    pub cannon_policy: CannonRangePolicy,
    /// Session tuning
    pub tuning: SessionTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Clock
            target_fps: 60,
            fixed_dt: 1.0 / 60.0,
            realtime: false,
            duration_secs: 180.0,

            // Run
            start_level: 1,
            seed: 0x5EED,
            input: InputMode::Scripted,
            archetype_overrides: None,

            // Physics
            gravity: 800.0,
            ground_y: quincena_gameplay::BASE_Y,
            walk_speed: 160.0,
            jump_velocity: -420.0,

            // Gameplay
            cannon_policy: CannonRangePolicy::default(),
            tuning: SessionTuning::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        info!("Loaded config from {}", path.display());
                        config.validate();
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.target_fps = self.target_fps.clamp(15, 240);
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.1);
        self.duration_secs = self.duration_secs.max(0.0);
        self.start_level = self.start_level.clamp(1, 3);
        self.gravity = self.gravity.max(0.0);
        self.walk_speed = self.walk_speed.clamp(0.0, 1000.0);
    }

    /// Starting level.
    pub fn start_level(&self) -> Result<LevelId, ConfigError> {
        LevelId::from_number(self.start_level).ok_or(ConfigError::UnknownLevel(self.start_level))
    }

    /// Built-in archetypes with the configured overrides applied.
    pub fn archetypes(&self) -> Result<ArchetypeTable, ConfigError> {
        let Some(path) = &self.archetype_overrides else {
            return Ok(ArchetypeTable::builtin());
        };
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let table = ArchetypeTable::from_ron_overrides(&source)?;
        info!("Loaded archetype overrides from {}", path.display());
        Ok(table)
    }

    /// Session tuning with the engine-level cannon policy applied.
    #[must_use]
    pub fn session_tuning(&self) -> SessionTuning {
        let mut tuning = self.tuning;
        tuning.cannon.policy = self.cannon_policy;
        tuning
    }

    /// Simulated time limit in milliseconds, if any.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        (self.duration_secs > 0.0).then(|| (f64::from(self.duration_secs) * 1000.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_gameplay::EnemyType;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.start_level, 1);
        assert_eq!(config.cannon_policy, CannonRangePolicy::FacingSide);
        assert_eq!(config.duration_ms(), Some(180_000));
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.start_level = 9;
        config.fixed_dt = 5.0;
        config.duration_secs = -1.0;

        config.validate();

        assert_eq!(config.start_level, 3);
        assert!((config.fixed_dt - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.duration_ms(), None);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("quincena.toml");

        let mut config = EngineConfig::default();
        config.start_level = 3;
        config.seed = 12345;
        config.cannon_policy = CannonRangePolicy::Omnidirectional;
        config.tuning.auto_heal_amount = 5;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.start_level, 3);
        assert_eq!(loaded.seed, 12345);
        assert_eq!(loaded.cannon_policy, CannonRangePolicy::Omnidirectional);
        assert_eq!(loaded.tuning.auto_heal_amount, 5);
        assert_eq!(loaded.session_tuning().cannon.policy, CannonRangePolicy::Omnidirectional);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "start_level = 2\ninput = \"idle\"\n").expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.start_level, 2);
        assert_eq!(loaded.input, InputMode::Idle);
        assert_eq!(loaded.tuning, SessionTuning::default());
    }

    #[test]
    fn test_partial_tuning_tables_keep_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "[tuning.knockback]\nhorizontal = 150.0\n\n[tuning.follow]\ngain = 3.0\n")
            .expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.tuning.knockback.horizontal, 150.0);
        assert_eq!(loaded.tuning.knockback.vertical, -100.0);
        assert_eq!(loaded.tuning.follow.gain, 3.0);
        assert_eq!(loaded.tuning.follow.follow_distance, 70.0);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/quincena.toml");
        assert_eq!(config.start_level, 1);
    }

    #[test]
    fn test_archetype_overrides() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let ron_path = temp_dir.path().join("archetypes.ron");
        let mut table = ArchetypeTable::builtin();
        let mut pig = table.get(EnemyType::AngryPig).expect("pig").clone();
        pig.health = 45;
        table.insert(EnemyType::AngryPig, pig).expect("valid stats");
        fs::write(&ron_path, table.to_ron().expect("ron")).expect("write");

        let mut config = EngineConfig::default();
        config.archetype_overrides = Some(ron_path);
        let loaded = config.archetypes().expect("overrides");
        assert_eq!(loaded.get(EnemyType::AngryPig).expect("pig").health, 45);

        config.archetype_overrides = Some(temp_dir.path().join("missing.ron"));
        assert!(matches!(config.archetypes(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("fixed_dt"));
        assert!(toml_str.contains("[tuning"));
    }
}
