//! Game configuration.
//!
//! Every tunable lives here with the value the game ships with as its default.
//! A YAML file may override any subset of fields:
//!
//! ```yaml
//! seed: 7
//! grid:
//!   rows: 4
//!   columns: 4
//! score:
//!   house_threshold: 10
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_6};
use std::path::{Path, PathBuf};

/// Errors from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn positive(x: f32) -> bool {
    x > 0.0
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seeds cube colors and particle bursts.
    pub seed: u64,
    /// Fixed simulation rate. Per-tick formulas assume 60.
    pub tick_hz: f32,
    pub grid: GridConfig,
    pub character: CharacterConfig,
    pub stack: StackConfig,
    pub drop_zone: DropZoneConfig,
    pub house: HouseConfig,
    pub score: ScoreConfig,
    pub particles: ParticleConfig,
    pub popup: PopupConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_hz: 60.0,
            grid: GridConfig::default(),
            character: CharacterConfig::default(),
            stack: StackConfig::default(),
            drop_zone: DropZoneConfig::default(),
            house: HouseConfig::default(),
            score: ScoreConfig::default(),
            particles: ParticleConfig::default(),
            popup: PopupConfig::default(),
        }
    }
}

/// Layout of the collectible cube field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: u32,
    pub columns: u32,
    pub start_x: f32,
    pub start_z: f32,
    pub spacing: f32,
    /// Radians added to each Euler axis of every collectible per tick.
    pub spin_per_tick: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            columns: 12,
            start_x: -16.5,
            start_z: -15.0,
            spacing: 3.0,
            spin_per_tick: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Feet position at game start.
    pub start: Vec3,
    /// Walking speed in units per second.
    pub speed: f32,
    /// Slerp factor per tick toward the walking direction.
    pub turn_lerp: f32,
    /// Body box size; the body is centered half its height above the feet.
    pub body_size: Vec3,
    pub color: [f32; 4],
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            start: Vec3::new(0.0, 0.0, 24.0),
            speed: 9.0,
            turn_lerp: 0.2,
            body_size: Vec3::new(0.8, 2.0, 0.8),
            color: [0.95, 0.75, 0.2, 1.0],
        }
    }
}

/// Carried-stack animation and drop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub lerp_factor: f32,
    /// Radians.
    pub max_lean_angle: f32,
    pub stack_spacing: f32,
    pub follow_distance: f32,
    pub lean_increment: f32,
    pub rotation_delay_factor: f32,
    /// Height of the lowest settled cube above the character's feet.
    pub base_height: f32,
    /// Local Z of the stack; negative is behind the character.
    pub back_offset: f32,
    pub cube_scale: f32,
    /// Height a freshly collected cube appears at before settling.
    pub collect_height: f32,
    pub collect_spacing: f32,
    pub drop_interval_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            lerp_factor: 0.1,
            max_lean_angle: FRAC_PI_6,
            stack_spacing: 0.5,
            follow_distance: 1.0,
            lean_increment: 0.1,
            rotation_delay_factor: 0.05,
            base_height: 1.5,
            back_offset: -0.6,
            cube_scale: 0.5,
            collect_height: 2.0 - 0.25,
            collect_spacing: 0.6,
            drop_interval_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropZoneConfig {
    pub center: Vec3,
    pub size: Vec3,
    pub color: [f32; 4],
}

impl Default for DropZoneConfig {
    fn default() -> Self {
        Self {
            center: Vec3::new(0.0, 0.5, -45.0),
            size: Vec3::new(20.0, 1.0, 20.0),
            color: [1.0, 0.0, 0.0, 0.5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseConfig {
    pub position: Vec3,
    /// Radians about Y.
    pub rotation_y: f32,
    /// Multiplied by the tick length to form the per-tick lerp factor.
    pub growth_rate: f32,
    /// Scale at which the celebration fires.
    pub celebrate_at: f32,
    /// Distance from the target at which the scale snaps onto it.
    pub snap_epsilon: f32,
    /// JSON prefab to use instead of the built-in house.
    pub prefab: Option<PathBuf>,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -45.0),
            rotation_y: -FRAC_PI_2,
            growth_rate: 0.5,
            celebrate_at: 0.8,
            snap_epsilon: 1e-3,
            prefab: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// The house starts growing once the score is strictly above this.
    pub house_threshold: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            house_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    /// Edge length of the cube particles start in, centered on the house.
    pub spread: f32,
    /// Edge length of the per-tick velocity cube.
    pub max_speed: f32,
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    /// Seconds until the burst fades out completely.
    pub duration: f32,
    pub size: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 500,
            spread: 10.0,
            max_speed: 0.01,
            min_lifetime: 1.0,
            max_lifetime: 3.0,
            duration: 3.0,
            size: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub delay_secs: f32,
    pub title: String,
    pub message: String,
    /// Image shown in the popup, relative to the working directory.
    pub image: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            delay_secs: 1.0,
            title: "Your house is built!".into(),
            message: "Every cube found its place. Welcome to the farm.".into(),
            image: "assets/farm-background.jpg".into(),
        }
    }
}

impl GameConfig {
    /// Load from an optional YAML file. `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config: Self = serde_yaml::from_str(&text)?;
                tracing::info!("loaded config from {}", path.display());
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Seconds per fixed tick.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_hz
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.tick_hz) {
            return Err(invalid("tick_hz", "must be positive"));
        }
        if self.grid.rows == 0 || self.grid.columns == 0 {
            return Err(invalid("grid", "needs at least one row and one column"));
        }
        if !positive(self.grid.spacing) {
            return Err(invalid("grid.spacing", "must be positive"));
        }
        if self.character.speed < 0.0 || self.character.speed.is_nan() {
            return Err(invalid("character.speed", "must not be negative"));
        }
        if self.character.body_size.cmple(Vec3::ZERO).any() {
            return Err(invalid("character.body_size", "all edges must be positive"));
        }
        if !(0.0..=1.0).contains(&self.stack.lerp_factor) {
            return Err(invalid("stack.lerp_factor", "must be within 0..=1"));
        }
        if !positive(self.stack.stack_spacing) {
            return Err(invalid("stack.stack_spacing", "must be positive"));
        }
        if self.stack.drop_interval_ms == 0 {
            return Err(invalid("stack.drop_interval_ms", "must be positive"));
        }
        if self.drop_zone.size.cmple(Vec3::ZERO).any() {
            return Err(invalid("drop_zone.size", "all edges must be positive"));
        }
        if !positive(self.house.growth_rate) {
            return Err(invalid("house.growth_rate", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.house.celebrate_at) {
            return Err(invalid("house.celebrate_at", "must be within 0..=1"));
        }
        let p = &self.particles;
        if !positive(p.min_lifetime) || p.max_lifetime < p.min_lifetime {
            return Err(invalid(
                "particles.lifetime",
                format!("need 0 < min <= max, got {}..{}", p.min_lifetime, p.max_lifetime),
            ));
        }
        if !positive(p.duration) {
            return Err(invalid("particles.duration", "must be positive"));
        }
        if self.popup.delay_secs < 0.0 {
            return Err(invalid("popup.delay_secs", "must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_shipped_constants() {
        let c = GameConfig::default();
        assert_eq!(c.stack.lerp_factor, 0.1);
        assert!((c.stack.max_lean_angle - std::f32::consts::PI / 6.0).abs() < 1e-6);
        assert_eq!(c.stack.collect_height, 1.75);
        assert_eq!(c.stack.drop_interval_ms, 10);
        assert_eq!(c.drop_zone.center, Vec3::new(0.0, 0.5, -45.0));
        assert_eq!(c.drop_zone.size, Vec3::new(20.0, 1.0, 20.0));
        assert_eq!(c.score.house_threshold, 100);
        assert_eq!(c.particles.count, 500);
        assert_eq!(c.popup.delay_secs, 1.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn default_grid_holds_enough_cubes_to_build_the_house() {
        let c = GameConfig::default();
        assert!(c.grid.rows * c.grid.columns > c.score.house_threshold);
    }

    #[test]
    fn load_without_path_gives_defaults() {
        assert_eq!(GameConfig::load(None).unwrap(), GameConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 7\ngrid:\n  rows: 3\nscore:\n  house_threshold: 5").unwrap();

        let c = GameConfig::load(Some(file.path())).unwrap();
        assert_eq!(c.seed, 7);
        assert_eq!(c.grid.rows, 3);
        assert_eq!(c.grid.columns, 12);
        assert_eq!(c.score.house_threshold, 5);
        assert_eq!(c.stack, StackConfig::default());
    }

    #[test]
    fn yaml_round_trip() {
        let c = GameConfig::default();
        let yaml = c.to_yaml().unwrap();
        let back: GameConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = GameConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn rejects_empty_grid() {
        let mut c = GameConfig::default();
        c.grid.rows = 0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Invalid { field: "grid", .. })
        ));
    }

    #[test]
    fn rejects_inverted_lifetimes() {
        let mut c = GameConfig::default();
        c.particles.min_lifetime = 4.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let mut c = GameConfig::default();
        c.tick_hz = 0.0;
        assert!(c.validate().is_err());
        c.tick_hz = f32::NAN;
        assert!(c.validate().is_err());
    }
}
