use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Errors from loading or validating a [`WorldConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Physics world settings.
///
/// `gravity` and `wind` are given in metres and scaled by `world_scale` into
/// host units when applied to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Length of one simulation tick in seconds.
    pub fixed_time_step: f32,
    /// Most ticks simulated per update; owed ticks above this are dropped.
    pub max_sub_steps: u32,
    pub world_scale: f32,
    pub gravity: Vec3,
    pub wind: Vec3,
    pub friction: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 10,
            world_scale: 7.0,
            gravity: Vec3::new(0.0, 0.0, -9.8),
            wind: Vec3::new(0.0, 0.0, 5.0),
            friction: 0.0,
        }
    }
}

impl WorldConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_time_step.is_finite() || self.fixed_time_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fixed_time_step must be a positive number of seconds, got {}",
                self.fixed_time_step
            )));
        }
        if self.max_sub_steps == 0 {
            return Err(ConfigError::Invalid("max_sub_steps must be at least 1".into()));
        }
        if !self.world_scale.is_finite() || self.world_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "world_scale must be positive, got {}",
                self.world_scale
            )));
        }
        if !self.gravity.is_finite() || !self.wind.is_finite() || !self.friction.is_finite() {
            return Err(ConfigError::Invalid(
                "gravity, wind and friction must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn scaled_gravity(&self) -> Vec3 {
        self.gravity * self.world_scale
    }

    pub fn scaled_wind(&self) -> Vec3 {
        self.wind * self.world_scale
    }
}
