//! Tunable constants for the scheduler and memory estimator
//!
//! Example `review.toml`:
//! ```toml
//! minEaseFactor = 1.3
//! initialEaseFactor = 2.5
//! targetStrength = 80.0
//! sessionSize = 25
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum ease factor allowed
pub const DEFAULT_MIN_EASE_FACTOR: f64 = 1.3;
/// Ease factor of a new card
pub const DEFAULT_INITIAL_EASE_FACTOR: f64 = 2.5;
/// Interval of a new card, and the interval after a lapse
pub const DEFAULT_INITIAL_INTERVAL: u32 = 1;
/// Interval after the second consecutive correct review
pub const DEFAULT_SECOND_INTERVAL: u32 = 6;
/// Memory strength below which a review is worth doing now
pub const DEFAULT_TARGET_STRENGTH: f64 = 80.0;
/// Confidence points credited per consecutive correct review
pub const DEFAULT_CONFIDENCE_PER_REPETITION: f64 = 20.0;
/// Cards per review session when the caller does not say
pub const DEFAULT_SESSION_SIZE: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    pub min_ease_factor: f64,
    pub initial_ease_factor: f64,
    pub initial_interval: u32,
    pub second_interval: u32,
    pub target_strength: f64,
    pub confidence_per_repetition: f64,
    pub session_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_ease_factor: DEFAULT_MIN_EASE_FACTOR,
            initial_ease_factor: DEFAULT_INITIAL_EASE_FACTOR,
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            second_interval: DEFAULT_SECOND_INTERVAL,
            target_strength: DEFAULT_TARGET_STRENGTH,
            confidence_per_repetition: DEFAULT_CONFIDENCE_PER_REPETITION,
            session_size: DEFAULT_SESSION_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML config string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        log::debug!("Loaded scheduler config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_ease_factor.is_finite() || self.min_ease_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "minEaseFactor must be positive, got {}",
                self.min_ease_factor
            )));
        }
        if !self.initial_ease_factor.is_finite()
            || self.initial_ease_factor < self.min_ease_factor
        {
            return Err(ConfigError::Invalid(format!(
                "initialEaseFactor {} is below minEaseFactor {}",
                self.initial_ease_factor, self.min_ease_factor
            )));
        }
        if self.initial_interval < 1 || self.second_interval < 1 {
            return Err(ConfigError::Invalid(
                "intervals must be at least one day".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.target_strength) {
            return Err(ConfigError::Invalid(format!(
                "targetStrength must be within 0-100, got {}",
                self.target_strength
            )));
        }
        if !self.confidence_per_repetition.is_finite() || self.confidence_per_repetition < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "confidencePerRepetition must not be negative, got {}",
                self.confidence_per_repetition
            )));
        }
        if self.session_size == 0 {
            return Err(ConfigError::Invalid("sessionSize must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_ease_factor, 1.3);
        assert_eq!(config.initial_ease_factor, 2.5);
        assert_eq!(config.initial_interval, 1);
        assert_eq!(config.second_interval, 6);
        assert_eq!(config.target_strength, 80.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SchedulerConfig::from_toml("sessionSize = 50\n").unwrap();
        assert_eq!(config.session_size, 50);
        assert_eq!(config.initial_ease_factor, 2.5);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = SchedulerConfig::from_toml("initialEaseFactor = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SchedulerConfig::from_toml("targetStrength = 120.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SchedulerConfig::from_toml("initialInterval = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = SchedulerConfig::from_toml("sessionSize = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("review.toml");
        std::fs::write(&path, "targetStrength = 70.0\nsessionSize = 10\n").unwrap();

        let config = SchedulerConfig::load(&path).unwrap();
        assert_eq!(config.target_strength, 70.0);
        assert_eq!(config.session_size, 10);

        let missing = SchedulerConfig::load(&temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
