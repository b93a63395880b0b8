//! # Configuration Module
//!
//! Construction parameters for one analyzer instance. Every field has a
//! default, so a config file only needs to name the values it changes.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Number of track slots when none is configured.
pub const DEFAULT_CAPACITY: usize = 20;
/// Fraction of the loudest partial a fundamental candidate must reach.
pub const DEFAULT_MIN_FUNDAMENTAL_AMP_RATIO: f64 = 0.15;
/// Tolerance for "is a harmonic", in semitones.
pub const DEFAULT_CLOSE_ENOUGH_SEMITONES: f64 = 0.5;
/// Number of past frames a challenger must win before it becomes the fundamental.
pub const DEFAULT_HISTORY_LENGTH: usize = 3;

/// Parameters fixed at construction of an [`crate::Overtones`] instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertonesConfig {
    /// Number of track slots. `0` means the default.
    pub capacity: usize,
    pub min_fundamental_amp_ratio: f64,
    pub close_enough_semitones: f64,
    pub history_length: usize,
}

impl Default for OvertonesConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            min_fundamental_amp_ratio: DEFAULT_MIN_FUNDAMENTAL_AMP_RATIO,
            close_enough_semitones: DEFAULT_CLOSE_ENOUGH_SEMITONES,
            history_length: DEFAULT_HISTORY_LENGTH,
        }
    }
}

impl OvertonesConfig {
    /// Config with the given slot count and default tuning.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }

    /// Slot count actually used, with `0` replaced by the default.
    pub fn effective_capacity(&self) -> usize {
        if self.capacity == 0 { DEFAULT_CAPACITY } else { self.capacity }
    }

    /// Checks that every field is usable.
    ///
    /// # Returns
    /// * `Ok(())` - The config can build an analyzer
    /// * `Err(ConfigError::InvalidField)` - The first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.min_fundamental_amp_ratio.is_finite() || self.min_fundamental_amp_ratio < 0.0 {
            return Err(ConfigError::InvalidField {
                name: "min_fundamental_amp_ratio",
                message: format!("must be a finite value >= 0, got {}", self.min_fundamental_amp_ratio),
            });
        }
        if !self.close_enough_semitones.is_finite() || self.close_enough_semitones <= 0.0 {
            return Err(ConfigError::InvalidField {
                name: "close_enough_semitones",
                message: format!("must be a finite value > 0, got {}", self.close_enough_semitones),
            });
        }
        if self.history_length == 0 {
            return Err(ConfigError::InvalidField {
                name: "history_length",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads and validates a config from a JSON file.
///
/// # Arguments
/// * `path` - File path to load the config from (e.g., "overtones.json")
///
/// # Returns
/// * `Ok(OvertonesConfig)` - Successfully loaded config
/// * `Err(ConfigError)` - I/O, JSON or validation error
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<OvertonesConfig> {
    let mut file = File::open(path)?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let config: OvertonesConfig = serde_json::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

/// Saves a config to a JSON file in pretty form.
pub fn save_config(config: &OvertonesConfig, path: impl AsRef<Path>) -> ConfigResult<()> {
    let json_string = serde_json::to_string_pretty(config)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: OvertonesConfig =
            serde_json::from_str(r#"{ "close_enough_semitones": 0.25 }"#).unwrap();
        assert_eq!(
            config,
            OvertonesConfig { close_enough_semitones: 0.25, ..OvertonesConfig::default() }
        );
    }

    #[test]
    fn zero_capacity_means_default() {
        assert_eq!(OvertonesConfig::with_capacity(0).effective_capacity(), DEFAULT_CAPACITY);
        assert_eq!(OvertonesConfig::with_capacity(4).effective_capacity(), 4);
    }

    #[test]
    fn validate_rejects_unusable_fields() {
        let bad_ratio = OvertonesConfig { min_fundamental_amp_ratio: f64::NAN, ..Default::default() };
        assert!(matches!(
            bad_ratio.validate(),
            Err(ConfigError::InvalidField { name: "min_fundamental_amp_ratio", .. })
        ));
        let bad_tolerance = OvertonesConfig { close_enough_semitones: 0.0, ..Default::default() };
        assert!(bad_tolerance.validate().is_err());
        let bad_history = OvertonesConfig { history_length: 0, ..Default::default() };
        assert!(bad_history.validate().is_err());
        assert!(OvertonesConfig::default().validate().is_ok());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let path = std::env::temp_dir().join(format!("overtones-config-{}.json", std::process::id()));
        let config = OvertonesConfig {
            capacity: 8,
            min_fundamental_amp_ratio: 0.5,
            close_enough_semitones: 0.25,
            history_length: 2,
        };
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
