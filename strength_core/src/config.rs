//! Configuration file support for liftrx.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftrx/config.toml`.
//! Every section is optional; missing keys fall back to the built-in
//! defaults.

use crate::engine::{EngineConfig, LandmarkConfig, PrescriptionConstants};
use crate::{AthleteProfile, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub athlete: AthleteProfile,

    #[serde(default)]
    pub landmarks: LandmarkConfig,

    #[serde(default)]
    pub prescription: PrescriptionConstants,

    #[serde(default)]
    pub log: LogConfig,
}

/// Set log settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Units of the `timestamp` column per day (1 for days, 86400 for
    /// seconds). Ignored when every row carries a `date`.
    #[serde(default = "default_units_per_day")]
    pub timestamp_units_per_day: f64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            timestamp_units_per_day: default_units_per_day(),
        }
    }
}

fn default_units_per_day() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME").map_err(|_| {
                    Error::Config("HOME environment variable not set".into())
                })?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("liftrx").join("config.toml"))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.athlete.body_weight <= 0.0 {
            return Err(Error::Config("athlete.body_weight must be positive".into()));
        }
        if self.landmarks.mev <= 0.0 {
            return Err(Error::Config("landmarks.mev must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.landmarks.decay) {
            return Err(Error::Config("landmarks.decay must lie in [0, 1]".into()));
        }
        let p = &self.prescription;
        if p.alpha_min > p.alpha_max {
            return Err(Error::Config(
                "prescription.alpha_min must not exceed alpha_max".into(),
            ));
        }
        if !p.time_units_per_week.is_finite() || p.time_units_per_week <= 0.0 {
            return Err(Error::Config(
                "prescription.time_units_per_week must be positive".into(),
            ));
        }
        let units_per_day = self.log.timestamp_units_per_day;
        if !units_per_day.is_finite() || units_per_day <= 0.0 {
            return Err(Error::Config(
                "log.timestamp_units_per_day must be positive".into(),
            ));
        }
        if p.max_sets == 0 || p.max_deload_sets == 0 || p.window == 0 || p.acute_window == 0 {
            return Err(Error::Config(
                "prescription set limits and windows must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            landmarks: self.landmarks.clone(),
            constants: self.prescription.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.athlete.body_weight, 80.0);
        assert_eq!(config.landmarks.mev, 10.0);
        assert_eq!(config.landmarks.decay, 0.9);
        assert_eq!(config.prescription.max_sets, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[landmarks]
mev = 12.0

[athlete]
body_weight = 92.5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.landmarks.mev, 12.0);
        assert_eq!(config.landmarks.decay, 0.9); // default
        assert_eq!(config.athlete.body_weight, 92.5);
        assert_eq!(config.athlete.months_active, 1.0); // default
        assert_eq!(config.prescription.acute_window, 7);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.landmarks.phase_factor = 0.8;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.landmarks.phase_factor, 0.8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[landmarks]\ndecay = 1.5\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[log]\ntimestamp_units_per_day = 0.0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_time_units_default_to_days() {
        let config = Config::default();
        assert_eq!(config.prescription.time_units_per_week, 7.0);
        assert_eq!(config.log.timestamp_units_per_day, 1.0);

        let config: Config = toml::from_str("[log]\ntimestamp_units_per_day = 86400.0\n").unwrap();
        assert_eq!(config.log.timestamp_units_per_day, 86_400.0);
        assert_eq!(config.prescription.time_units_per_week, 7.0);
    }

    #[test]
    fn test_engine_config_mirrors_sections() {
        let mut config = Config::default();
        config.landmarks.theta = 0.25;
        config.prescription.max_sets = 6;

        let engine = config.engine_config();
        assert_eq!(engine.landmarks.theta, 0.25);
        assert_eq!(engine.constants.max_sets, 6);
    }
}
