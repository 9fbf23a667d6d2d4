use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::historic_soreness::SorenessConfig;
use crate::logging::LogConfig;
use crate::training_load::LoadConfig;
use crate::trigger_engine::TriggerConfig;

/// Engine configuration, persisted as TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Historic soreness windows and thresholds
    #[serde(default)]
    pub soreness: SorenessConfig,

    /// Training load and high-load detection thresholds
    #[serde(default)]
    pub load: LoadConfig,

    /// Trigger rule thresholds
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Logging settings for binaries embedding the engine
    #[serde(default)]
    pub log: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        ConfigMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            metadata: ConfigMetadata::default(),
            soreness: SorenessConfig::default(),
            load: LoadConfig::default(),
            triggers: TriggerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soreness-risk")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Reject windows that would make the state machine unreachable
    pub fn validate(&self) -> Result<()> {
        let soreness = &self.soreness;
        if soreness.acute_to_persistent_days >= soreness.persistent_2_days {
            anyhow::bail!(
                "acute_to_persistent_days ({}) must be shorter than persistent_2_days ({})",
                soreness.acute_to_persistent_days,
                soreness.persistent_2_days
            );
        }
        if soreness.weakness_days >= soreness.dysfunction_days {
            anyhow::bail!(
                "weakness_days ({}) must be shorter than dysfunction_days ({})",
                soreness.weakness_days,
                soreness.dysfunction_days
            );
        }
        if !(0.0..=1.0).contains(&soreness.symmetric_pair_percentage) {
            anyhow::bail!(
                "symmetric_pair_percentage must be within 0..=1, got {}",
                soreness.symmetric_pair_percentage
            );
        }
        if self.load.default_expected_weekly_workouts == 0 {
            anyhow::bail!("default_expected_weekly_workouts must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.soreness, deserialized.soreness);
        assert_eq!(config.load, deserialized.load);
        assert_eq!(config.triggers, deserialized.triggers);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = EngineConfig::default();
        original.load.ramp_factor = 1.25;
        original.triggers.historic_days_boundary = 21;

        original.save_to_file(&config_path).unwrap();
        let loaded = EngineConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.load.ramp_factor, 1.25);
        assert_eq!(loaded.triggers.historic_days_boundary, 21);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let toml_str = r#"
            [metadata]
            version = "0.1.0"
            updated_at = "2024-03-01T00:00:00Z"
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.soreness, SorenessConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_inverted_windows() {
        let mut config = EngineConfig::default();
        config.soreness.weakness_days = 40;
        assert!(config.validate().is_err());
    }
}
