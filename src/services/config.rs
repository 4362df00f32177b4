//! Configuration for the conductor engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::infrastructure::logging::LogConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed for {field}: {reason}")]
    ValidationError { field: String, reason: String },
}

/// Top-level engine configuration.
///
/// `valid_domains` is the closed set of domain labels the deployment
/// accepts; unknown labels are rejected at submission and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub valid_domains: Vec<String>,
    pub scheduler: SchedulerConfig,
    pub scoring: ScoringConfig,
    pub logging: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            valid_domains: Vec::new(),
            scheduler: SchedulerConfig::default(),
            scoring: ScoringConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tick cadence of the scheduling loop.
    pub tick_interval_ms: u64,
    /// Attempts before a task fails terminally.
    pub max_retries: u32,
    /// Predicted-success floor below which remediation is applied.
    pub remediation_threshold: f64,
    /// Result confidence floor below which the task is reassigned.
    pub low_confidence_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            max_retries: 3,
            remediation_threshold: 0.65,
            low_confidence_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Compatibility floor; candidates scoring below it are rejected.
    pub min_compatibility: f64,
    /// Predicted-success penalty per active interfering task.
    pub interference_penalty: f64,
    /// Lower bound of any success prediction.
    pub prediction_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_compatibility: 0.2,
            interference_penalty: 0.15,
            prediction_floor: 0.1,
        }
    }
}

impl EngineConfig {
    /// Convenience constructor for the common case.
    pub fn with_domains(domains: &[&str]) -> Self {
        Self {
            valid_domains: domains.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.valid_domains.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "valid_domains".to_string(),
                reason: "at least one domain label is required".to_string(),
            });
        }
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "scheduler.tick_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        for (field, value) in [
            ("scheduler.remediation_threshold", self.scheduler.remediation_threshold),
            ("scheduler.low_confidence_threshold", self.scheduler.low_confidence_threshold),
            ("scoring.min_compatibility", self.scoring.min_compatibility),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError {
                    field: field.to_string(),
                    reason: format!("{value} outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.scheduler.remediation_threshold, 0.65);
        assert_eq!(config.scoring.min_compatibility, 0.2);
    }

    #[test]
    fn test_validate_requires_domains() {
        let config = EngineConfig::default();
        assert!(config.validate().is_err());

        let config = EngineConfig::with_domains(&["analysis"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
valid_domains = ["analysis", "logic"]

[scheduler]
tick_interval_ms = 250
max_retries = 5
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.valid_domains.len(), 2);
        assert_eq!(config.scheduler.tick_interval_ms, 250);
        assert_eq!(config.scheduler.max_retries, 5);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.scoring.min_compatibility, 0.2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/conductor.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = EngineConfig::with_domains(&["analysis"]);
        config.scheduler.remediation_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
