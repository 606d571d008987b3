use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::device::ClassFilter;
use crate::logging::LoggingConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid class filter '{label}': {message}")]
    InvalidFilter { label: String, message: String },

    #[error("Invalid configuration: {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Presentation of report lines on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `device: /dev/input/event3`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Device class (udev subsystem) to track
    pub subsystem: String,

    /// Report line format
    pub output: OutputFormat,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            subsystem: ClassFilter::DEFAULT_LABEL.to_string(),
            output: OutputFormat::Text,
            logging: LoggingConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        ClassFilter::new(&self.subsystem)?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidConfig {
                field: "logging.level".to_string(),
                message: format!("unknown level '{}'", self.logging.level),
            });
        }

        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidConfig {
                field: "logging.format".to_string(),
                message: format!("unknown format '{}'", self.logging.format),
            });
        }

        Ok(())
    }

    /// Class filter for the configured subsystem
    pub fn class_filter(&self) -> ConfigResult<ClassFilter> {
        ClassFilter::new(&self.subsystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert_eq!(config.subsystem, "input");
        assert_eq!(config.output, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_subsystem_rejected() {
        let config = MonitorConfig {
            subsystem: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = MonitorConfig::default();
        config.logging.level = "loud".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = MonitorConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes_output_lowercase() {
        let config = MonitorConfig {
            output: OutputFormat::Json,
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["output"], "json");
        assert_eq!(json["subsystem"], "input");
    }
}
