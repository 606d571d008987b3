use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, ConfigResult};

/// Validated device class label (a udev subsystem such as `input`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassFilter(String);

impl ClassFilter {
    pub const DEFAULT_LABEL: &'static str = "input";

    pub fn new(label: &str) -> ConfigResult<Self> {
        let invalid = |message: &str| ConfigError::InvalidFilter {
            label: label.to_string(),
            message: message.to_string(),
        };

        if label.is_empty() {
            return Err(invalid("label must not be empty"));
        }
        if label.chars().any(|c| c.is_whitespace() || c == '/' || c == '\0') {
            return Err(invalid("label must not contain whitespace, '/' or NUL"));
        }

        Ok(Self(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self(Self::DEFAULT_LABEL.to_string())
    }
}

impl TryFrom<String> for ClassFilter {
    type Error = ConfigError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::new(&label)
    }
}

impl From<ClassFilter> for String {
    fn from(filter: ClassFilter) -> Self {
        filter.0
    }
}

impl fmt::Display for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
