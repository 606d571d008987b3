use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified device change.
///
/// The kernel bus tags every record with a short action label. Only "add" and
/// "remove" are meaningful here; every other label, including a missing one,
/// lands in `Other` and is ignored by the event loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceAction {
    Added,
    Removed,
    Other(String),
}

impl DeviceAction {
    /// Classify a raw action label
    pub fn from_label(label: &str) -> Self {
        match label {
            "add" => DeviceAction::Added,
            "remove" => DeviceAction::Removed,
            other => DeviceAction::Other(other.to_string()),
        }
    }

    /// Classify an optional label; a record without one is `Other("")`
    pub fn from_optional_label(label: Option<&str>) -> Self {
        label.map_or_else(|| DeviceAction::Other(String::new()), Self::from_label)
    }

    /// Whether the change is forwarded to the report sink
    pub fn is_reported(&self) -> bool {
        matches!(self, DeviceAction::Added | DeviceAction::Removed)
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAction::Added => write!(f, "added"),
            DeviceAction::Removed => write!(f, "removed"),
            DeviceAction::Other(label) => write!(f, "other({})", label),
        }
    }
}
