//! Device handles, identities and classified change events.
//!
//! A device handle is any owned value implementing [`DeviceRecord`]. Dropping
//! it is the release; callers read what they need into a [`DeviceIdentity`]
//! and let the handle go out of scope before obtaining the next one.

pub mod action;
pub mod filter;

pub use action::DeviceAction;
pub use filter::ClassFilter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Read access to a device handle obtained from the registry or the event bus
pub trait DeviceRecord {
    /// Stable registry identifier (e.g. `/sys/devices/.../input/input7`)
    fn syspath(&self) -> &Path;

    /// Consumer-facing node (e.g. `/dev/input/event7`), if the device has one
    fn devnode(&self) -> Option<&Path>;

    /// Copy the reportable identity out of the handle
    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.devnode().map(Path::to_path_buf),
            self.syspath().to_path_buf(),
        )
    }
}

/// Owned identity of a device, detached from its handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    node: Option<PathBuf>,
    syspath: PathBuf,
}

impl DeviceIdentity {
    pub fn new(node: Option<PathBuf>, syspath: PathBuf) -> Self {
        Self { node, syspath }
    }

    pub fn node(&self) -> Option<&Path> {
        self.node.as_deref()
    }

    pub fn syspath(&self) -> &Path {
        &self.syspath
    }

    /// Node path when present, otherwise the system path
    pub fn display_path(&self) -> &Path {
        self.node.as_deref().unwrap_or(&self.syspath)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_path().display())
    }
}

/// One drained notification: the device handle and its classified action.
///
/// The event owns the handle; dropping the event releases it.
#[derive(Debug)]
pub struct DeviceEvent<D> {
    pub action: DeviceAction,
    pub device: D,
}

impl<D: DeviceRecord> DeviceEvent<D> {
    pub fn new(action: DeviceAction, device: D) -> Self {
        Self { action, device }
    }
}
