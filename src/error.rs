use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the monitor.
///
/// Setup failures (registry, bus, activation, configuration) end the process
/// before the event loop starts. Per-device problems never surface here; they
/// are skipped where they occur.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("device registry unavailable: {0}")]
    RegistryUnavailable(#[source] io::Error),

    #[error("kernel device-event bus unavailable: {0}")]
    BusUnavailable(#[source] io::Error),

    #[error("failed to activate event subscription: {0}")]
    ActivationFailed(#[source] io::Error),

    #[error("failed waiting for device events: {0}")]
    Wait(#[source] io::Error),

    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),

    #[error("failed to set up shutdown handling: {0}")]
    ShutdownSetup(#[source] io::Error),

    #[error("unsupported platform: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

impl MonitorError {
    /// True for failures that happen before the event loop is reached.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            MonitorError::RegistryUnavailable(_)
                | MonitorError::BusUnavailable(_)
                | MonitorError::ActivationFailed(_)
                | MonitorError::ShutdownSetup(_)
                | MonitorError::Unsupported(_)
                | MonitorError::Config(_)
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
