use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

use crate::device::{DeviceAction, DeviceIdentity};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (compact, pretty, json)
    pub format: String,
    /// Log file path; stderr when unset
    pub file_path: Option<PathBuf>,
    /// Include thread names
    pub include_thread_names: bool,
    /// Include file and line numbers
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            file_path: None,
            include_thread_names: false,
            include_line_numbers: false,
        }
    }
}

/// Initialize structured logging based on configuration.
///
/// Logs never go to stdout; that stream carries the device report.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = create_env_filter(&config.level)?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(config.include_line_numbers)
        .with_thread_names(config.include_thread_names)
        .with_line_number(config.include_line_numbers)
        .with_file(config.include_line_numbers);

    match (&config.file_path, config.format.as_str()) {
        (Some(_), format) => {
            let file = Mutex::new(open_log_file(config)?);
            let builder = builder.with_writer(file).with_ansi(false);
            match format {
                "json" => set_global(builder.json().finish()),
                "pretty" => set_global(builder.pretty().finish()),
                _ => set_global(builder.compact().finish()),
            }?
        }
        (None, "json") => set_global(builder.with_writer(std::io::stderr).json().finish())?,
        (None, "pretty") => set_global(builder.with_writer(std::io::stderr).pretty().finish())?,
        (None, _) => set_global(builder.with_writer(std::io::stderr).compact().finish())?,
    }

    tracing::debug!("Structured logging initialized with level: {}", config.level);
    Ok(())
}

fn set_global<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")
}

/// Set up panic hook to log panics
pub fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let panic_msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = if let Some(location) = panic_info.location() {
            format!("{}:{}:{}", location.file(), location.line(), location.column())
        } else {
            "Unknown location".to_string()
        };

        tracing::error!(
            panic.msg = panic_msg,
            panic.location = location,
            "Application panicked"
        );

        original_hook(panic_info);
    }));
}

/// Structured event for a monitor lifecycle stage (open, activate, scan, ...)
pub fn log_lifecycle_event(stage: &str, subsystem: &str, details: Option<&str>) {
    tracing::info!(
        stage = stage,
        subsystem = subsystem,
        details = details,
        event_type = "lifecycle",
        "Monitor lifecycle event"
    );
}

/// Structured event for a classified device change
pub fn log_device_event(action: &DeviceAction, identity: &DeviceIdentity) {
    match action {
        DeviceAction::Added | DeviceAction::Removed => {
            tracing::debug!(
                action = %action,
                device = %identity,
                syspath = %identity.syspath().display(),
                event_type = "device",
                "Device change"
            );
        }
        DeviceAction::Other(label) => {
            tracing::trace!(
                action = label.as_str(),
                device = %identity,
                event_type = "device",
                "Ignoring device change"
            );
        }
    }
}

fn open_log_file(config: &LoggingConfig) -> Result<File> {
    let path = config
        .file_path
        .as_ref()
        .context("Log file path not configured")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Create environment filter for logging; `RUST_LOG` wins over the configured level
fn create_env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level)),
    }
}
