use clap::Parser;
use std::path::PathBuf;

use crate::config::{MonitorConfig, OutputFormat};
use crate::logging::LoggingConfig;

#[derive(Parser, Debug)]
#[command(name = "hotplug-monitor")]
#[command(about = "Report present input devices, then every attach and detach")]
#[command(version)]
pub struct Cli {
    /// Device class (udev subsystem) to watch
    #[arg(long, short = 's', env = "HOTPLUG_MONITOR_SUBSYSTEM", default_value = "input")]
    pub subsystem: String,

    /// Report line format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, env = "HOTPLUG_MONITOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (compact, pretty, json)
    #[arg(long, default_value = "compact")]
    pub log_format: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> MonitorConfig {
        let default_level = if self.verbose { "debug" } else { "info" };
        let level = self
            .log_level
            .unwrap_or_else(|| default_level.to_string());

        MonitorConfig {
            subsystem: self.subsystem,
            output: self.format,
            logging: LoggingConfig {
                level,
                format: self.log_format,
                file_path: self.log_file,
                include_thread_names: self.verbose,
                include_line_numbers: self.verbose,
            },
        }
    }
}
