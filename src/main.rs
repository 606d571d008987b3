use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinError;
use tracing::{error, info, warn};

use hotplug_monitor::cli::Cli;
use hotplug_monitor::logging::{init_logging, setup_panic_hook};
use hotplug_monitor::monitor::run_udev;
use hotplug_monitor::{cancel_pair, MonitorConfig, MonitorError, MonitorResult, MonitorSummary};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Cli::parse().into_config();

    if let Err(e) = config.validate() {
        return ExitCode::from(report_failure(&e.into(), &mut std::io::stderr()));
    }

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("hotplug-monitor: {:#}", e);
        return ExitCode::FAILURE;
    }
    setup_panic_hook();

    info!(
        "Starting hotplug-monitor for subsystem '{}' ({} output)",
        config.subsystem, config.output
    );

    match run(config).await {
        Ok(summary) => {
            info!(
                present = summary.bootstrap.snapshot.visited,
                added = summary.stats.added,
                removed = summary.stats.removed,
                ignored = summary.stats.ignored,
                spurious = summary.stats.spurious_wakeups,
                "Monitor stopped"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Monitor failed: {}", e);
            ExitCode::from(report_failure(&e, &mut std::io::stderr()))
        }
    }
}

/// Print the diagnostic for a fatal error and return the process exit status
fn report_failure<W: Write>(err: &MonitorError, out: &mut W) -> u8 {
    // nothing left to report to if stderr itself is gone
    let _ = writeln!(out, "hotplug-monitor: {}", err);
    err.exit_code()
}

/// Run the blocking monitor on a worker thread; SIGINT/SIGTERM cancel it
async fn run(config: MonitorConfig) -> MonitorResult<MonitorSummary> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(MonitorError::ShutdownSetup)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(MonitorError::ShutdownSetup)?;
    let (canceller, token) = cancel_pair().map_err(MonitorError::ShutdownSetup)?;

    let mut worker = tokio::task::spawn_blocking(move || run_udev(&config, token));

    tokio::select! {
        joined = &mut worker => return join_result(joined),
        _ = sigterm.recv() => info!("Received SIGTERM, stopping"),
        _ = sigint.recv() => info!("Received SIGINT, stopping"),
    }

    if let Err(e) = canceller.cancel() {
        warn!("Failed to wake event loop: {}", e);
    }

    join_result(worker.await)
}

fn join_result(
    joined: Result<MonitorResult<MonitorSummary>, JoinError>,
) -> MonitorResult<MonitorSummary> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(MonitorError::Wait(std::io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotplug_monitor::mock::{MockHost, RecordingSink};
    use hotplug_monitor::{ClassFilter, ConfigError, HotplugMonitor};

    #[test]
    fn test_bus_failure_prints_diagnostic() {
        let host = MockHost::new();
        host.fail_open(std::io::ErrorKind::PermissionDenied);
        let monitor = HotplugMonitor::new(host.bus(), host.directory(), ClassFilter::default());
        let err = monitor.run(RecordingSink::new(), None).unwrap_err();

        let mut stderr = Vec::new();
        let status = report_failure(&err, &mut stderr);

        let message = String::from_utf8(stderr).unwrap();
        assert_eq!(status, 1);
        assert!(message.starts_with("hotplug-monitor: "));
        assert!(message.ends_with('\n'));
        assert_eq!(message.lines().count(), 1);
    }

    #[test]
    fn test_invalid_config_prints_diagnostic() {
        let err = MonitorError::from(ConfigError::InvalidConfig {
            field: "logging.level".to_string(),
            message: "unknown level".to_string(),
        });

        let mut stderr = Vec::new();
        assert_eq!(report_failure(&err, &mut stderr), 1);
        assert!(String::from_utf8(stderr).unwrap().contains("unknown level"));
    }
}
