use tracing::info;

use crate::bootstrap::{bootstrap, BootstrapReport};
use crate::config::MonitorConfig;
use crate::device::ClassFilter;
use crate::directory::DeviceDirectory;
use crate::error::MonitorResult;
use crate::event_loop::{EventLoop, LoopExit, LoopStats};
use crate::report::ReportSink;
use crate::subscription::{CancelToken, NotificationBus};

/// Summary of a completed monitor run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub bootstrap: BootstrapReport,
    pub exit: LoopExit,
    pub stats: LoopStats,
}

/// Bootstrap followed by the event loop, over any registry/bus pair
pub struct HotplugMonitor<B, D> {
    bus: B,
    directory: D,
    filter: ClassFilter,
}

impl<B, D> HotplugMonitor<B, D>
where
    B: NotificationBus,
    D: DeviceDirectory,
{
    pub fn new(bus: B, directory: D, filter: ClassFilter) -> Self {
        Self {
            bus,
            directory,
            filter,
        }
    }

    /// Report the snapshot, then report changes until `cancel` fires.
    ///
    /// Without a cancellation token the call only returns on error.
    pub fn run<S: ReportSink>(
        &self,
        mut sink: S,
        cancel: Option<CancelToken>,
    ) -> MonitorResult<MonitorSummary> {
        let (report, subscription) =
            bootstrap(&self.bus, &self.directory, self.filter.clone(), &mut sink)?;

        let mut event_loop = EventLoop::new(subscription, sink);
        if let Some(token) = cancel {
            event_loop = event_loop.with_cancel(token);
        }

        let exit = event_loop.run()?;
        let stats = *event_loop.stats();
        // dropping the loop closes the subscription
        drop(event_loop);

        Ok(MonitorSummary {
            bootstrap: report,
            exit,
            stats,
        })
    }
}

/// Run against the host's udev, reporting to stdout
#[cfg(target_os = "linux")]
pub fn run_udev(config: &MonitorConfig, cancel: CancelToken) -> MonitorResult<MonitorSummary> {
    use crate::report::LineReporter;
    use crate::udev_backend::{UdevBus, UdevDirectory};

    let filter = config.class_filter()?;
    info!("Monitoring subsystem '{}' via udev", filter);

    HotplugMonitor::new(UdevBus, UdevDirectory, filter)
        .run(LineReporter::stdout(config.output), Some(cancel))
}

#[cfg(not(target_os = "linux"))]
pub fn run_udev(config: &MonitorConfig, _cancel: CancelToken) -> MonitorResult<MonitorSummary> {
    config.class_filter()?;
    info!("udev is not available on this platform");
    Err(crate::error::MonitorError::Unsupported("udev requires Linux"))
}
