pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod device;
pub mod directory;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod mock;
pub mod monitor;
pub mod report;
pub mod subscription;

#[cfg(target_os = "linux")]
pub mod udev_backend;

pub use bootstrap::{bootstrap, BootstrapReport};
pub use config::{ConfigError, MonitorConfig, OutputFormat};
pub use device::{ClassFilter, DeviceAction, DeviceEvent, DeviceIdentity, DeviceRecord};
pub use directory::{take_snapshot, DeviceDirectory, ScanSummary};
pub use error::{MonitorError, MonitorResult};
pub use event_loop::{EventLoop, LoopExit, LoopState, LoopStats};
pub use monitor::{HotplugMonitor, MonitorSummary};
pub use report::{LineReporter, ReportKind, ReportSink};
pub use subscription::{
    cancel_pair, ActivationToken, ActiveSubscription, CancelToken, Canceller, NotificationBus,
    NotificationChannel, PendingChannel, PendingSubscription, Readiness,
};
