use tracing::error;

use crate::device::ClassFilter;
use crate::directory::{take_snapshot, DeviceDirectory, ScanSummary};
use crate::error::{MonitorError, MonitorResult};
use crate::logging::log_lifecycle_event;
use crate::report::{ReportKind, ReportSink};
use crate::subscription::{ActiveSubscription, NotificationBus, PendingChannel, PendingSubscription};

/// Active subscription type produced by a bus
pub type BusSubscription<B> =
    ActiveSubscription<<<B as NotificationBus>::Pending as PendingChannel>::Active>;

/// Outcome of the startup sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub filter: ClassFilter,
    pub snapshot: ScanSummary,
}

/// Subscribe first, then snapshot.
///
/// The subscription is active before the directory is touched, so every
/// change after this point reaches the returned subscription. A device that
/// appears between activation and scan may be reported twice (once as
/// present, once as added); nothing is missed. If the bus cannot be opened or
/// activated the directory is never scanned.
pub fn bootstrap<B, D, S>(
    bus: &B,
    directory: &D,
    filter: ClassFilter,
    sink: &mut S,
) -> MonitorResult<(BootstrapReport, BusSubscription<B>)>
where
    B: NotificationBus,
    D: DeviceDirectory,
    S: ReportSink + ?Sized,
{
    let pending = PendingSubscription::open(bus, filter).inspect_err(|e| {
        error!("Failed to open device-event bus: {}", e);
    })?;
    log_lifecycle_event("open", pending.filter().as_str(), None);

    let subscription = pending.activate().inspect_err(|e| {
        error!("Failed to activate device-event subscription: {}", e);
    })?;
    log_lifecycle_event("activate", subscription.filter().as_str(), None);

    let snapshot = take_snapshot(directory, &subscription.token(), |identity| {
        sink.record(ReportKind::Present, &identity)
            .map_err(MonitorError::Report)
    })?;
    let details = format!("{} present, {} skipped", snapshot.visited, snapshot.skipped);
    log_lifecycle_event("snapshot", subscription.filter().as_str(), Some(&details));

    let report = BootstrapReport {
        filter: subscription.filter().clone(),
        snapshot,
    };

    Ok((report, subscription))
}
