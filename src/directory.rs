//! Device directory: one-shot inventory of the devices currently present.

use std::io;
use std::ops::ControlFlow;
use tracing::{debug, info};

use crate::device::{DeviceIdentity, DeviceRecord};
use crate::error::{MonitorError, MonitorResult};
use crate::subscription::ActivationToken;

/// OS device registry
pub trait DeviceDirectory {
    type Device: DeviceRecord;

    /// Enumerate devices of the token's class in registry order.
    ///
    /// Each resolved handle is passed to `visit` and released before the next
    /// one is resolved. Devices that fail to resolve are skipped and counted.
    /// An error means the registry query could not be set up at all.
    fn scan(
        &self,
        token: &ActivationToken<'_>,
        visit: &mut dyn FnMut(&Self::Device) -> ControlFlow<()>,
    ) -> io::Result<ScanSummary>;
}

/// Counters from one directory scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Devices handed to the visitor
    pub visited: usize,
    /// Devices that failed to resolve
    pub skipped: usize,
}

/// Take the startup snapshot, handing each device identity to `report`.
///
/// A failing `report` stops the scan and its error is returned; the current
/// handle is still released by the directory.
pub fn take_snapshot<D, F>(
    directory: &D,
    token: &ActivationToken<'_>,
    mut report: F,
) -> MonitorResult<ScanSummary>
where
    D: DeviceDirectory,
    F: FnMut(DeviceIdentity) -> MonitorResult<()>,
{
    let mut failure = None;

    let summary = directory
        .scan(token, &mut |device| match report(device.identity()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        })
        .map_err(MonitorError::RegistryUnavailable)?;

    if let Some(e) = failure {
        return Err(e);
    }

    if summary.skipped > 0 {
        debug!("Skipped {} unresolvable device(s) during scan", summary.skipped);
    }
    info!(
        "Initial scan of subsystem '{}' found {} device(s)",
        token.filter(),
        summary.visited
    );

    Ok(summary)
}
