//! libudev-backed registry and event bus.

use std::io;
use std::ops::ControlFlow;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;
use tracing::trace;
use udev::{Enumerator, MonitorBuilder, MonitorSocket};

use crate::device::{ClassFilter, DeviceAction, DeviceEvent, DeviceRecord};
use crate::directory::{DeviceDirectory, ScanSummary};
use crate::subscription::{ActivationToken, NotificationBus, NotificationChannel, PendingChannel};

impl DeviceRecord for udev::Device {
    fn syspath(&self) -> &Path {
        udev::Device::syspath(self)
    }

    fn devnode(&self) -> Option<&Path> {
        udev::Device::devnode(self)
    }
}

/// Device handle delivered by the monitor socket
pub struct UdevEventDevice(udev::Event);

impl DeviceRecord for UdevEventDevice {
    fn syspath(&self) -> &Path {
        self.0.syspath()
    }

    fn devnode(&self) -> Option<&Path> {
        self.0.devnode()
    }
}

/// Netlink "udev" event source
#[derive(Debug, Default, Clone, Copy)]
pub struct UdevBus;

impl NotificationBus for UdevBus {
    type Pending = UdevPendingChannel;

    fn open(&self, filter: &ClassFilter) -> io::Result<UdevPendingChannel> {
        let builder = MonitorBuilder::new()?.match_subsystem(filter.as_str())?;
        Ok(UdevPendingChannel { builder })
    }
}

pub struct UdevPendingChannel {
    builder: MonitorBuilder,
}

impl PendingChannel for UdevPendingChannel {
    type Active = UdevChannel;

    fn activate(self) -> io::Result<UdevChannel> {
        let socket = self.builder.listen()?;
        Ok(UdevChannel { socket })
    }
}

/// Listening monitor socket. libudev opens it non-blocking.
pub struct UdevChannel {
    socket: MonitorSocket,
}

impl NotificationChannel for UdevChannel {
    type Device = UdevEventDevice;

    fn readiness_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }

    fn receive_next(&mut self) -> Option<DeviceEvent<UdevEventDevice>> {
        let event = self.socket.iter().next()?;
        let label = event.action().and_then(|action| action.to_str());
        let action = DeviceAction::from_optional_label(label);
        trace!(
            "udev record {} for {}",
            event.sequence_number(),
            event.syspath().display()
        );

        Some(DeviceEvent::new(action, UdevEventDevice(event)))
    }
}

/// libudev enumerator
#[derive(Debug, Default, Clone, Copy)]
pub struct UdevDirectory;

impl DeviceDirectory for UdevDirectory {
    type Device = udev::Device;

    fn scan(
        &self,
        token: &ActivationToken<'_>,
        visit: &mut dyn FnMut(&udev::Device) -> ControlFlow<()>,
    ) -> io::Result<ScanSummary> {
        let mut enumerator = Enumerator::new()?;
        enumerator.match_subsystem(token.filter().as_str())?;

        // the enumerator resolves each syspath lazily and skips entries that
        // no longer resolve
        let mut summary = ScanSummary::default();
        for device in enumerator.scan_devices()? {
            summary.visited += 1;
            let flow = visit(&device);
            drop(device);

            if flow.is_break() {
                break;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::{cancel_pair, wait_readable, Readiness};
    use std::os::fd::AsRawFd;

    #[test]
    fn test_readiness_fd_is_the_monitor_socket() {
        // sandboxes without a udev netlink socket have nothing to check
        let Ok(channel) = UdevBus
            .open(&ClassFilter::default())
            .and_then(PendingChannel::activate)
        else {
            return;
        };

        assert_eq!(channel.readiness_fd().as_raw_fd(), channel.socket.as_raw_fd());

        let (canceller, token) = cancel_pair().unwrap();
        canceller.cancel().unwrap();
        let readiness = wait_readable(channel.readiness_fd(), Some(token.as_fd())).unwrap();
        assert_eq!(readiness, Readiness::Cancelled);
    }
}
