//! Wait/dispatch loop over an active subscription.
//!
//! The loop alternates between two states. In `Waiting` it blocks in
//! `poll(2)` on the subscription descriptor and the optional cancellation
//! descriptor. In `Dispatching` it drains queued records until
//! `receive_next` returns `None`, then goes back to waiting.

use tracing::{debug, info, trace};

use crate::device::{DeviceAction, DeviceEvent, DeviceRecord};
use crate::error::{MonitorError, MonitorResult};
use crate::logging::log_device_event;
use crate::report::{ReportKind, ReportSink};
use crate::subscription::{ActiveSubscription, CancelToken, NotificationChannel, Readiness};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Waiting,
    Dispatching,
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
}

/// Counters kept by the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Readiness signals received
    pub wakeups: u64,
    /// Wakeups that yielded no record
    pub spurious_wakeups: u64,
    pub added: u64,
    pub removed: u64,
    /// Records with any other action
    pub ignored: u64,
}

impl LoopStats {
    /// Records drained in total
    pub fn events(&self) -> u64 {
        self.added + self.removed + self.ignored
    }
}

pub struct EventLoop<C, S> {
    subscription: ActiveSubscription<C>,
    sink: S,
    cancel: Option<CancelToken>,
    state: LoopState,
    stats: LoopStats,
}

impl<C, S> EventLoop<C, S>
where
    C: NotificationChannel,
    S: ReportSink,
{
    pub fn new(subscription: ActiveSubscription<C>, sink: S) -> Self {
        Self {
            subscription,
            sink,
            cancel: None,
            state: LoopState::Waiting,
            stats: LoopStats::default(),
        }
    }

    /// Attach a cancellation token polled alongside the subscription
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Run until cancelled or a fatal wait/report error occurs
    pub fn run(&mut self) -> MonitorResult<LoopExit> {
        info!(
            "Watching subscription '{}' for device changes",
            self.subscription.filter()
        );

        loop {
            if let Some(exit) = self.step()? {
                info!(
                    wakeups = self.stats.wakeups,
                    added = self.stats.added,
                    removed = self.stats.removed,
                    ignored = self.stats.ignored,
                    "Event loop stopped: {:?}",
                    exit
                );
                return Ok(exit);
            }
        }
    }

    /// One Waiting → Dispatching → Waiting cycle
    pub fn step(&mut self) -> MonitorResult<Option<LoopExit>> {
        self.state = LoopState::Waiting;

        match self.subscription.wait_ready(self.cancel.as_ref())? {
            Readiness::Cancelled => Ok(Some(LoopExit::Cancelled)),
            Readiness::Ready => {
                self.stats.wakeups += 1;
                let drained = self.dispatch()?;
                if drained == 0 {
                    self.stats.spurious_wakeups += 1;
                    trace!("Spurious readiness on device-event channel");
                }
                Ok(None)
            }
        }
    }

    /// Drain every queued record; returns how many were drained
    pub fn dispatch(&mut self) -> MonitorResult<usize> {
        self.state = LoopState::Dispatching;

        let mut drained = 0;
        while let Some(event) = self.subscription.receive_next() {
            drained += 1;
            self.handle(event)?;
        }

        self.state = LoopState::Waiting;
        Ok(drained)
    }

    fn handle(&mut self, event: DeviceEvent<C::Device>) -> MonitorResult<()> {
        let DeviceEvent { action, device } = event;
        let identity = device.identity();
        drop(device);

        log_device_event(&action, &identity);

        match action {
            DeviceAction::Added => self.stats.added += 1,
            DeviceAction::Removed => self.stats.removed += 1,
            DeviceAction::Other(ref label) => {
                self.stats.ignored += 1;
                debug!("Ignoring '{}' for {}", label, identity);
            }
        }

        if let Some(kind) = ReportKind::for_action(&action) {
            self.sink
                .record(kind, &identity)
                .map_err(MonitorError::Report)?;
        }

        Ok(())
    }

    /// Tear the loop apart, returning the subscription and sink
    pub fn into_parts(self) -> (ActiveSubscription<C>, S, LoopStats) {
        (self.subscription, self.sink, self.stats)
    }
}
