//! Kernel device-event subscription.
//!
//! A subscription is opened as [`PendingSubscription`] and becomes an
//! [`ActiveSubscription`] through a one-way, consuming `activate`. Only an
//! active subscription hands out the [`ActivationToken`] the device directory
//! requires, so a snapshot can never be taken before events are captured.

pub mod cancel;
pub mod wait;

pub use cancel::{cancel_pair, CancelToken, Canceller};
pub use wait::{wait_readable, Readiness};

use std::io;
use std::marker::PhantomData;
use std::os::fd::{AsFd, BorrowedFd};
use tracing::{debug, info};

use crate::device::{ClassFilter, DeviceEvent, DeviceRecord};
use crate::error::{MonitorError, MonitorResult};

/// OS kernel device-event bus
pub trait NotificationBus {
    type Pending: PendingChannel;

    /// Open a channel restricted to `filter`. Events are not delivered until
    /// the returned channel is activated.
    fn open(&self, filter: &ClassFilter) -> io::Result<Self::Pending>;
}

/// Opened but not yet receiving channel
pub trait PendingChannel {
    type Active: NotificationChannel;

    /// Start receiving events
    fn activate(self) -> io::Result<Self::Active>;
}

/// Receiving channel
pub trait NotificationChannel {
    type Device: DeviceRecord;

    /// Descriptor that becomes readable when records are queued
    fn readiness_fd(&self) -> BorrowedFd<'_>;

    /// Take the next queued record without blocking. `None` when the queue is
    /// empty, including after a spurious wakeup.
    fn receive_next(&mut self) -> Option<DeviceEvent<Self::Device>>;
}

/// Subscription opened for one class filter, not yet active
pub struct PendingSubscription<P> {
    channel: P,
    filter: ClassFilter,
}

impl<P: PendingChannel> PendingSubscription<P> {
    /// Open the bus channel for `filter`
    pub fn open<B>(bus: &B, filter: ClassFilter) -> MonitorResult<Self>
    where
        B: NotificationBus<Pending = P>,
    {
        let channel = bus.open(&filter).map_err(MonitorError::BusUnavailable)?;
        debug!("Opened device-event channel for subsystem '{}'", filter);
        Ok(Self { channel, filter })
    }

    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    /// Begin receiving events. Consumes the pending subscription.
    pub fn activate(self) -> MonitorResult<ActiveSubscription<P::Active>> {
        let channel = self
            .channel
            .activate()
            .map_err(MonitorError::ActivationFailed)?;
        info!("Device-event subscription active for subsystem '{}'", self.filter);

        Ok(ActiveSubscription {
            channel,
            filter: self.filter,
        })
    }
}

/// Subscription that is capturing every event from activation onward
pub struct ActiveSubscription<C> {
    channel: C,
    filter: ClassFilter,
}

impl<C: NotificationChannel> ActiveSubscription<C> {
    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    /// Proof of activation, valid while this subscription is alive
    pub fn token(&self) -> ActivationToken<'_> {
        ActivationToken {
            filter: &self.filter,
            _active: PhantomData,
        }
    }

    /// Block until at least one record is pending or `cancel` fires
    pub fn wait_ready(&self, cancel: Option<&CancelToken>) -> MonitorResult<Readiness> {
        wait_readable(self.channel.readiness_fd(), cancel.map(AsFd::as_fd))
            .map_err(MonitorError::Wait)
    }

    /// Non-blocking receive of the next record
    pub fn receive_next(&mut self) -> Option<DeviceEvent<C::Device>> {
        self.channel.receive_next()
    }
}

/// Borrowed proof that a subscription for `filter` is active.
///
/// Cannot be constructed outside this module.
#[derive(Debug, Clone, Copy)]
pub struct ActivationToken<'a> {
    filter: &'a ClassFilter,
    _active: PhantomData<&'a ()>,
}

impl<'a> ActivationToken<'a> {
    /// Class filter of the active subscription
    pub fn filter(&self) -> &'a ClassFilter {
        self.filter
    }
}
