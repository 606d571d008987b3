//! Simulated device host for tests.
//!
//! [`MockHost`] plays both OS collaborators: a device registry
//! ([`MockDirectory`]) and a kernel event bus ([`MockBus`]). Activated
//! channels get a real socket pair as readiness descriptor, so the event loop
//! blocks in `poll(2)` exactly as it does against udev. Every open, activate
//! and scan call and every handle acquire/release is journalled.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::ops::ControlFlow;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::device::{ClassFilter, DeviceAction, DeviceEvent, DeviceIdentity, DeviceRecord};
use crate::directory::{DeviceDirectory, ScanSummary};
use crate::report::{ReportKind, ReportSink};
use crate::subscription::{ActivationToken, NotificationBus, NotificationChannel, PendingChannel};

/// Journal entry recorded by the simulated host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open(String),
    Activate(String),
    Close(String),
    Scan(String),
    Acquire(u64),
    Release(u64),
}

/// Description of a simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDeviceSpec {
    pub subsystem: String,
    pub syspath: PathBuf,
    pub devnode: Option<PathBuf>,
    /// When false the registry fails to resolve the device during a scan
    pub resolvable: bool,
}

impl MockDeviceSpec {
    /// Input device with a node; the syspath is derived from the node
    pub fn with_node(node: &str) -> Self {
        Self {
            subsystem: ClassFilter::DEFAULT_LABEL.to_string(),
            syspath: PathBuf::from(format!("/sys/devices/mock{}", node)),
            devnode: Some(PathBuf::from(node)),
            resolvable: true,
        }
    }

    /// Input device that exposes no node
    pub fn without_node(syspath: &str) -> Self {
        Self {
            subsystem: ClassFilter::DEFAULT_LABEL.to_string(),
            syspath: PathBuf::from(syspath),
            devnode: None,
            resolvable: true,
        }
    }

    pub fn in_subsystem(mut self, subsystem: &str) -> Self {
        self.subsystem = subsystem.to_string();
        self
    }

    pub fn unresolvable(mut self) -> Self {
        self.resolvable = false;
        self
    }
}

type ScanHook = Box<dyn FnOnce(&MockHost) + Send>;

struct Subscriber {
    filter: String,
    wake: UnixStream,
    queue: Arc<Mutex<VecDeque<(String, MockDeviceSpec)>>>,
}

#[derive(Default)]
struct HostState {
    devices: Vec<MockDeviceSpec>,
    subscribers: Vec<Subscriber>,
    journal: Vec<HostCall>,
    next_handle: u64,
    live_handles: usize,
    waits: usize,
    receives: usize,
    open_error: Option<io::ErrorKind>,
    activate_error: Option<io::ErrorKind>,
    registry_error: Option<io::ErrorKind>,
    scan_hook: Option<ScanHook>,
}

/// Shared simulated host
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        // a panicking test thread must not hide the journal from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn bus(&self) -> MockBus {
        MockBus { host: self.clone() }
    }

    pub fn directory(&self) -> MockDirectory {
        MockDirectory { host: self.clone() }
    }

    /// Place a device in the registry without emitting an event
    pub fn insert(&self, spec: MockDeviceSpec) {
        self.lock().devices.push(spec);
    }

    /// Attach a device: registry insert plus "add" to active subscribers
    pub fn attach(&self, spec: MockDeviceSpec) {
        self.insert(spec.clone());
        self.emit("add", spec);
    }

    /// Detach a device: registry removal plus "remove" to active subscribers
    pub fn detach(&self, syspath: &str) {
        let removed = {
            let mut state = self.lock();
            let index = state
                .devices
                .iter()
                .position(|d| d.syspath == Path::new(syspath));
            index.map(|i| state.devices.remove(i))
        };

        if let Some(spec) = removed {
            self.emit("remove", spec);
        }
    }

    /// Deliver a raw record with any action label to matching subscribers
    pub fn emit(&self, action: &str, spec: MockDeviceSpec) {
        let state = self.lock();
        for subscriber in state.subscribers.iter().filter(|s| s.filter == spec.subsystem) {
            subscriber
                .queue
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push_back((action.to_string(), spec.clone()));
            wake(&subscriber.wake);
        }
    }

    /// Make every subscriber readable without queueing a record
    pub fn spurious_wakeup(&self) {
        let state = self.lock();
        for subscriber in &state.subscribers {
            wake(&subscriber.wake);
        }
    }

    /// Close the bus side of every active channel
    pub fn hang_up(&self) {
        self.lock().subscribers.clear();
    }

    pub fn fail_open(&self, kind: io::ErrorKind) {
        self.lock().open_error = Some(kind);
    }

    pub fn fail_activate(&self, kind: io::ErrorKind) {
        self.lock().activate_error = Some(kind);
    }

    pub fn fail_registry(&self, kind: io::ErrorKind) {
        self.lock().registry_error = Some(kind);
    }

    /// Run `hook` once at the start of the next scan, after the scan call is
    /// journalled and before any device is resolved
    pub fn on_scan(&self, hook: impl FnOnce(&MockHost) + Send + 'static) {
        self.lock().scan_hook = Some(Box::new(hook));
    }

    pub fn journal(&self) -> Vec<HostCall> {
        self.lock().journal.clone()
    }

    /// Handles acquired and not yet released
    pub fn live_handles(&self) -> usize {
        self.lock().live_handles
    }

    /// Blocking waits entered on any channel
    pub fn waits(&self) -> usize {
        self.lock().waits
    }

    /// `receive_next` calls on any channel
    pub fn receives(&self) -> usize {
        self.lock().receives
    }

    pub fn active_subscribers(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn record(&self, call: HostCall) {
        self.lock().journal.push(call);
    }

    fn acquire(&self, spec: &MockDeviceSpec) -> MockDevice {
        let mut state = self.lock();
        state.next_handle += 1;
        state.live_handles += 1;
        let id = state.next_handle;
        state.journal.push(HostCall::Acquire(id));

        MockDevice {
            id,
            syspath: spec.syspath.clone(),
            devnode: spec.devnode.clone(),
            host: self.clone(),
        }
    }
}

fn wake(stream: &UnixStream) {
    // WouldBlock means a wakeup is already pending
    let _ = (&*stream).write(&[1]);
}

/// Device handle; dropping it is the release
#[derive(Debug)]
pub struct MockDevice {
    id: u64,
    syspath: PathBuf,
    devnode: Option<PathBuf>,
    host: MockHost,
}

impl DeviceRecord for MockDevice {
    fn syspath(&self) -> &Path {
        &self.syspath
    }

    fn devnode(&self) -> Option<&Path> {
        self.devnode.as_deref()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut state = self.host.lock();
        state.live_handles -= 1;
        state.journal.push(HostCall::Release(self.id));
    }
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHost").finish_non_exhaustive()
    }
}

/// Simulated kernel event bus
pub struct MockBus {
    host: MockHost,
}

impl NotificationBus for MockBus {
    type Pending = MockPendingChannel;

    fn open(&self, filter: &ClassFilter) -> io::Result<MockPendingChannel> {
        if let Some(kind) = self.host.lock().open_error {
            return Err(io::Error::new(kind, "simulated bus open failure"));
        }
        self.host.record(HostCall::Open(filter.to_string()));

        Ok(MockPendingChannel {
            host: self.host.clone(),
            filter: filter.to_string(),
        })
    }
}

pub struct MockPendingChannel {
    host: MockHost,
    filter: String,
}

impl PendingChannel for MockPendingChannel {
    type Active = MockChannel;

    fn activate(self) -> io::Result<MockChannel> {
        let mut state = self.host.lock();
        if let Some(kind) = state.activate_error {
            return Err(io::Error::new(kind, "simulated activation failure"));
        }

        let (wake_tx, wake_rx) = UnixStream::pair()?;
        wake_tx.set_nonblocking(true)?;
        wake_rx.set_nonblocking(true)?;

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        state.subscribers.push(Subscriber {
            filter: self.filter.clone(),
            wake: wake_tx,
            queue: Arc::clone(&queue),
        });
        state.journal.push(HostCall::Activate(self.filter.clone()));
        drop(state);

        Ok(MockChannel {
            host: self.host,
            filter: self.filter,
            wake: wake_rx,
            queue,
        })
    }
}

/// Active simulated channel
pub struct MockChannel {
    host: MockHost,
    filter: String,
    wake: UnixStream,
    queue: Arc<Mutex<VecDeque<(String, MockDeviceSpec)>>>,
}

impl MockChannel {
    fn drain_wakeups(&self) {
        let mut buf = [0u8; 64];
        while let Ok(n) = (&self.wake).read(&mut buf) {
            if n == 0 {
                break;
            }
        }
    }
}

impl NotificationChannel for MockChannel {
    type Device = MockDevice;

    fn readiness_fd(&self) -> BorrowedFd<'_> {
        self.host.lock().waits += 1;
        self.wake.as_fd()
    }

    fn receive_next(&mut self) -> Option<DeviceEvent<MockDevice>> {
        self.host.lock().receives += 1;

        // drain before popping so a record queued meanwhile keeps its wakeup
        self.drain_wakeups();
        let (label, spec) = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()?;

        let device = self.host.acquire(&spec);
        Some(DeviceEvent::new(DeviceAction::from_label(&label), device))
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        let mut state = self.host.lock();
        state
            .subscribers
            .retain(|s| !Arc::ptr_eq(&s.queue, &self.queue));
        state.journal.push(HostCall::Close(self.filter.clone()));
    }
}

/// Simulated device registry
pub struct MockDirectory {
    host: MockHost,
}

impl DeviceDirectory for MockDirectory {
    type Device = MockDevice;

    fn scan(
        &self,
        token: &ActivationToken<'_>,
        visit: &mut dyn FnMut(&MockDevice) -> ControlFlow<()>,
    ) -> io::Result<ScanSummary> {
        let hook = {
            let mut state = self.host.lock();
            if let Some(kind) = state.registry_error {
                return Err(io::Error::new(kind, "simulated registry failure"));
            }
            state.journal.push(HostCall::Scan(token.filter().to_string()));
            state.scan_hook.take()
        };
        if let Some(hook) = hook {
            hook(&self.host);
        }

        let devices: Vec<MockDeviceSpec> = self
            .host
            .lock()
            .devices
            .iter()
            .filter(|d| d.subsystem == token.filter().as_str())
            .cloned()
            .collect();

        let mut summary = ScanSummary::default();
        for spec in &devices {
            if !spec.resolvable {
                summary.skipped += 1;
                continue;
            }

            let device = self.host.acquire(spec);
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

/// Report sink that keeps every record in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<(ReportKind, DeviceIdentity)>>>,
    fail_writes: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose every write fails with `BrokenPipe`
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<(ReportKind, DeviceIdentity)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records rendered as text report lines
    pub fn lines(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|(kind, identity)| format!("{}: {}", kind, identity))
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn record(&mut self, kind: ReportKind, device: &DeviceIdentity) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "report stream closed"));
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((kind, device.clone()));
        Ok(())
    }
}
