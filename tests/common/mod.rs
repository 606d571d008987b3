// Common helpers for monitor integration tests

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use hotplug_monitor::mock::{HostCall, MockHost, RecordingSink};
use hotplug_monitor::{cancel_pair, Canceller, ClassFilter, HotplugMonitor, MonitorResult, MonitorSummary};

/// Run a full monitor against `host` on its own thread
#[allow(dead_code)]
pub fn spawn_monitor(
    host: &MockHost,
    sink: RecordingSink,
) -> (Canceller, JoinHandle<MonitorResult<MonitorSummary>>) {
    let (canceller, token) = cancel_pair().expect("cancel pair");
    let monitor = HotplugMonitor::new(host.bus(), host.directory(), ClassFilter::default());

    let handle = std::thread::spawn(move || monitor.run(sink, Some(token)));
    (canceller, handle)
}

/// Wait until `condition` holds, failing the test after five seconds
#[allow(dead_code)]
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Wait until the sink holds `line`
#[allow(dead_code)]
pub fn wait_for_line(sink: &RecordingSink, line: &str) {
    wait_until(line, || sink.lines().iter().any(|l| l == line));
}

/// Every acquired handle is released before the next one is acquired
#[allow(dead_code)]
pub fn assert_release_discipline(journal: &[HostCall]) {
    let handle_calls: Vec<&HostCall> = journal
        .iter()
        .filter(|c| matches!(c, HostCall::Acquire(_) | HostCall::Release(_)))
        .collect();

    assert_eq!(handle_calls.len() % 2, 0, "unbalanced handles: {:?}", handle_calls);
    let mut seen = std::collections::HashSet::new();
    for pair in handle_calls.chunks(2) {
        match (pair[0], pair[1]) {
            (HostCall::Acquire(a), HostCall::Release(r)) => {
                assert_eq!(a, r, "handle {} released out of order", a);
                assert!(seen.insert(*a), "handle {} acquired twice", a);
            }
            other => panic!("handle calls interleaved: {:?}", other),
        }
    }
}
