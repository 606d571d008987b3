mod common;

use std::time::Duration;

use hotplug_monitor::mock::{HostCall, MockDeviceSpec, MockHost, RecordingSink};
use hotplug_monitor::{
    bootstrap, cancel_pair, ClassFilter, EventLoop, LoopExit, LoopState, MonitorError,
};

use common::{assert_release_discipline, spawn_monitor, wait_for_line, wait_until};

#[test]
fn test_startup_then_add_and_remove() {
    let host = MockHost::new();
    host.insert(MockDeviceSpec::with_node("/x/0"));
    host.insert(MockDeviceSpec::with_node("/x/1"));
    let sink = RecordingSink::new();

    let (canceller, handle) = spawn_monitor(&host, sink.clone());
    wait_for_line(&sink, "device: /x/1");

    host.attach(MockDeviceSpec::with_node("/x/2"));
    wait_for_line(&sink, "added: /x/2");
    host.detach("/sys/devices/mock/x/2");
    wait_for_line(&sink, "removed: /x/2");

    canceller.cancel().unwrap();
    let summary = handle.join().unwrap().unwrap();

    assert_eq!(summary.exit, LoopExit::Cancelled);
    assert_eq!(summary.bootstrap.snapshot.visited, 2);
    assert_eq!(summary.stats.added, 1);
    assert_eq!(summary.stats.removed, 1);
    assert_eq!(
        sink.lines(),
        vec!["device: /x/0", "device: /x/1", "added: /x/2", "removed: /x/2"]
    );
    assert_eq!(host.active_subscribers(), 0);
    assert_eq!(host.journal().last(), Some(&HostCall::Close("input".into())));
}

#[test]
fn test_change_action_produces_no_output() {
    let host = MockHost::new();
    let sink = RecordingSink::new();
    let (canceller, handle) = spawn_monitor(&host, sink.clone());
    wait_until("subscription", || host.active_subscribers() == 1);

    host.emit("change", MockDeviceSpec::with_node("/x/7"));
    host.emit("bind", MockDeviceSpec::with_node("/x/7"));
    host.attach(MockDeviceSpec::with_node("/x/8"));
    wait_for_line(&sink, "added: /x/8");

    canceller.cancel().unwrap();
    let summary = handle.join().unwrap().unwrap();

    assert_eq!(sink.lines(), vec!["added: /x/8"]);
    assert_eq!(summary.stats.ignored, 2);
    assert_eq!(summary.stats.added, 1);
    assert_release_discipline(&host.journal());
    assert_eq!(host.live_handles(), 0);
}

#[test]
fn test_spurious_readiness_is_tolerated() {
    let host = MockHost::new();
    let mut sink = RecordingSink::new();
    let (_report, subscription) =
        bootstrap(&host.bus(), &host.directory(), ClassFilter::default(), &mut sink).unwrap();
    let mut event_loop = EventLoop::new(subscription, sink.clone());

    host.spurious_wakeup();
    assert_eq!(event_loop.step().unwrap(), None);

    assert_eq!(event_loop.stats().wakeups, 1);
    assert_eq!(event_loop.stats().spurious_wakeups, 1);
    assert_eq!(event_loop.state(), LoopState::Waiting);
    assert!(sink.lines().is_empty());
}

#[test]
fn test_drain_stops_after_pending_events() {
    let host = MockHost::new();
    let mut sink = RecordingSink::new();
    let (_report, subscription) =
        bootstrap(&host.bus(), &host.directory(), ClassFilter::default(), &mut sink).unwrap();
    let mut event_loop = EventLoop::new(subscription, sink.clone());

    host.attach(MockDeviceSpec::with_node("/x/2"));
    host.emit("change", MockDeviceSpec::with_node("/x/2"));
    host.detach("/sys/devices/mock/x/2");

    let receives_before = host.receives();
    assert_eq!(event_loop.step().unwrap(), None);

    // three records plus the terminating empty receive
    assert_eq!(host.receives() - receives_before, 4);
    assert_eq!(event_loop.stats().events(), 3);
    assert_eq!(event_loop.stats().spurious_wakeups, 0);
    assert_eq!(sink.lines(), vec!["added: /x/2", "removed: /x/2"]);
    assert_release_discipline(&host.journal());
}

#[test]
fn test_idle_loop_does_not_poll() {
    let host = MockHost::new();
    let sink = RecordingSink::new();
    let (canceller, handle) = spawn_monitor(&host, sink.clone());
    wait_until("first wait", || host.waits() == 1);

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(host.waits(), 1);
    assert_eq!(host.receives(), 0);

    host.attach(MockDeviceSpec::with_node("/x/2"));
    wait_for_line(&sink, "added: /x/2");
    wait_until("second wait", || host.waits() == 2);

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(host.waits(), 2);
    assert_eq!(host.receives(), 2);

    canceller.cancel().unwrap();
    let summary = handle.join().unwrap().unwrap();
    assert_eq!(summary.stats.wakeups, 1);
    assert_eq!(host.waits(), 2);
}

#[test]
fn test_cancel_before_any_event() {
    let host = MockHost::new();
    let mut sink = RecordingSink::new();
    let (_report, subscription) =
        bootstrap(&host.bus(), &host.directory(), ClassFilter::default(), &mut sink).unwrap();
    let (canceller, token) = cancel_pair().unwrap();
    let mut event_loop = EventLoop::new(subscription, sink).with_cancel(token);

    canceller.cancel().unwrap();

    assert_eq!(event_loop.run().unwrap(), LoopExit::Cancelled);
    assert_eq!(event_loop.stats().wakeups, 0);
}

#[test]
fn test_report_failure_in_loop_releases_handle() {
    let host = MockHost::new();
    let mut snapshot_sink = RecordingSink::new();
    let (_report, subscription) = bootstrap(
        &host.bus(),
        &host.directory(),
        ClassFilter::default(),
        &mut snapshot_sink,
    )
    .unwrap();
    let mut event_loop = EventLoop::new(subscription, RecordingSink::failing());

    host.attach(MockDeviceSpec::with_node("/x/2"));

    assert!(matches!(event_loop.step(), Err(MonitorError::Report(_))));
    assert_eq!(host.live_handles(), 0);
    assert_release_discipline(&host.journal());
}

#[test]
fn test_loop_returns_subscription_and_sink() {
    let host = MockHost::new();
    let mut sink = RecordingSink::new();
    let (_report, subscription) =
        bootstrap(&host.bus(), &host.directory(), ClassFilter::default(), &mut sink).unwrap();
    let event_loop = EventLoop::new(subscription, sink);

    let (subscription, _sink, stats) = event_loop.into_parts();
    assert_eq!(subscription.filter().as_str(), "input");
    assert_eq!(stats.events(), 0);
    assert_eq!(host.active_subscribers(), 1);

    drop(subscription);
    assert_eq!(host.active_subscribers(), 0);
}
