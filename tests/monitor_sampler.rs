use desk_driver::monitor::{ActivityMonitor, EventSource};
use std::sync::Arc;
use std::time::Duration;

use mock_backend::MockBackend;

#[test]
fn sampler_appends_until_shutdown() {
    let backend: Arc<MockBackend> = Arc::new(MockBackend::new());
    let monitor = ActivityMonitor::with_sampler(
        100,
        100,
        backend,
        Duration::from_millis(1),
    );

    // Give the sampler a few periods to run.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while monitor.mouse_history().is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!monitor.mouse_history().is_empty());
    assert!(monitor.last_position().is_some());
    assert!(monitor.last_move_time().is_some());

    monitor.shutdown();
    let settled = monitor.mouse_history().len();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(monitor.mouse_history().len(), settled);

    // A second shutdown is a no-op.
    monitor.shutdown();
}

#[test]
fn sample_ring_stays_bounded_under_load() {
    let backend: Arc<MockBackend> = Arc::new(MockBackend::new());
    let monitor = ActivityMonitor::with_sampler(
        8,
        8,
        backend,
        Duration::from_micros(200),
    );
    std::thread::sleep(Duration::from_millis(50));
    monitor.shutdown();
    assert!(monitor.mouse_history().len() <= 8);
}

#[test]
fn action_recording_works_alongside_the_sampler() {
    let backend: Arc<MockBackend> = Arc::new(MockBackend::new());
    let monitor = ActivityMonitor::with_sampler(
        100,
        100,
        backend,
        Duration::from_millis(1),
    );
    for i in 0..50 {
        monitor.record_action(
            EventSource::Parser,
            "WAIT",
            serde_json::json!({ "seq": i }),
        );
    }
    monitor.shutdown();

    let actions = monitor.action_history();
    assert_eq!(actions.len(), 50);
    // Recorded order survives concurrent sampling.
    for (i, event) in actions.iter().enumerate() {
        assert_eq!(event.data["seq"], i);
    }
}

#[test]
fn dropping_an_unshutdown_monitor_does_not_hang() {
    let backend: Arc<MockBackend> = Arc::new(MockBackend::new());
    let monitor = ActivityMonitor::with_sampler(
        10,
        10,
        backend,
        Duration::from_millis(1),
    );
    // The sampler only holds a weak reference, so dropping the last strong
    // handle lets the thread wind down on its own.
    drop(monitor);
}
