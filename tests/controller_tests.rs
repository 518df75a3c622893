use chroma_latency::{
    CancelToken, EventPublisher, LatencyController, LatencyError, LatencyMonitor, Rgb,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const RED: Rgb = Rgb::new(255, 0, 0);
const GREEN: Rgb = Rgb::new(0, 255, 0);
const BLUE: Rgb = Rgb::new(0, 0, 255);

/// Trigger that publishes a fixed script of events, one every `step`,
/// starting after `initial_delay`. The step spacing keeps the consumer's
/// strict LOCAL/REMOTE alternation ahead of the lossy latest-value slots.
fn scripted(
    events: Vec<(Rgb, i64)>,
    initial_delay: Duration,
    step: Duration,
) -> impl FnMut(EventPublisher, CancelToken) + Send + 'static {
    move |publisher: EventPublisher, cancel: CancelToken| {
        thread::sleep(initial_delay);
        for &(color, ts) in events.iter() {
            if cancel.is_cancelled() {
                return;
            }
            publisher.publish(color, ts);
            thread::sleep(step);
        }
    }
}

fn silent() -> impl FnMut(EventPublisher, CancelToken) + Send + 'static {
    move |_publisher: EventPublisher, cancel: CancelToken| {
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

#[test]
fn test_baseline_then_samples_scenario() {
    // threshold = 100ms, fail-fast off: baseline pair, one passing sample,
    // one violating sample; the run stays alive until the watchdog fires.
    let mut controller = LatencyController::with_name("scenario");
    controller.set_latency_threshold(Duration::from_millis(100));

    let step = Duration::from_millis(80);
    controller.track_local(scripted(
        vec![(RED, 0), (BLUE, 200), (GREEN, 300)],
        Duration::ZERO,
        step,
    ));
    controller.track_remote(scripted(
        vec![(RED, 50), (BLUE, 260), (GREEN, 450)],
        Duration::from_millis(40),
        step,
    ));

    controller.check_latency(Duration::from_millis(600)).unwrap();

    let registry = controller.registry();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.violation_count(), 1);

    let blue = registry.get(260).unwrap();
    assert_eq!(blue.color(), BLUE);
    assert_eq!(blue.latency_ms(), 60);
    assert!(!blue.violates_threshold());

    let green = registry.get(450).unwrap();
    assert_eq!(green.color(), GREEN);
    assert_eq!(green.latency_ms(), 150);
    assert!(green.violates_threshold());
    let detail = green.violation().unwrap();
    assert_eq!(detail.threshold, Duration::from_millis(100));
    assert_eq!(detail.local_time, "00:00.300");
    assert_eq!(detail.remote_time, "00:00.450");

    // Insertion order follows the pairing order
    let keys: Vec<i64> = registry.entries().map(|(ts, _)| ts).collect();
    assert_eq!(keys, vec![260, 450]);
}

#[test]
fn test_color_mismatch_is_skipped_silently() {
    let mut controller = LatencyController::new();

    let step = Duration::from_millis(80);
    controller.track_local(scripted(vec![(RED, 0), (BLUE, 100)], Duration::ZERO, step));
    controller.track_remote(scripted(
        vec![(RED, 20), (GREEN, 140)],
        Duration::from_millis(40),
        step,
    ));

    controller.check_latency(Duration::from_millis(400)).unwrap();
    assert!(controller.registry().is_empty());
}

#[test]
fn test_fail_fast_records_violating_sample_and_fails() {
    let mut controller = LatencyController::new();
    controller.set_latency_threshold(Duration::from_millis(100));
    controller.set_fail_fast(true);

    let step = Duration::from_millis(80);
    controller.track_local(scripted(vec![(RED, 0), (GREEN, 100)], Duration::ZERO, step));
    controller.track_remote(scripted(
        vec![(RED, 50), (GREEN, 300)],
        Duration::from_millis(40),
        step,
    ));

    let start = Instant::now();
    let err = controller.check_latency(Duration::from_secs(10)).unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(2));

    match err {
        LatencyError::ThresholdViolation(detail) => {
            assert_eq!(detail.latency_ms, 200);
            assert_eq!(detail.threshold, Duration::from_millis(100));
        }
        other => panic!("expected ThresholdViolation, got {other:?}"),
    }

    // Partial results survive the unwind, including the violating sample.
    let registry = controller.registry();
    assert_eq!(registry.len(), 1);
    assert!(registry.get(300).unwrap().violates_threshold());
}

#[test]
fn test_local_timeout_leaves_registry_unchanged() {
    let mut controller = LatencyController::new();
    controller.set_event_timeout(Duration::from_millis(100));
    controller.track_local(silent());
    controller.track_remote(silent());

    let start = Instant::now();
    let err = controller.check_latency(Duration::from_secs(10)).unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        err,
        LatencyError::LocalStreamTimeout(t) if t == Duration::from_millis(100)
    ));
    assert!(controller.registry().is_empty());
}

#[test]
fn test_remote_timeout_after_local_event() {
    let mut controller = LatencyController::new();
    controller.set_event_timeout(Duration::from_millis(100));
    controller.track_local(scripted(vec![(RED, 0)], Duration::ZERO, Duration::ZERO));
    controller.track_remote(silent());

    let err = controller.check_latency(Duration::from_secs(10)).unwrap_err();
    assert!(matches!(err, LatencyError::RemoteStreamTimeout(_)));
    assert!(controller.registry().is_empty());
}

#[test]
fn test_watchdog_bounds_run_even_with_steady_events() {
    fn steady(base_ts: i64) -> impl FnMut(EventPublisher, CancelToken) + Send + 'static {
        move |publisher: EventPublisher, cancel: CancelToken| {
            let mut ts = base_ts;
            while !cancel.is_cancelled() {
                publisher.publish(Rgb::new(7, 7, 7), ts);
                ts += 20;
                thread::sleep(Duration::from_millis(20));
            }
        }
    }

    let mut controller = LatencyController::new();
    controller.set_event_timeout(Duration::from_millis(500));
    controller.track_local(steady(0));
    controller.track_remote(steady(5));

    let start = Instant::now();
    controller.check_latency(Duration::from_millis(300)).unwrap();
    // total duration plus at most one per-event timeout of slack
    assert!(start.elapsed() < Duration::from_millis(300) + Duration::from_millis(500));
}

#[test]
fn test_negative_latency_is_stored_as_computed() {
    let mut controller = LatencyController::new();

    let step = Duration::from_millis(80);
    controller.track_local(scripted(vec![(RED, 0), (BLUE, 500)], Duration::ZERO, step));
    controller.track_remote(scripted(
        vec![(RED, 10), (BLUE, 450)],
        Duration::from_millis(40),
        step,
    ));

    controller.check_latency(Duration::from_millis(400)).unwrap();

    let sample = controller.registry().get(450).unwrap();
    assert_eq!(sample.latency_ms(), -50);
    assert!(!sample.violates_threshold());
}

#[test]
fn test_monitor_receives_each_matched_latency() {
    struct RecordingMonitor {
        values: Arc<Mutex<Vec<i64>>>,
    }

    impl LatencyMonitor for RecordingMonitor {
        fn set_current_latency(&self, latency_ms: i64) {
            self.values.lock().unwrap().push(latency_ms);
        }
    }

    let values = Arc::new(Mutex::new(Vec::new()));
    let mut controller = LatencyController::new();
    controller.set_monitor(Box::new(RecordingMonitor {
        values: values.clone(),
    }));

    let step = Duration::from_millis(80);
    controller.track_local(scripted(
        vec![(RED, 0), (BLUE, 200), (GREEN, 300)],
        Duration::ZERO,
        step,
    ));
    controller.track_remote(scripted(
        vec![(RED, 50), (BLUE, 260), (GREEN, 450)],
        Duration::from_millis(40),
        step,
    ));

    controller.check_latency(Duration::from_millis(600)).unwrap();
    assert_eq!(*values.lock().unwrap(), vec![60, 150]);
}

#[test]
fn test_registry_summary_after_run() {
    let mut controller = LatencyController::new();

    let step = Duration::from_millis(80);
    controller.track_local(scripted(
        vec![(RED, 0), (BLUE, 100), (GREEN, 200)],
        Duration::ZERO,
        step,
    ));
    controller.track_remote(scripted(
        vec![(RED, 10), (BLUE, 140), (GREEN, 280)],
        Duration::from_millis(40),
        step,
    ));

    controller.check_latency(Duration::from_millis(500)).unwrap();

    let stats = controller.registry().summary();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.min, 40);
    assert_eq!(stats.max, 80);
}
