use navtelemetry::kernel::telemetry::event::PerformanceMetadata;
use navtelemetry::kernel::telemetry::gps::InitialGpsLatencyTracker;
use navtelemetry::{MetricsReporter, TelemetryEvent};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MetricsReporter for RecordingReporter {
    fn add_event(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

fn metadata() -> PerformanceMetadata {
    PerformanceMetadata {
        sdk_identifier: "sdk".to_string(),
        sdk_version: "0.1.0".to_string(),
        device: "test-device".to_string(),
    }
}

#[test]
fn test_reports_once_per_session() {
    let reporter = Arc::new(RecordingReporter::default());
    let tracker = InitialGpsLatencyTracker::new(reporter.clone());

    // 1. Fix before any session: nothing
    assert!(!tracker.gps_received(metadata()));

    // 2. Session starts, first fix reports
    tracker.session_started("session-1");
    assert!(tracker.gps_received(metadata()));
    assert!(tracker.has_sent());

    // 3. Later fixes are ignored
    assert!(!tracker.gps_received(metadata()));
    assert!(!tracker.gps_received(metadata()));

    let events = reporter.events.lock();
    assert_eq!(events.len(), 1);
    match &events[0] {
        TelemetryEvent::InitialGps(e) => {
            assert_eq!(e.session_id, "session-1");
            assert!(e.elapsed_time >= 0.0);
            assert_eq!(e.metadata.device, "test-device");
        }
        other => panic!("Expected initial GPS event, got {}", other.name()),
    }
}

#[test]
fn test_reset_rearms_for_next_session() {
    let reporter = Arc::new(RecordingReporter::default());
    let tracker = InitialGpsLatencyTracker::new(reporter.clone());

    tracker.session_started("a");
    assert!(tracker.gps_received(metadata()));

    tracker.reset();
    assert!(!tracker.has_sent());
    assert!(!tracker.gps_received(metadata()), "Reset without a new session must not report");

    tracker.session_started("b");
    assert!(tracker.gps_received(metadata()));

    let ids: Vec<String> = reporter
        .events
        .lock()
        .iter()
        .filter_map(|e| e.session_id().map(str::to_string))
        .collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_empty_session_id_never_reports() {
    let reporter = Arc::new(RecordingReporter::default());
    let tracker = InitialGpsLatencyTracker::new(reporter.clone());

    tracker.session_started("");
    assert!(!tracker.gps_received(metadata()));
    assert!(reporter.events.lock().is_empty());
}

#[test]
fn test_concurrent_fixes_report_once() {
    let reporter = Arc::new(RecordingReporter::default());
    let tracker = Arc::new(InitialGpsLatencyTracker::new(reporter.clone()));
    tracker.session_started("racy");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            std::thread::spawn(move || tracker.gps_received(metadata()))
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|sent| *sent)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(reporter.events.lock().len(), 1);
}
