use navtelemetry::kernel::config::MOCK_PROVIDER;
use navtelemetry::kernel::geo::{encode_polyline, haversine_m, Point};
use navtelemetry::kernel::location::{LocationSample, PartitionedLocations};
use navtelemetry::kernel::phone::{DeviceReadings, PhoneState};
use navtelemetry::kernel::progress::{Maneuver, RouteProgress};
use navtelemetry::kernel::session::{LocationEngineDescriptor, Route, SessionState};
use navtelemetry::kernel::telemetry::builder::{
    absolute_distance_to_destination, build, build_envelope, EventContext,
};
use navtelemetry::kernel::telemetry::event::{
    FeedbackRequest, FeedbackSource, FeedbackType, RerouteRequest, EVENT_VERSION,
};
use navtelemetry::kernel::time::{format_millis, ElapsedTimer};
use navtelemetry::{TelemetryError, TelemetryEvent, TelemetryRequest};

const DESTINATION: Point = Point {
    latitude: 37.7749,
    longitude: -122.4194,
};

fn route() -> Route {
    Route {
        geometry: vec![Point::new(37.7000, -122.4000), DESTINATION],
        distance: 9_000.0,
        duration: 900.0,
        step_count: 7,
        request_id: Some("req-a".to_string()),
        profile: String::new(),
    }
}

fn session() -> SessionState {
    SessionState::start(route(), &LocationEngineDescriptor::new("engine"), MOCK_PROVIDER, 0)
}

fn phone() -> PhoneState {
    PhoneState::from_readings(DeviceReadings::default(), "user-1", 0)
}

fn progress() -> RouteProgress {
    RouteProgress {
        current_leg_index: 0,
        current_step_index: 2,
        leg_count: 1,
        step_count: 7,
        distance_remaining: 4_000.0,
        duration_remaining: 400.0,
        distance_traveled: 100.0,
        upcoming_maneuver: Some(Maneuver {
            kind: "turn".to_string(),
            modifier: "left".to_string(),
            name: "Market St".to_string(),
        }),
        ..RouteProgress::default()
    }
}

#[test]
fn test_polyline_known_vector() {
    let points = [
        Point::new(38.5, -120.2),
        Point::new(40.7, -120.95),
        Point::new(43.252, -126.453),
    ];
    assert_eq!(encode_polyline(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    assert_eq!(encode_polyline(&[]), "");
}

#[test]
fn test_haversine_sanity() {
    let a = Point::new(37.0, -122.0);
    assert_eq!(haversine_m(a, a), 0.0);

    // 0.001 degrees of latitude is about 111m
    let d = haversine_m(a, Point::new(37.001, -122.0));
    assert!((110.0..=112.5).contains(&d), "Got {}", d);
}

#[test]
fn test_absolute_distance_to_destination() {
    let session = session();
    let at_destination = LocationSample::new(DESTINATION.latitude, DESTINATION.longitude, 0);
    assert_eq!(absolute_distance_to_destination(&session, Some(at_destination)), 0);
    assert_eq!(absolute_distance_to_destination(&session, None), 0);
    assert_eq!(
        absolute_distance_to_destination(&SessionState::default(), Some(at_destination)),
        0,
        "No route means no destination"
    );

    let near = LocationSample::new(DESTINATION.latitude - 0.001, DESTINATION.longitude, 0);
    let d = absolute_distance_to_destination(&session, Some(near));
    assert!((110..=112).contains(&d), "Got {}", d);
}

#[test]
fn test_envelope_fields() {
    let mut session = session();
    session.apply_reroute(None, 250.0, 1_000);
    let progress = progress();
    let ctx = EventContext {
        session: &session,
        progress: &progress,
        phone: phone(),
        location: Some(LocationSample::new(37.71, -122.41, 5)),
        sdk_identifier: "sdk",
        sdk_version: "1.2.3",
    };

    let envelope = build_envelope(&ctx);
    assert_eq!(envelope.event_version, EVENT_VERSION);
    assert_eq!(envelope.session_identifier, session.session_id);
    assert_eq!(envelope.profile, "mapbox/driving-traffic", "Empty profile falls back to default");
    assert_eq!(envelope.distance_completed, 350, "Banked 250 + 100 travelled");
    assert_eq!(envelope.distance_remaining, 4_000);
    assert_eq!(envelope.reroute_count, 1);
    assert_eq!(envelope.original_estimated_distance, 9_000);
    assert_eq!(envelope.geometry, route().encoded_geometry());
    assert_eq!(envelope.original_geometry, Some(route().encoded_geometry()));
    assert_eq!(envelope.start_timestamp, format_millis(0));
    assert_eq!((envelope.lat, envelope.lng), (37.71, -122.41));
    assert_eq!(envelope.phone.battery_level, -1, "Failed battery read defaults to -1");
    assert_eq!(envelope.phone.connectivity, "unknown");
}

#[test]
fn test_feedback_payload_shape() {
    let session = session();
    let progress = progress();
    let ctx = EventContext {
        session: &session,
        progress: &progress,
        phone: phone(),
        location: None,
        sdk_identifier: "sdk",
        sdk_version: "1.2.3",
    };
    let request = TelemetryRequest::Feedback(
        FeedbackRequest::new(FeedbackType::Accident, FeedbackSource::User).with_description("crash"),
    );
    let locations = PartitionedLocations {
        before: vec![LocationSample::new(1.0, 2.0, 10)],
        after: vec![LocationSample::new(1.0, 2.0, 30)],
    };

    let event = build(&request, &ctx, locations, -1).expect("Feedback is supported");
    let json = serde_json::to_value(&event).expect("Serializes");

    assert_eq!(json["event"], "navigation.feedback");
    assert_eq!(json["feedbackType"], "accident");
    assert_eq!(json["source"], "user");
    assert_eq!(json["description"], "crash");
    assert_eq!(json["userId"], "user-1");
    assert_eq!(json["eventVersion"], EVENT_VERSION);
    assert_eq!(json["batteryLevel"], -1, "Phone state is flattened into the envelope");
    assert_eq!(json["step"]["upcomingName"], "Market St");
    assert_eq!(json["locationsBefore"][0]["timestampMillis"], 10);
    assert_eq!(json["locationsAfter"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(json["feedbackId"], ctx.phone.feedback_id.as_str());
}

#[test]
fn test_reroute_payload_uses_new_route() {
    let session = session();
    let progress = progress();
    let ctx = EventContext {
        session: &session,
        progress: &progress,
        phone: phone(),
        location: None,
        sdk_identifier: "sdk",
        sdk_version: "1.2.3",
    };
    let mut new_route = route();
    new_route.geometry = vec![Point::new(38.5, -120.2), Point::new(40.7, -120.95)];
    let request = TelemetryRequest::Reroute(RerouteRequest {
        new_route: Some(new_route.clone()),
        new_distance_remaining: 5_000.0,
        new_duration_remaining: 500.0,
    });

    let event = build(&request, &ctx, PartitionedLocations::default(), 42).expect("Reroute is supported");
    match event {
        TelemetryEvent::Reroute(e) => {
            assert_eq!(e.new_geometry, new_route.encoded_geometry());
            assert_eq!(e.new_distance_remaining, 5_000);
            assert_eq!(e.seconds_since_last_reroute, 42);
            assert_eq!(e.envelope.geometry, route().encoded_geometry(), "Envelope still shows the pre-reroute route");
        }
        other => panic!("Expected reroute, got {}", other.name()),
    }
}

#[test]
fn test_cancel_uses_recorded_arrival() {
    let mut session = session();
    session.record_arrival(60_000);
    let progress = RouteProgress::default();
    let ctx = EventContext {
        session: &session,
        progress: &progress,
        phone: phone(),
        location: None,
        sdk_identifier: "sdk",
        sdk_version: "1.2.3",
    };

    match build(&TelemetryRequest::Cancel, &ctx, PartitionedLocations::default(), -1) {
        Ok(TelemetryEvent::Cancel(e)) => assert_eq!(e.arrival_timestamp, format_millis(60_000)),
        other => panic!("Unexpected: {:?}", other),
    }
}

#[test]
fn test_unsupported_requests_are_rejected() {
    let session = session();
    let progress = RouteProgress::default();
    let ctx = EventContext {
        session: &session,
        progress: &progress,
        phone: phone(),
        location: None,
        sdk_identifier: "sdk",
        sdk_version: "1.2.3",
    };

    for request in [TelemetryRequest::ProgressUpdate, TelemetryRequest::OffRoute] {
        let result = build(&request, &ctx, PartitionedLocations::default(), -1);
        match result {
            Err(TelemetryError::UnsupportedEvent(name)) => assert_eq!(name, request.name()),
            other => panic!("Expected UnsupportedEvent, got {:?}", other),
        }
    }
}

#[test]
fn test_phone_snapshot_is_fresh_per_event() {
    let a = phone();
    let b = phone();
    assert_ne!(a.feedback_id, b.feedback_id);

    let readings = DeviceReadings {
        battery_level: Some(150),
        connectivity: Some("wifi".to_string()),
        ..DeviceReadings::default()
    };
    let snapshot = PhoneState::from_readings(readings, "u", 0);
    assert_eq!(snapshot.battery_level, 100);
    assert_eq!(snapshot.connectivity, "wifi");
}

#[test]
fn test_elapsed_timer() {
    let mut timer = ElapsedTimer::new();
    assert!(timer.elapsed().is_none());
    timer.end();
    assert!(timer.elapsed().is_none(), "End before start is ignored");

    timer.start();
    assert!(timer.is_started());
    assert!(timer.elapsed().is_none());
    timer.end();
    assert!(timer.elapsed_secs().is_some());
}
