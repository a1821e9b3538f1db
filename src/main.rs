use anyhow::Result;
use navtelemetry::kernel::geo::Point;
use navtelemetry::kernel::location::{LocationSample, LocationSink, LocationSource};
use navtelemetry::kernel::phone::{DeviceReadings, FixedPhoneState};
use navtelemetry::kernel::progress::{ProgressObserver, RouteProgress, RouteProgressSource, RouteProgressState};
use navtelemetry::kernel::session::{LocationEngineDescriptor, Route};
use navtelemetry::kernel::telemetry::event::{FeedbackRequest, FeedbackSource, FeedbackType};
use navtelemetry::kernel::time::now_millis;
use navtelemetry::transport::LogTransport;
use navtelemetry::{Collaborators, NavigationTelemetry, TelemetryConfig, TelemetryRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const FIX_INTERVAL_MS: u64 = 100;

/// Replays a straight-line drive: feeds fixes and progress, lets the user report an accident.
#[derive(Default)]
struct SimulatedDrive {
    sink: Mutex<Option<LocationSink>>,
    progress: Mutex<Option<ProgressObserver>>,
}

impl LocationSource for SimulatedDrive {
    fn request_location_updates(&self, sink: LocationSink) {
        *self.sink.lock() = Some(sink);
    }

    fn remove_location_updates(&self) {
        self.sink.lock().take();
    }
}

impl RouteProgressSource for SimulatedDrive {
    fn register_progress_observer(&self, observer: ProgressObserver) {
        *self.progress.lock() = Some(observer);
    }
}

fn demo_route() -> Route {
    Route {
        geometry: (0..=10)
            .map(|i| Point::new(52.5200 + i as f64 * 0.001, 13.4050))
            .collect(),
        distance: 1_100.0,
        duration: 120.0,
        step_count: 3,
        request_id: Some("demo-request".to_string()),
        profile: "mapbox/driving-traffic".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Navigation Telemetry Demo Booting...");

    let drive = Arc::new(SimulatedDrive::default());
    let transport = Arc::new(LogTransport);
    let telemetry = NavigationTelemetry::new(TelemetryConfig {
        user_id: "demo-user".to_string(),
        ..TelemetryConfig::default()
    });

    telemetry.initialize(
        "pk.demo-token",
        Collaborators {
            transport: transport.clone(),
            metrics: transport,
            route_progress: drive.clone(),
            locations: drive.clone(),
            phone_state: Arc::new(FixedPhoneState(DeviceReadings {
                volume_level: Some(60),
                battery_level: Some(80),
                ..DeviceReadings::default()
            })),
        },
    )?;

    let route = demo_route();
    telemetry
        .start_session(route.clone(), LocationEngineDescriptor::new("SimulatedDrive"))
        .await?;
    telemetry.post_telemetry_event(TelemetryRequest::Depart).await?;

    let sink = drive.sink.lock().clone();
    let observer = drive.progress.lock().clone();
    for (i, point) in route.geometry.iter().enumerate() {
        if let Some(sink) = &sink {
            sink.send(LocationSample::new(point.latitude, point.longitude, now_millis()))
                .await;
        }
        if let Some(observer) = &observer {
            let traveled = i as f64 * 110.0;
            observer.on_route_progress(RouteProgress {
                leg_count: 1,
                step_count: route.step_count,
                distance_traveled: traveled,
                distance_remaining: route.distance - traveled,
                duration_remaining: route.duration * (1.0 - traveled / route.distance),
                current_state: if i + 1 == route.geometry.len() {
                    RouteProgressState::Arrived
                } else {
                    RouteProgressState::Tracking
                },
                ..RouteProgress::default()
            });
        }
        if i == 5 {
            telemetry
                .post_telemetry_event(TelemetryRequest::Feedback(
                    FeedbackRequest::new(FeedbackType::Accident, FeedbackSource::User)
                        .with_description("demo accident"),
                ))
                .await?;
        }
        tokio::time::sleep(Duration::from_millis(FIX_INTERVAL_MS)).await;
    }

    telemetry.post_telemetry_event(TelemetryRequest::Arrive).await?;
    telemetry.end_session().await?;
    telemetry.drain().await?;
    telemetry.terminate().await;

    tracing::info!("Navigation Telemetry Demo Finished.");
    Ok(())
}
