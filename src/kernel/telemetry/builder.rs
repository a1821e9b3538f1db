//! Pure payload construction. Every function here reads its inputs and returns a
//! fresh event; none of them touch actor state.

use super::event::*;
use crate::kernel::error::TelemetryError;
use crate::kernel::geo::{haversine_m, Point};
use crate::kernel::location::{LocationSample, PartitionedLocations};
use crate::kernel::phone::PhoneState;
use crate::kernel::progress::RouteProgress;
use crate::kernel::session::SessionState;
use crate::kernel::time::{format_millis, now_millis};

const DEFAULT_PROFILE: &str = "mapbox/driving-traffic";

/// Snapshot-consistent inputs for one event.
#[derive(Debug, Clone)]
pub struct EventContext<'a> {
    pub session: &'a SessionState,
    pub progress: &'a RouteProgress,
    pub phone: PhoneState,
    pub location: Option<LocationSample>,
    pub sdk_identifier: &'a str,
    pub sdk_version: &'a str,
}

/// As-the-crow-flies distance from `location` to the end of the current route.
pub fn absolute_distance_to_destination(session: &SessionState, location: Option<LocationSample>) -> i64 {
    let destination = session.current_route.as_ref().and_then(|r| r.destination());
    match (location, destination) {
        (Some(loc), Some(dest)) => haversine_m(Point::new(loc.latitude, loc.longitude), dest) as i64,
        _ => 0,
    }
}

pub fn build_envelope(ctx: &EventContext<'_>) -> NavigationEnvelope {
    let session = ctx.session;
    let progress = ctx.progress;
    let current = session.current_route.as_ref();
    let original = session.original_route();
    let (lat, lng) = ctx
        .location
        .map(|l| (l.latitude, l.longitude))
        .unwrap_or((0.0, 0.0));

    NavigationEnvelope {
        start_timestamp: format_millis(session.started_at_millis.unwrap_or_else(now_millis)),
        sdk_identifier: ctx.sdk_identifier.to_string(),
        sdk_version: ctx.sdk_version.to_string(),
        event_version: EVENT_VERSION,
        profile: current
            .map(|r| r.profile.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
        simulation: session.is_simulated,
        location_engine: session.location_engine_name.clone(),
        session_identifier: session.session_id.clone(),
        trip_identifier: session.trip_id.clone(),
        original_request_identifier: session.original_request_id().map(str::to_string),
        request_identifier: session.request_id.clone(),
        lat,
        lng,
        original_geometry: original.map(|r| r.encoded_geometry()),
        original_estimated_distance: original.map(|r| r.distance as i64).unwrap_or(0),
        original_estimated_duration: original.map(|r| r.duration as i64).unwrap_or(0),
        original_step_count: original.map(|r| r.step_count).unwrap_or(0),
        geometry: current.map(|r| r.encoded_geometry()).unwrap_or_default(),
        estimated_distance: current.map(|r| r.distance as i64).unwrap_or(0),
        estimated_duration: current.map(|r| r.duration as i64).unwrap_or(0),
        total_step_count: current.map(|r| r.step_count).unwrap_or(0),
        leg_index: progress.current_leg_index,
        leg_count: progress.leg_count,
        step_index: progress.current_step_index,
        step_count: progress.step_count,
        distance_completed: (session.distance_completed + progress.distance_traveled) as i64,
        distance_remaining: progress.distance_remaining as i64,
        duration_remaining: progress.duration_remaining as i64,
        absolute_distance_to_destination: absolute_distance_to_destination(session, ctx.location),
        reroute_count: session.reroute_count(),
        percent_time_in_foreground: session.percent_foreground,
        percent_time_in_portrait: session.percent_portrait,
        phone: ctx.phone.clone(),
    }
}

pub fn build_step(progress: &RouteProgress) -> StepData {
    let maneuver = progress.upcoming_maneuver.clone().unwrap_or_default();
    StepData {
        upcoming_type: maneuver.kind,
        upcoming_modifier: maneuver.modifier,
        upcoming_name: maneuver.name,
        distance_remaining: progress.distance_remaining as i64,
        duration_remaining: progress.duration_remaining as i64,
    }
}

pub fn build_depart(ctx: &EventContext<'_>) -> TelemetryEvent {
    TelemetryEvent::Depart(build_envelope(ctx))
}

fn arrival(ctx: &EventContext<'_>) -> ArrivalEvent {
    ArrivalEvent {
        envelope: build_envelope(ctx),
        arrival_timestamp: format_millis(ctx.session.arrived_at_millis().unwrap_or_else(now_millis)),
    }
}

pub fn build_arrive(ctx: &EventContext<'_>) -> TelemetryEvent {
    TelemetryEvent::Arrive(arrival(ctx))
}

pub fn build_cancel(ctx: &EventContext<'_>) -> TelemetryEvent {
    TelemetryEvent::Cancel(arrival(ctx))
}

pub fn build_reroute(
    ctx: &EventContext<'_>,
    request: &RerouteRequest,
    locations: PartitionedLocations,
    seconds_since_last_reroute: i64,
) -> TelemetryEvent {
    let new_geometry = match &request.new_route {
        Some(route) => route.encoded_geometry(),
        None => ctx
            .session
            .current_route
            .as_ref()
            .map(|r| r.encoded_geometry())
            .unwrap_or_default(),
    };

    TelemetryEvent::Reroute(RerouteEvent {
        envelope: build_envelope(ctx),
        new_distance_remaining: request.new_distance_remaining as i64,
        new_duration_remaining: request.new_duration_remaining as i64,
        new_geometry,
        feedback_id: ctx.phone.feedback_id.clone(),
        step: build_step(ctx.progress),
        seconds_since_last_reroute,
        locations_before: locations.before,
        locations_after: locations.after,
        screenshot: None,
    })
}

pub fn build_feedback(
    ctx: &EventContext<'_>,
    request: &FeedbackRequest,
    locations: PartitionedLocations,
) -> TelemetryEvent {
    TelemetryEvent::Feedback(FeedbackEvent {
        envelope: build_envelope(ctx),
        user_id: ctx.phone.user_id.clone(),
        feedback_id: ctx.phone.feedback_id.clone(),
        feedback_type: request.feedback_type,
        source: request.source,
        description: request.description.clone(),
        screenshot: request.screenshot.clone(),
        step: build_step(ctx.progress),
        locations_before: locations.before,
        locations_after: locations.after,
    })
}

pub fn build_turnstile(sdk_identifier: &str, sdk_version: &str, user_id: &str) -> TelemetryEvent {
    TelemetryEvent::AppUserTurnstile(TurnstileEvent {
        created: format_millis(now_millis()),
        user_id: user_id.to_string(),
        enabled_telemetry: true,
        sdk_identifier: sdk_identifier.to_string(),
        sdk_version: sdk_version.to_string(),
    })
}

pub fn build_initial_gps(elapsed_secs: f64, session_id: &str, metadata: PerformanceMetadata) -> TelemetryEvent {
    TelemetryEvent::InitialGps(InitialGpsEvent {
        created: format_millis(now_millis()),
        elapsed_time: elapsed_secs,
        session_id: session_id.to_string(),
        metadata,
    })
}

/// Dispatches a caller request to its builder.
///
/// `locations` is only consumed by the variants that carry location history and
/// `seconds_since_last_reroute` only by reroutes.
pub fn build(
    request: &TelemetryRequest,
    ctx: &EventContext<'_>,
    locations: PartitionedLocations,
    seconds_since_last_reroute: i64,
) -> Result<TelemetryEvent, TelemetryError> {
    match request {
        TelemetryRequest::Depart => Ok(build_depart(ctx)),
        TelemetryRequest::Arrive => Ok(build_arrive(ctx)),
        TelemetryRequest::Cancel => Ok(build_cancel(ctx)),
        TelemetryRequest::Reroute(r) => Ok(build_reroute(ctx, r, locations, seconds_since_last_reroute)),
        TelemetryRequest::Feedback(f) => Ok(build_feedback(ctx, f, locations)),
        TelemetryRequest::ProgressUpdate | TelemetryRequest::OffRoute => {
            Err(TelemetryError::UnsupportedEvent(request.name().to_string()))
        }
    }
}
