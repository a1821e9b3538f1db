use serde::{Deserialize, Serialize};

use crate::kernel::location::LocationSample;
use crate::kernel::phone::PhoneState;
use crate::kernel::session::Route;

/// Integer version of the navigation event payloads.
pub const EVENT_VERSION: u32 = 7;

pub const NAVIGATION_DEPART: &str = "navigation.depart";
pub const NAVIGATION_ARRIVE: &str = "navigation.arrive";
pub const NAVIGATION_CANCEL: &str = "navigation.cancel";
pub const NAVIGATION_REROUTE: &str = "navigation.reroute";
pub const NAVIGATION_FEEDBACK: &str = "navigation.feedback";
pub const NAVIGATION_PROGRESS: &str = "navigation.progress";
pub const NAVIGATION_OFF_ROUTE: &str = "navigation.off_route";
pub const APP_USER_TURNSTILE: &str = "appUserTurnstile";
pub const INITIAL_GPS: &str = "initial_gps_event";

// ---------------------------------------------------------------------------
// Caller-facing requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Accident,
    Hazard,
    RoadClosed,
    NotAllowed,
    RoutingError,
    MissingRoad,
    MissingExit,
    ConfusingInstruction,
    InaccurateGps,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    User,
    Reroute,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub feedback_type: FeedbackType,
    pub description: Option<String>,
    pub source: FeedbackSource,
    pub screenshot: Option<String>,
}

impl FeedbackRequest {
    pub fn new(feedback_type: FeedbackType, source: FeedbackSource) -> Self {
        Self {
            feedback_type,
            description: None,
            source,
            screenshot: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RerouteRequest {
    /// Replacement route. `None` keeps the current route.
    pub new_route: Option<Route>,
    pub new_distance_remaining: f64,
    pub new_duration_remaining: f64,
}

/// What a caller can post. Payloads are built by the actor.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRequest {
    Depart,
    Arrive,
    Cancel,
    Reroute(RerouteRequest),
    Feedback(FeedbackRequest),
    ProgressUpdate,
    OffRoute,
}

impl TelemetryRequest {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryRequest::Depart => NAVIGATION_DEPART,
            TelemetryRequest::Arrive => NAVIGATION_ARRIVE,
            TelemetryRequest::Cancel => NAVIGATION_CANCEL,
            TelemetryRequest::Reroute(_) => NAVIGATION_REROUTE,
            TelemetryRequest::Feedback(_) => NAVIGATION_FEEDBACK,
            TelemetryRequest::ProgressUpdate => NAVIGATION_PROGRESS,
            TelemetryRequest::OffRoute => NAVIGATION_OFF_ROUTE,
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Fields shared by every navigation event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEnvelope {
    pub start_timestamp: String,
    pub sdk_identifier: String,
    pub sdk_version: String,
    pub event_version: u32,
    pub profile: String,
    pub simulation: bool,
    pub location_engine: String,
    pub session_identifier: String,
    pub trip_identifier: String,
    pub original_request_identifier: Option<String>,
    pub request_identifier: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub original_geometry: Option<String>,
    pub original_estimated_distance: i64,
    pub original_estimated_duration: i64,
    pub original_step_count: u32,
    pub geometry: String,
    pub estimated_distance: i64,
    pub estimated_duration: i64,
    pub total_step_count: u32,
    pub leg_index: u32,
    pub leg_count: u32,
    pub step_index: u32,
    pub step_count: u32,
    pub distance_completed: i64,
    pub distance_remaining: i64,
    pub duration_remaining: i64,
    pub absolute_distance_to_destination: i64,
    pub reroute_count: u32,
    pub percent_time_in_foreground: u8,
    pub percent_time_in_portrait: u8,
    #[serde(flatten)]
    pub phone: PhoneState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    pub upcoming_type: String,
    pub upcoming_modifier: String,
    pub upcoming_name: String,
    pub distance_remaining: i64,
    pub duration_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEvent {
    #[serde(flatten)]
    pub envelope: NavigationEnvelope,
    pub arrival_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerouteEvent {
    #[serde(flatten)]
    pub envelope: NavigationEnvelope,
    pub new_distance_remaining: i64,
    pub new_duration_remaining: i64,
    pub new_geometry: String,
    pub feedback_id: String,
    pub step: StepData,
    pub seconds_since_last_reroute: i64,
    pub locations_before: Vec<LocationSample>,
    pub locations_after: Vec<LocationSample>,
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    #[serde(flatten)]
    pub envelope: NavigationEnvelope,
    pub user_id: String,
    pub feedback_id: String,
    pub feedback_type: FeedbackType,
    pub source: FeedbackSource,
    pub description: Option<String>,
    pub screenshot: Option<String>,
    pub step: StepData,
    pub locations_before: Vec<LocationSample>,
    pub locations_after: Vec<LocationSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnstileEvent {
    pub created: String,
    pub user_id: String,
    pub enabled_telemetry: bool,
    pub sdk_identifier: String,
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetadata {
    pub sdk_identifier: String,
    pub sdk_version: String,
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialGpsEvent {
    pub created: String,
    /// Seconds from navigation start to first fix.
    pub elapsed_time: f64,
    pub session_id: String,
    pub metadata: PerformanceMetadata,
}

/// Immutable payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum TelemetryEvent {
    #[serde(rename = "navigation.depart")]
    Depart(NavigationEnvelope),
    #[serde(rename = "navigation.arrive")]
    Arrive(ArrivalEvent),
    #[serde(rename = "navigation.cancel")]
    Cancel(ArrivalEvent),
    #[serde(rename = "navigation.reroute")]
    Reroute(RerouteEvent),
    #[serde(rename = "navigation.feedback")]
    Feedback(FeedbackEvent),
    #[serde(rename = "appUserTurnstile")]
    AppUserTurnstile(TurnstileEvent),
    #[serde(rename = "initial_gps_event")]
    InitialGps(InitialGpsEvent),
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::Depart(_) => NAVIGATION_DEPART,
            TelemetryEvent::Arrive(_) => NAVIGATION_ARRIVE,
            TelemetryEvent::Cancel(_) => NAVIGATION_CANCEL,
            TelemetryEvent::Reroute(_) => NAVIGATION_REROUTE,
            TelemetryEvent::Feedback(_) => NAVIGATION_FEEDBACK,
            TelemetryEvent::AppUserTurnstile(_) => APP_USER_TURNSTILE,
            TelemetryEvent::InitialGps(_) => INITIAL_GPS,
        }
    }

    pub fn envelope(&self) -> Option<&NavigationEnvelope> {
        match self {
            TelemetryEvent::Depart(envelope) => Some(envelope),
            TelemetryEvent::Arrive(e) | TelemetryEvent::Cancel(e) => Some(&e.envelope),
            TelemetryEvent::Reroute(e) => Some(&e.envelope),
            TelemetryEvent::Feedback(e) => Some(&e.envelope),
            TelemetryEvent::AppUserTurnstile(_) | TelemetryEvent::InitialGps(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            TelemetryEvent::InitialGps(e) => Some(e.session_id.as_str()),
            other => other.envelope().map(|e| e.session_identifier.as_str()),
        }
    }
}
