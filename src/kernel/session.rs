use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use uuid::Uuid;

use super::geo::{encode_polyline, Point};

/// A route as handed over by the routing layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub geometry: Vec<Point>,
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub step_count: u32,
    pub request_id: Option<String>,
    pub profile: String,
}

impl Route {
    pub fn destination(&self) -> Option<Point> {
        self.geometry.last().copied()
    }

    pub fn encoded_geometry(&self) -> String {
        encode_polyline(&self.geometry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEngineDescriptor {
    pub name: String,
}

impl LocationEngineDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The current navigation session. Only the actor mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session_id: String,
    pub trip_id: String,
    // Original route values are frozen at session start.
    original_route: Option<Route>,
    original_request_id: Option<String>,
    pub current_route: Option<Route>,
    pub request_id: Option<String>,
    pub started_at_millis: Option<i64>,
    arrived_at_millis: Option<i64>,
    pub distance_completed: f64,
    reroute_count: u32,
    last_reroute_at_millis: Option<i64>,
    pub location_engine_name: String,
    pub is_simulated: bool,
    pub percent_foreground: u8,
    pub percent_portrait: u8,
}

impl SessionState {
    /// Fresh identifiers, zeroed counters, route recorded as both original and current.
    pub fn start(
        route: Route,
        engine: &LocationEngineDescriptor,
        mock_engine_name: &str,
        started_at_millis: i64,
    ) -> Self {
        let request_id = route.request_id.clone();
        Self {
            session_id: Uuid::new_v4().to_string(),
            trip_id: Uuid::new_v4().to_string(),
            original_route: Some(route.clone()),
            original_request_id: request_id.clone(),
            current_route: Some(route),
            request_id,
            started_at_millis: Some(started_at_millis),
            arrived_at_millis: None,
            distance_completed: 0.0,
            reroute_count: 0,
            last_reroute_at_millis: None,
            location_engine_name: engine.name.clone(),
            is_simulated: engine.name == mock_engine_name,
            percent_foreground: 100,
            percent_portrait: 100,
        }
    }

    pub fn original_route(&self) -> Option<&Route> {
        self.original_route.as_ref()
    }

    pub fn original_request_id(&self) -> Option<&str> {
        self.original_request_id.as_deref()
    }

    pub fn arrived_at_millis(&self) -> Option<i64> {
        self.arrived_at_millis
    }

    pub fn reroute_count(&self) -> u32 {
        self.reroute_count
    }

    /// Returns false if arrival was already recorded.
    pub fn record_arrival(&mut self, at_millis: i64) -> bool {
        if self.arrived_at_millis.is_some() {
            return false;
        }
        self.arrived_at_millis = Some(at_millis);
        true
    }

    /// Seconds since the previous reroute, or -1 for the first one.
    pub fn seconds_since_last_reroute(&self, at_millis: i64) -> i64 {
        match self.last_reroute_at_millis {
            Some(last) => (at_millis - last).max(0) / 1000,
            None => -1,
        }
    }

    /// Applies a reroute. Distance travelled on the abandoned route is banked.
    pub fn apply_reroute(&mut self, new_route: Option<Route>, distance_traveled: f64, at_millis: i64) {
        self.reroute_count = self.reroute_count.saturating_add(1);
        self.last_reroute_at_millis = Some(at_millis);
        self.distance_completed += distance_traveled.max(0.0);
        if let Some(route) = new_route {
            self.request_id = route.request_id.clone();
            self.current_route = Some(route);
        }
    }

    pub fn set_display_metrics(&mut self, percent_foreground: u8, percent_portrait: u8) {
        self.percent_foreground = percent_foreground.min(100);
        self.percent_portrait = percent_portrait.min(100);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionControlState {
    SessionEnd = 0,
    SessionStart = 1,
}

/// Two-state flag making start/end idempotent across concurrent callers.
#[derive(Debug)]
pub struct SessionControl {
    state: AtomicU8,
}

impl SessionControl {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionControlState::SessionEnd as u8),
        }
    }

    /// END -> START. False means a session was already open.
    pub fn try_start(&self) -> bool {
        self.transition(SessionControlState::SessionEnd, SessionControlState::SessionStart)
    }

    /// START -> END. False means there was nothing to end.
    pub fn try_end(&self) -> bool {
        self.transition(SessionControlState::SessionStart, SessionControlState::SessionEnd)
    }

    pub fn current(&self) -> SessionControlState {
        match self.state.load(Ordering::Acquire) {
            1 => SessionControlState::SessionStart,
            _ => SessionControlState::SessionEnd,
        }
    }

    fn transition(&self, from: SessionControlState, to: SessionControlState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}
