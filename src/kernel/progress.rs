use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use super::time::now_millis;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteProgressState {
    #[default]
    Undefined,
    Initialized,
    Tracking,
    Arrived,
    OffRoute,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub kind: String,
    pub modifier: String,
    pub name: String,
}

/// Progress along the active route as reported by the navigation engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteProgress {
    pub current_leg_index: u32,
    pub current_step_index: u32,
    pub leg_count: u32,
    pub step_count: u32,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub distance_traveled: f64,
    pub current_state: RouteProgressState,
    pub upcoming_maneuver: Option<Maneuver>,
}

/// Progress plus the instant it reached the telemetry core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampedProgress {
    pub received_at_millis: i64,
    pub progress: RouteProgress,
}

/// Handle given to the progress source. Only the latest value is kept.
#[derive(Debug, Clone)]
pub struct ProgressObserver {
    tx: Arc<watch::Sender<TimestampedProgress>>,
}

impl ProgressObserver {
    pub(crate) fn new(tx: watch::Sender<TimestampedProgress>) -> Self {
        Self { tx: Arc::new(tx) }
    }

    pub fn on_route_progress(&self, progress: RouteProgress) {
        // Overwrites any unread snapshot; stale progress is replaceable.
        self.tx.send_replace(TimestampedProgress {
            received_at_millis: now_millis(),
            progress,
        });
    }
}

/// Navigation engine side of the progress feed. Subscribed exactly once.
pub trait RouteProgressSource: Send + Sync {
    fn register_progress_observer(&self, observer: ProgressObserver);
}

/// Conflated progress channel, seeded with an empty snapshot so non-driving
/// events can be built before the first real update arrives.
pub fn progress_channel() -> (ProgressObserver, watch::Receiver<TimestampedProgress>) {
    let (tx, rx) = watch::channel(TimestampedProgress {
        received_at_millis: now_millis(),
        progress: RouteProgress::default(),
    });
    (ProgressObserver::new(tx), rx)
}
