use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::builder::build_initial_gps;
use super::event::PerformanceMetadata;
use crate::kernel::time::ElapsedTimer;
use crate::transport::MetricsReporter;

#[derive(Debug, Default)]
struct TrackerState {
    session_id: String,
    timer: ElapsedTimer,
    has_sent: bool,
}

/// Time from navigation start to first fix, reported at most once per session.
pub struct InitialGpsLatencyTracker {
    reporter: Arc<dyn MetricsReporter>,
    state: Mutex<TrackerState>,
}

impl InitialGpsLatencyTracker {
    pub fn new(reporter: Arc<dyn MetricsReporter>) -> Self {
        Self {
            reporter,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn session_started(&self, session_id: &str) {
        let mut state = self.state.lock();
        state.session_id = session_id.to_string();
        state.timer.start();
    }

    /// Returns true only for the call that emitted the latency event.
    pub fn gps_received(&self, metadata: PerformanceMetadata) -> bool {
        let event = {
            let mut state = self.state.lock();
            if !state.timer.is_started() || state.has_sent || state.session_id.is_empty() {
                return false;
            }
            state.timer.end();
            state.has_sent = true;
            let elapsed = state.timer.elapsed_secs().unwrap_or_default();
            debug!("Initial GPS Fix: {:.3}s (session {})", elapsed, state.session_id);
            build_initial_gps(elapsed, &state.session_id, metadata)
        };
        self.reporter.add_event(event);
        true
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = TrackerState::default();
    }

    pub fn has_sent(&self) -> bool {
        self.state.lock().has_sent
    }
}

impl std::fmt::Debug for InitialGpsLatencyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitialGpsLatencyTracker")
            .field("state", &*self.state.lock())
            .finish()
    }
}

