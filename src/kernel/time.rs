use chrono::{DateTime, TimeZone, Utc};
use std::time::{Duration, Instant};

/// Wire format for every timestamp in a payload: `yyyy-MM-dd'T'HH:mm:ss.SSSZ`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Milliseconds since the Unix epoch, the unit location fixes are stamped in.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) => format_timestamp(at),
        None => format_timestamp(Utc::now()),
    }
}

/// Stopwatch. `elapsed` is only meaningful once both ends are recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedTimer {
    start: Option<Instant>,
    end: Option<Instant>,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.end = None;
    }

    pub fn end(&mut self) {
        if self.start.is_some() {
            self.end = Some(Instant::now());
        }
    }

    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64())
    }
}
