use super::location::LOCATION_BUFFER_MAX_SIZE;

pub const MAPBOX_NAVIGATION_SDK_IDENTIFIER: &str = "mapbox-navigation-android";
pub const MOCK_PROVIDER: &str =
    "com.mapbox.services.android.navigation.v5.location.replay.ReplayRouteLocationEngine";
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;
pub const DEFAULT_MAX_PUSH_ATTEMPTS: u32 = 3;

/// Static knobs of the pipeline. Set at construction, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub sdk_identifier: String,
    pub sdk_version: String,
    pub user_id: String,
    /// Device model reported with performance metadata.
    pub device: String,
    /// Engine name that marks a session as simulated.
    pub mock_location_engine: String,
    pub location_buffer_capacity: usize,
    pub command_channel_capacity: usize,
    /// Queue length that triggers a flush.
    pub flush_threshold: usize,
    /// Delivery attempts per batch before it is dropped.
    pub max_push_attempts: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sdk_identifier: MAPBOX_NAVIGATION_SDK_IDENTIFIER.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            user_id: String::new(),
            device: "unknown".to_string(),
            mock_location_engine: MOCK_PROVIDER.to_string(),
            location_buffer_capacity: LOCATION_BUFFER_MAX_SIZE,
            command_channel_capacity: LOCATION_BUFFER_MAX_SIZE,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            max_push_attempts: DEFAULT_MAX_PUSH_ATTEMPTS,
        }
    }
}
