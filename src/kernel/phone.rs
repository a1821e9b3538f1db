use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time::{format_millis, now_millis};

pub const UNKNOWN: &str = "unknown";

/// Raw device readings. `None` means the reading failed or is unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReadings {
    pub volume_level: Option<u8>,
    pub battery_level: Option<u8>,
    pub screen_brightness: Option<u8>,
    pub battery_plugged_in: Option<bool>,
    pub connectivity: Option<String>,
    pub audio_type: Option<String>,
    pub application_state: Option<String>,
}

/// Hardware/OS facts are owned by the host platform. The core only asks.
pub trait PhoneStateProvider: Send + Sync {
    fn read_device(&self) -> DeviceReadings;
}

/// Provider that always answers with the same readings.
#[derive(Debug, Clone, Default)]
pub struct FixedPhoneState(pub DeviceReadings);

impl PhoneStateProvider for FixedPhoneState {
    fn read_device(&self) -> DeviceReadings {
        self.0.clone()
    }
}

/// Point-in-time device snapshot, taken once per event and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneState {
    pub volume_level: i32,
    pub battery_level: i32,
    pub screen_brightness: i32,
    pub battery_plugged_in: bool,
    pub connectivity: String,
    pub audio_type: String,
    pub application_state: String,
    pub created: String,
    #[serde(skip)]
    pub feedback_id: String,
    #[serde(skip)]
    pub user_id: String,
}

impl PhoneState {
    pub fn capture(provider: &dyn PhoneStateProvider, user_id: &str) -> Self {
        Self::from_readings(provider.read_device(), user_id, now_millis())
    }

    pub fn from_readings(readings: DeviceReadings, user_id: &str, at_millis: i64) -> Self {
        Self {
            volume_level: readings.volume_level.map(|v| v.min(100) as i32).unwrap_or(0),
            battery_level: readings.battery_level.map(|v| v.min(100) as i32).unwrap_or(-1),
            screen_brightness: readings.screen_brightness.map(|v| v.min(100) as i32).unwrap_or(0),
            battery_plugged_in: readings.battery_plugged_in.unwrap_or(false),
            connectivity: readings.connectivity.unwrap_or_else(|| UNKNOWN.to_string()),
            audio_type: readings.audio_type.unwrap_or_else(|| UNKNOWN.to_string()),
            application_state: readings.application_state.unwrap_or_else(|| UNKNOWN.to_string()),
            created: format_millis(at_millis),
            feedback_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
        }
    }
}
