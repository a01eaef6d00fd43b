//! Configuration data models
//!
//! This module defines the data structures used for application configuration,
//! including the persisted audio device list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Whether a device plays sound or records it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Recording device (microphone, line-in)
    Input,
    /// Playback device (speakers, headphones)
    Output,
}

impl Direction {
    /// Both directions, outputs first (the order used for startup registration)
    pub const ALL: [Direction; 2] = [Direction::Output, Direction::Input];

    /// Human-readable title used in notifications
    pub fn title(self) -> &'static str {
        match self {
            Direction::Input => "Audio Input",
            Direction::Output => "Audio Output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" | "in" | "source" => Ok(Direction::Input),
            "output" | "out" | "sink" => Ok(Direction::Output),
            other => Err(format!("unknown direction '{other}' (expected input or output)")),
        }
    }
}

/// A persisted audio device record
///
/// `name` is the join key across mixer sessions; `id` is whatever handle the
/// mixer reported most recently and may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Mixer handle from the latest registration
    pub id: u32,
    /// Display name (description plus origin suffix)
    pub name: String,
    /// Input or output
    #[serde(rename = "type")]
    pub direction: Direction,
    /// User opted this device into the rotation
    #[serde(default)]
    pub cycled: bool,
    /// Device is present in the live hardware set
    #[serde(default)]
    pub active: bool,
}

impl Device {
    /// New record as created on first sight: active, not cycled
    pub fn new(id: u32, name: impl Into<String>, direction: Direction) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            cycled: false,
            active: true,
        }
    }

    /// Whether this record is the `(name, direction)` pair
    pub fn is(&self, name: &str, direction: Direction) -> bool {
        self.direction == direction && self.name == name
    }
}

/// How a switch (or the first press of a burst) is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackMode {
    /// No visible feedback; every press switches
    Silent,
    /// Transient desktop notification
    #[default]
    Notification,
    /// On-screen-display style popup that replaces the previous one
    Osd,
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Known devices of both directions, in user-chosen order
    #[serde(rename = "audio-devices", default)]
    pub audio_devices: Vec<Device>,
    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// User preferences and settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Feedback shown on switch
    pub feedback: FeedbackMode,
    /// Presses further apart than this only reveal the current device (ms)
    pub repeat_interval_ms: u64,
    /// Interval between mixer readiness polls at startup (ms)
    pub mixer_poll_interval_ms: u64,
    /// Readiness polls before giving up
    pub mixer_ready_attempts: u32,
    /// Extra delay after the mixer reports ready, before enumerating (ms)
    pub mixer_settle_ms: u64,
}

impl UserPreferences {
    /// Repeat interval as a `Duration`
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }

    /// Readiness poll interval as a `Duration`
    pub fn mixer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.mixer_poll_interval_ms)
    }

    /// Settle delay as a `Duration`
    pub fn mixer_settle(&self) -> Duration {
        Duration::from_millis(self.mixer_settle_ms)
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            feedback: FeedbackMode::default(),
            // Matches the GNOME Shell OSD hide timeout
            repeat_interval_ms: 1500,
            mixer_poll_interval_ms: 200,
            mixer_ready_attempts: 50,
            mixer_settle_ms: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.audio_devices.is_empty());
        assert_eq!(config.preferences.repeat_interval_ms, 1500);
        assert_eq!(config.preferences.feedback, FeedbackMode::Notification);
    }

    #[test]
    fn test_device_wire_format() {
        let device = Device::new(42, "Speakers - Built-in Audio", Direction::Output);
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 42,
                "name": "Speakers - Built-in Audio",
                "type": "OUTPUT",
                "cycled": false,
                "active": true
            })
        );
    }

    #[test]
    fn test_config_uses_audio_devices_key() {
        let json = r#"{"audio-devices":[{"id":1,"name":"Mic","type":"INPUT","cycled":true,"active":false}]}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.audio_devices.len(), 1);
        assert_eq!(config.audio_devices[0].direction, Direction::Input);
        assert!(config.audio_devices[0].cycled);
        assert_eq!(config.preferences, UserPreferences::default());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"audio-devices":[],"preferences":{"feedback":"osd","future":1},"extra":true}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.preferences.feedback, FeedbackMode::Osd);
        assert_eq!(config.preferences.mixer_poll_interval_ms, 200);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("OUTPUT".parse::<Direction>(), Ok(Direction::Output));
        assert_eq!("in".parse::<Direction>(), Ok(Direction::Input));
        assert!("both".parse::<Direction>().is_err());
    }
}
