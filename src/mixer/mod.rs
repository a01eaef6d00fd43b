//! Audio mixer module
//!
//! This module defines the narrow interface the rest of the crate uses to talk
//! to the sound server, plus a concrete backend driving `pactl`.
//!
//! # Overview
//!
//! The mixer layer provides:
//! - **Device enumeration** per direction
//! - **Default device query and switch**, with name fallback for stale ids
//! - **Change notification** for devices being added, removed or renamed
//! - **Readiness state** so startup can wait for the sound server
//!
//! # Architecture
//!
//! - [`Mixer`]: trait implemented by backends and by test fakes
//! - [`PactlMixer`]: PulseAudio / PipeWire-pulse backend using the `pactl` CLI
//! - [`wait_for_ready`]: bounded, cancellable readiness poll used at startup

pub mod pactl;
pub mod readiness;

pub use pactl::PactlMixer;
pub use readiness::wait_for_ready;

use crate::config::Direction;
use crate::error::Result;

/// Connection state of the sound server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    /// Still connecting; poll again later
    Connecting,
    /// Connected and answering queries
    Ready,
    /// Connection failed permanently
    Failed,
    /// Connection was closed
    Closed,
}

/// A live device as the mixer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerDevice {
    /// Mixer handle, valid for this session only
    pub id: u32,
    /// Display name, see [`device_display_name`]
    pub name: String,
}

/// What happened to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Device appeared
    Added,
    /// Device disappeared
    Removed,
    /// Device is still present but reports a new display name, e.g. after
    /// its active port changed
    Renamed,
}

/// Device change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerEvent {
    /// Direction of the affected device
    pub direction: Direction,
    /// What happened
    pub action: Action,
    /// Mixer handle of the affected device
    pub device_id: u32,
}

/// Handle returned by [`Mixer::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked for every device change, on a backend thread
pub type EventCallback = Box<dyn Fn(MixerEvent) + Send + Sync>;

/// Sound server operations used by the controllers
pub trait Mixer: Send + Sync {
    /// Current connection state
    fn state(&self) -> MixerState;

    /// Devices currently present for `direction`
    fn list_devices(&self, direction: Direction) -> Result<Vec<MixerDevice>>;

    /// Resolve an event's device id, including devices that were just removed
    ///
    /// For [`Action::Renamed`] this returns the new name.
    fn lookup_device(&self, direction: Direction, id: u32) -> Option<MixerDevice>;

    /// Display name of the current default device, if any
    fn current_default(&self, direction: Direction) -> Result<Option<String>>;

    /// Make a device the default. Falls back to `name` when `id` is stale.
    ///
    /// Returns `false` when the device could not be found or switched.
    fn set_default(&self, id: u32, name: &str, direction: Direction) -> bool;

    /// Start delivering device change events to `callback`
    fn subscribe(&self, callback: EventCallback) -> Result<SubscriptionId>;

    /// Stop delivering events for `subscription`. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Build the display name for a device
///
/// `"<description> - <origin>"` when an origin is known, otherwise just the
/// description, matching how desktop sound menus label devices.
pub fn device_display_name(description: &str, origin: Option<&str>) -> String {
    match origin.map(str::trim).filter(|o| !o.is_empty()) {
        Some(origin) => format!("{description} - {origin}"),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_with_origin() {
        assert_eq!(
            device_display_name("Headphones", Some("Built-in Audio")),
            "Headphones - Built-in Audio"
        );
    }

    #[test]
    fn test_display_name_without_origin() {
        assert_eq!(device_display_name("HDMI", None), "HDMI");
        assert_eq!(device_display_name("HDMI", Some("  ")), "HDMI");
    }
}
