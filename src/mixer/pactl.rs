//! `pactl` mixer backend
//!
//! Drives PulseAudio, or PipeWire through `pipewire-pulse`, by running the
//! `pactl` command-line client. Device listings use `pactl --format=json`;
//! change notifications come from a long-running `pactl subscribe` child.
//!
//! The backend keeps every device it has ever listed in a cache keyed by
//! `(direction, index)`. Removal events arrive after the device is gone, so
//! the cache is the only way to resolve their names.
//!
//! Display names include the active port, so plugging headphones into a jack
//! renames the sink without removing it. `pactl` reports that as a `change`
//! event, which also fires for every volume tweak; the subscriber re-lists
//! the device and only reports [`Action::Renamed`] when its name moved.

use crate::config::Direction;
use crate::error::{AudioSwitchError, Result, StringError};
use crate::mixer::{
    Action, EventCallback, Mixer, MixerDevice, MixerEvent, MixerState, SubscriptionId,
    device_display_name,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

const PACTL: &str = "pactl";

#[derive(Debug, Clone, Deserialize)]
struct PactlPort {
    name: String,
    #[serde(default)]
    description: String,
}

/// One element of `pactl --format=json list sinks|sources`
#[derive(Debug, Clone, Deserialize)]
struct PactlNode {
    index: u32,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ports: Vec<PactlPort>,
    #[serde(default)]
    active_port: Option<String>,
    #[serde(default)]
    monitor_of_sink: Option<String>,
}

impl PactlNode {
    fn is_monitor(&self) -> bool {
        self.name.ends_with(".monitor")
            || self
                .monitor_of_sink
                .as_deref()
                .is_some_and(|sink| !sink.is_empty() && sink != "n/a")
    }

    /// Port description plus device description, like desktop sound menus
    fn display_name(&self) -> String {
        let port = self
            .active_port
            .as_deref()
            .and_then(|active| self.ports.iter().find(|p| p.name == active))
            .filter(|p| !p.description.is_empty());
        match port {
            Some(port) => device_display_name(&port.description, Some(&self.description)),
            None => device_display_name(&self.description, None),
        }
    }
}

/// Cached view of a device: server-side name plus display name
#[derive(Debug, Clone)]
struct CachedDevice {
    server_name: String,
    display_name: String,
}

type DeviceCache = HashMap<(Direction, u32), CachedDevice>;

/// Display names already passed on to the subscriber, per device
#[derive(Debug, Default)]
struct AnnouncedNames(HashMap<(Direction, u32), String>);

impl AnnouncedNames {
    fn from_cache(cache: &DeviceCache) -> Self {
        Self(
            cache
                .iter()
                .map(|(key, device)| (*key, device.display_name.clone()))
                .collect(),
        )
    }

    /// Track `event` against a fresh listing of its direction
    ///
    /// Returns whether the event should reach the subscriber: always for
    /// additions and removals, and for renames only when the display name
    /// differs from the one last seen for that id.
    fn observe(&mut self, event: &MixerEvent, listing: &[(u32, CachedDevice)]) -> bool {
        let key = (event.direction, event.device_id);
        if event.action == Action::Removed {
            self.0.remove(&key);
            return true;
        }

        let Some((_, device)) = listing.iter().find(|(index, _)| *index == event.device_id)
        else {
            return event.action == Action::Added;
        };
        let previous = self.0.insert(key, device.display_name.clone());
        let renamed = previous.is_some_and(|previous| previous != device.display_name);
        event.action == Action::Added || renamed
    }
}

/// Mixer backend built on the `pactl` command-line client
pub struct PactlMixer {
    cache: Arc<Mutex<DeviceCache>>,
    subscriptions: Mutex<HashMap<u64, Child>>,
    next_subscription: AtomicU64,
}

impl Default for PactlMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl PactlMixer {
    /// Create a backend; no process is started until a method is called
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            subscriptions: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new(PACTL)
            .args(args)
            .output()
            .map_err(|e| AudioSwitchError::MixerError(Box::new(e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioSwitchError::MixerError(Box::new(StringError(format!(
                "pactl {} failed: {}",
                args.join(" "),
                stderr.trim()
            )))));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn kind(direction: Direction) -> &'static str {
        match direction {
            Direction::Output => "sinks",
            Direction::Input => "sources",
        }
    }

    /// List devices and merge them into the cache
    fn refresh(&self, direction: Direction) -> Result<Vec<(u32, CachedDevice)>> {
        refresh_cache(&self.cache, direction)
    }

    fn switch(direction: Direction, server_name: &str) -> Result<()> {
        let command = match direction {
            Direction::Output => "set-default-sink",
            Direction::Input => "set-default-source",
        };
        Self::run(&[command, server_name]).map(|_| ())
    }
}

impl Mixer for PactlMixer {
    fn state(&self) -> MixerState {
        match Command::new(PACTL).arg("info").output() {
            Ok(output) if output.status.success() => MixerState::Ready,
            Ok(output) => {
                debug!(
                    "pactl info not ready: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                MixerState::Connecting
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("pactl not found in PATH");
                MixerState::Failed
            }
            Err(e) => {
                warn!("Failed to run pactl: {e}");
                MixerState::Connecting
            }
        }
    }

    fn list_devices(&self, direction: Direction) -> Result<Vec<MixerDevice>> {
        Ok(self
            .refresh(direction)?
            .into_iter()
            .map(|(id, device)| MixerDevice {
                id,
                name: device.display_name,
            })
            .collect())
    }

    fn lookup_device(&self, direction: Direction, id: u32) -> Option<MixerDevice> {
        let cached = self.cache.lock().get(&(direction, id)).cloned();
        let cached = match cached {
            Some(device) => Some(device),
            None => {
                if let Err(e) = self.refresh(direction) {
                    warn!("Failed to refresh {direction} devices: {e}");
                }
                self.cache.lock().get(&(direction, id)).cloned()
            }
        };
        cached.map(|device| MixerDevice {
            id,
            name: device.display_name,
        })
    }

    fn current_default(&self, direction: Direction) -> Result<Option<String>> {
        let command = match direction {
            Direction::Output => "get-default-sink",
            Direction::Input => "get-default-source",
        };
        let server_name = Self::run(&[command])?.trim().to_string();
        if server_name.is_empty() {
            return Ok(None);
        }
        Ok(self
            .refresh(direction)?
            .into_iter()
            .find(|(_, device)| device.server_name == server_name)
            .map(|(_, device)| device.display_name))
    }

    fn set_default(&self, id: u32, name: &str, direction: Direction) -> bool {
        let devices = match self.refresh(direction) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Cannot list {direction} devices: {e}");
                return false;
            }
        };

        let Some(target) = resolve_target(&devices, id, name) else {
            debug!("{direction} device '{name}' (id {id}) not found");
            return false;
        };

        match Self::switch(direction, &target.server_name) {
            Ok(()) => {
                info!("Default {direction} set to '{name}'");
                true
            }
            Err(e) => {
                warn!("Failed to set default {direction} to '{name}': {e}");
                false
            }
        }
    }

    fn subscribe(&self, callback: EventCallback) -> Result<SubscriptionId> {
        let mut child = Command::new(PACTL)
            .arg("subscribe")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AudioSwitchError::MixerError(Box::new(e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AudioSwitchError::MixerError(StringError::new("pactl subscribe has no stdout"))
        })?;

        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        let cache = Arc::clone(&self.cache);
        let mut announced = AnnouncedNames::from_cache(&cache.lock());
        let reader = std::thread::Builder::new()
            .name(format!("pactl-subscribe-{id}"))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    let Some(event) = parse_event_line(&line) else {
                        continue;
                    };
                    let listing = match event.action {
                        Action::Removed => Vec::new(),
                        Action::Added | Action::Renamed => {
                            refresh_cache(&cache, event.direction).unwrap_or_else(|e| {
                                warn!("Failed to refresh {} devices: {e}", event.direction);
                                Vec::new()
                            })
                        }
                    };
                    if announced.observe(&event, &listing) {
                        debug!("Mixer event: {event:?}");
                        callback(event);
                    }
                }
                debug!("pactl subscribe reader {id} exited");
            });
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        self.subscriptions.lock().insert(id, child);
        info!("Subscribed to device changes (subscription {id})");
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let Some(mut child) = self.subscriptions.lock().remove(&subscription.0) else {
            return;
        };
        if let Err(e) = child.kill() {
            debug!("pactl subscribe already exited: {e}");
        }
        let _ = child.wait();
        info!("Unsubscribed from device changes (subscription {})", subscription.0);
    }
}

impl Drop for PactlMixer {
    fn drop(&mut self) {
        for (_, mut child) in self.subscriptions.lock().drain() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn parse_nodes(json: &str) -> Result<Vec<PactlNode>> {
    serde_json::from_str(json).map_err(|e| AudioSwitchError::MixerError(Box::new(e)))
}

/// Devices worth offering to the user, monitors excluded
fn to_listing(nodes: &[PactlNode]) -> Vec<(u32, CachedDevice)> {
    nodes
        .iter()
        .filter(|node| !node.is_monitor())
        .map(|node| {
            (
                node.index,
                CachedDevice {
                    server_name: node.name.clone(),
                    display_name: node.display_name(),
                },
            )
        })
        .collect()
}

/// List `direction` and merge the result into `cache`
fn refresh_cache(
    cache: &Mutex<DeviceCache>,
    direction: Direction,
) -> Result<Vec<(u32, CachedDevice)>> {
    let json = PactlMixer::run(&["--format=json", "list", PactlMixer::kind(direction)])?;
    let devices = to_listing(&parse_nodes(&json)?);

    let mut cache = cache.lock();
    for (index, device) in &devices {
        cache.insert((direction, *index), device.clone());
    }
    Ok(devices)
}

/// Pick the device to switch to: by id if it still carries the same name,
/// otherwise by name
fn resolve_target<'a>(
    devices: &'a [(u32, CachedDevice)],
    id: u32,
    name: &str,
) -> Option<&'a CachedDevice> {
    devices
        .iter()
        .find(|(index, device)| *index == id && device.display_name == name)
        .or_else(|| devices.iter().find(|(_, device)| device.display_name == name))
        .map(|(_, device)| device)
}

/// Parse one line of `pactl subscribe` output
///
/// Only sink/source events are of interest, e.g. `Event 'new' on sink #57`.
/// A `change` maps to [`Action::Renamed`]; whether the name really changed is
/// decided later against a fresh listing.
fn parse_event_line(line: &str) -> Option<MixerEvent> {
    let rest = line.trim().strip_prefix("Event '")?;
    let (kind, rest) = rest.split_once("' on ")?;
    let (facility, id) = rest.split_once(" #")?;

    let action = match kind {
        "new" => Action::Added,
        "remove" => Action::Removed,
        "change" => Action::Renamed,
        _ => return None,
    };
    let direction = match facility {
        "sink" => Direction::Output,
        "source" => Direction::Input,
        _ => return None,
    };

    Some(MixerEvent {
        direction,
        action,
        device_id: id.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINKS: &str = r#"[
        {
            "index": 57,
            "name": "alsa_output.pci-0000_00_1f.3.analog-stereo",
            "description": "Built-in Audio Analog Stereo",
            "ports": [
                {"name": "analog-output-speaker", "description": "Speakers"},
                {"name": "analog-output-headphones", "description": "Headphones"}
            ],
            "active_port": "analog-output-headphones"
        },
        {
            "index": 61,
            "name": "bluez_output.AA_BB.1",
            "description": "WH-1000XM4",
            "ports": [],
            "active_port": null
        }
    ]"#;

    const SOURCES: &str = r#"[
        {"index": 58, "name": "alsa_output.pci.analog-stereo.monitor",
         "description": "Monitor of Built-in Audio", "monitor_of_sink": "alsa_output.pci.analog-stereo"},
        {"index": 59, "name": "alsa_input.pci.analog-stereo",
         "description": "Built-in Audio Analog Stereo", "monitor_of_sink": "n/a",
         "ports": [{"name": "analog-input-mic", "description": "Microphone"}],
         "active_port": "analog-input-mic"}
    ]"#;

    #[test]
    fn test_display_names_use_active_port() {
        let nodes = parse_nodes(SINKS).unwrap();
        assert_eq!(nodes[0].display_name(), "Headphones - Built-in Audio Analog Stereo");
        assert_eq!(nodes[1].display_name(), "WH-1000XM4");
    }

    #[test]
    fn test_monitor_sources_are_detected() {
        let nodes = parse_nodes(SOURCES).unwrap();
        assert!(nodes[0].is_monitor());
        assert!(!nodes[1].is_monitor());
        assert_eq!(nodes[1].display_name(), "Microphone - Built-in Audio Analog Stereo");
    }

    #[test]
    fn test_malformed_listing_is_error() {
        assert!(parse_nodes("not json").is_err());
    }

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(
            parse_event_line("Event 'new' on sink #57"),
            Some(MixerEvent {
                direction: Direction::Output,
                action: Action::Added,
                device_id: 57
            })
        );
        assert_eq!(
            parse_event_line("Event 'remove' on source #12\n"),
            Some(MixerEvent {
                direction: Direction::Input,
                action: Action::Removed,
                device_id: 12
            })
        );
        assert_eq!(
            parse_event_line("Event 'change' on sink #57"),
            Some(MixerEvent {
                direction: Direction::Output,
                action: Action::Renamed,
                device_id: 57
            })
        );
        assert_eq!(parse_event_line("Event 'change' on server #-1"), None);
        assert_eq!(parse_event_line("Event 'new' on client #3"), None);
        assert_eq!(parse_event_line("garbage"), None);
    }

    fn built_in_sink(active_port: &str) -> Vec<(u32, CachedDevice)> {
        let json = format!(
            r#"[{{"index": 57, "name": "alsa_output.pci-0000_00_1f.3.analog-stereo",
                 "description": "Built-in Audio",
                 "ports": [{{"name": "spk", "description": "Speakers"}},
                           {{"name": "hp", "description": "Headphones"}}],
                 "active_port": "{active_port}"}}]"#
        );
        to_listing(&parse_nodes(&json).unwrap())
    }

    fn sink_event(action: Action) -> MixerEvent {
        MixerEvent {
            direction: Direction::Output,
            action,
            device_id: 57,
        }
    }

    #[test]
    fn test_port_switch_changes_display_name() {
        assert_eq!(built_in_sink("spk")[0].1.display_name, "Speakers - Built-in Audio");
        assert_eq!(built_in_sink("hp")[0].1.display_name, "Headphones - Built-in Audio");
    }

    #[test]
    fn test_change_event_forwarded_only_on_rename() {
        let mut cache = DeviceCache::new();
        for (index, device) in built_in_sink("spk") {
            cache.insert((Direction::Output, index), device);
        }
        let mut announced = AnnouncedNames::from_cache(&cache);
        let change = sink_event(Action::Renamed);

        // Volume change: same name, swallowed
        assert!(!announced.observe(&change, &built_in_sink("spk")));
        // Headphones plugged in
        assert!(announced.observe(&change, &built_in_sink("hp")));
        assert!(!announced.observe(&change, &built_in_sink("hp")));
        // And back out
        assert!(announced.observe(&change, &built_in_sink("spk")));
    }

    #[test]
    fn test_added_and_removed_always_forwarded() {
        let mut announced = AnnouncedNames::default();

        assert!(announced.observe(&sink_event(Action::Added), &built_in_sink("spk")));
        assert!(announced.observe(&sink_event(Action::Removed), &[]));
        // Forgotten on removal: a change for an unseen id is not a rename
        assert!(!announced.observe(&sink_event(Action::Renamed), &built_in_sink("hp")));
        assert!(announced.observe(&sink_event(Action::Renamed), &built_in_sink("spk")));
    }

    fn cached(server: &str, display: &str) -> CachedDevice {
        CachedDevice {
            server_name: server.to_string(),
            display_name: display.to_string(),
        }
    }

    #[test]
    fn test_resolve_target_prefers_matching_id() {
        let devices = vec![(1, cached("a", "Speakers")), (2, cached("b", "HDMI"))];
        assert_eq!(
            resolve_target(&devices, 2, "HDMI").map(|d| d.server_name.as_str()),
            Some("b")
        );
    }

    #[test]
    fn test_resolve_target_falls_back_to_name() {
        let devices = vec![(5, cached("a", "Speakers")), (9, cached("b", "HDMI"))];
        // Stale id 1 no longer exists; name still resolves
        assert_eq!(
            resolve_target(&devices, 1, "HDMI").map(|d| d.server_name.as_str()),
            Some("b")
        );
        // Id reused by a different device: name wins
        assert_eq!(
            resolve_target(&devices, 5, "HDMI").map(|d| d.server_name.as_str()),
            Some("b")
        );
        assert!(resolve_target(&devices, 5, "USB").is_none());
    }
}
