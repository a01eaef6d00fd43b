//! Cycling controller implementation
//!
//! Turns a shortcut press into at most one default-device switch.

use crate::config::{Device, Direction, FeedbackMode, UserPreferences};
use crate::error::Result;
use crate::mixer::Mixer;
use crate::notify::Notifier;
use crate::registry::DeviceRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of handling one shortcut press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// Default device changed to this one
    Switched(Device),
    /// First press of a burst: the current device was shown, nothing switched
    Revealed(Device),
    /// Nothing to do, or no candidate could be switched to
    Unchanged,
}

/// Rotates the default device through the registry's cycled, active devices
pub struct CycleController {
    registry: DeviceRegistry,
    mixer: Arc<dyn Mixer>,
    notifier: Arc<dyn Notifier>,
    feedback: FeedbackMode,
    repeat_interval: Duration,
    /// Monotonic time of the previous press, either direction
    last_press: Option<Instant>,
}

impl CycleController {
    /// Create a controller using the feedback settings from `preferences`
    pub fn new(
        registry: DeviceRegistry,
        mixer: Arc<dyn Mixer>,
        notifier: Arc<dyn Notifier>,
        preferences: &UserPreferences,
    ) -> Self {
        Self {
            registry,
            mixer,
            notifier,
            feedback: preferences.feedback,
            repeat_interval: preferences.repeat_interval(),
            last_press: None,
        }
    }

    /// Handle a shortcut press now
    pub fn on_shortcut(&mut self, direction: Direction) -> Result<ShortcutOutcome> {
        self.on_shortcut_at(direction, Instant::now())
    }

    /// Handle a shortcut press at `now`
    ///
    /// With visible feedback enabled, a press that comes more than the repeat
    /// interval after the previous one only reveals the current device; presses
    /// inside the interval switch. With silent feedback every press switches.
    /// A press with nothing to rotate through is ignored outright and does not
    /// count towards the repeat interval.
    pub fn on_shortcut_at(&mut self, direction: Direction, now: Instant) -> Result<ShortcutOutcome> {
        if self.registry.get_cycled_active(direction)?.is_empty() {
            debug!("No cycled {direction} devices, ignoring shortcut");
            return Ok(ShortcutOutcome::Unchanged);
        }

        if self.feedback == FeedbackMode::Silent {
            return self.switch_to_next(direction);
        }

        let is_repeat = self
            .last_press
            .is_some_and(|last| now.saturating_duration_since(last) <= self.repeat_interval);
        self.last_press = Some(now);

        if is_repeat {
            self.switch_to_next(direction)
        } else {
            self.reveal_current(direction)
        }
    }

    /// Show the current default device without switching
    fn reveal_current(&self, direction: Direction) -> Result<ShortcutOutcome> {
        let Some(current) = self.current_default(direction) else {
            return Ok(ShortcutOutcome::Unchanged);
        };
        let device = self
            .registry
            .get_active(direction)?
            .into_iter()
            .find(|d| d.name == current);

        match device {
            Some(device) => {
                debug!("Revealing current {direction} device '{}'", device.name);
                self.notifier.show(&device);
                Ok(ShortcutOutcome::Revealed(device))
            }
            None => Ok(ShortcutOutcome::Unchanged),
        }
    }

    /// Switch to the device after the current default in rotation order
    ///
    /// Candidates the mixer rejects are skipped. The search stops after one
    /// full pass, never retrying the current default itself.
    pub fn switch_to_next(&self, direction: Direction) -> Result<ShortcutOutcome> {
        let rotation = self.registry.get_cycled_active(direction)?;
        if rotation.is_empty() {
            debug!("No cycled {direction} devices, nothing to do");
            return Ok(ShortcutOutcome::Unchanged);
        }

        let current = self.current_default(direction);
        let current_index = current
            .as_deref()
            .and_then(|name| rotation.iter().position(|d| d.name == name));

        for candidate in candidate_order(current_index, rotation.len()) {
            let device = &rotation[candidate];
            if self.mixer.set_default(device.id, &device.name, direction) {
                info!("Switched {direction} to '{}'", device.name);
                self.notifier.show(device);
                return Ok(ShortcutOutcome::Switched(device.clone()));
            }
            debug!("Skipping {direction} device '{}': switch rejected", device.name);
        }

        warn!("No {direction} device in the rotation could be switched to");
        Ok(ShortcutOutcome::Unchanged)
    }

    fn current_default(&self, direction: Direction) -> Option<String> {
        match self.mixer.current_default(direction) {
            Ok(current) => current,
            Err(e) => {
                warn!("Could not query default {direction} device: {e}");
                None
            }
        }
    }
}

/// Indices to try, starting after `current` and wrapping around
///
/// Stops before returning to `current`. With no current index every slot is
/// tried once, starting at 0.
fn candidate_order(current: Option<usize>, len: usize) -> impl Iterator<Item = usize> {
    let (start, count) = match current {
        Some(index) => (index + 1, len.saturating_sub(1)),
        None => (0, len),
    };
    (0..count).map(move |step| (start + step) % len)
}
