#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `audioswitch` unit tests.
//!
//! This module provides in-memory fakes for the mixer and notifier so the
//! registry and controllers can be exercised without a sound server.
//! It is only compiled during testing (`#[cfg(test)]`).

use crate::config::{Device, Direction};
use crate::error::{AudioSwitchError, Result, StringError};
use crate::mixer::{EventCallback, Mixer, MixerDevice, MixerEvent, MixerState, SubscriptionId};
use crate::notify::Notifier;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use tempfile::TempDir;

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Scriptable in-memory mixer
#[derive(Default)]
pub struct FakeMixer {
    states: Mutex<VecDeque<MixerState>>,
    devices: Mutex<HashMap<Direction, Vec<MixerDevice>>>,
    /// Devices that were listed at some point, for resolving removals
    known: Mutex<HashMap<(Direction, u32), MixerDevice>>,
    defaults: Mutex<HashMap<Direction, String>>,
    rejected: Mutex<HashSet<String>>,
    fail_default_queries: Mutex<bool>,
    attempts: Mutex<Vec<String>>,
    calls: Mutex<usize>,
    subscribers: Mutex<HashMap<u64, EventCallback>>,
    next_subscription: Mutex<u64>,
    unsubscribe_calls: Mutex<usize>,
}

impl FakeMixer {
    /// Ready mixer with no devices
    pub fn new() -> Self {
        Self::default()
    }

    /// States returned by successive `state()` calls; `Ready` once exhausted
    pub fn set_states(&self, states: &[MixerState]) {
        *self.states.lock() = states.iter().copied().collect();
    }

    /// Replace the live device set for `direction`
    pub fn set_devices(&self, direction: Direction, devices: &[(u32, &str)]) {
        let devices: Vec<MixerDevice> = devices
            .iter()
            .map(|(id, name)| MixerDevice {
                id: *id,
                name: (*name).to_string(),
            })
            .collect();
        let mut known = self.known.lock();
        for device in &devices {
            known.insert((direction, device.id), device.clone());
        }
        self.devices.lock().insert(direction, devices);
    }

    /// Set the current default device name
    pub fn set_default_name(&self, direction: Direction, name: &str) {
        self.defaults.lock().insert(direction, name.to_string());
    }

    /// Make `set_default` fail for `name`
    pub fn reject(&self, name: &str) {
        self.rejected.lock().insert(name.to_string());
    }

    /// Make `current_default` return an error
    pub fn fail_default_queries(&self) {
        *self.fail_default_queries.lock() = true;
    }

    /// Names passed to `set_default`, in call order
    pub fn switch_attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    /// Number of hardware calls other than `state`
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Number of `unsubscribe` calls, including repeated ones
    pub fn unsubscribe_calls(&self) -> usize {
        *self.unsubscribe_calls.lock()
    }

    /// Deliver `event` to every subscriber
    pub fn emit(&self, event: MixerEvent) {
        for callback in self.subscribers.lock().values() {
            callback(event);
        }
    }

    fn count_call(&self) {
        *self.calls.lock() += 1;
    }
}

impl Mixer for FakeMixer {
    fn state(&self) -> MixerState {
        self.states.lock().pop_front().unwrap_or(MixerState::Ready)
    }

    fn list_devices(&self, direction: Direction) -> Result<Vec<MixerDevice>> {
        self.count_call();
        Ok(self
            .devices
            .lock()
            .get(&direction)
            .cloned()
            .unwrap_or_default())
    }

    fn lookup_device(&self, direction: Direction, id: u32) -> Option<MixerDevice> {
        self.count_call();
        self.known.lock().get(&(direction, id)).cloned()
    }

    fn current_default(&self, direction: Direction) -> Result<Option<String>> {
        self.count_call();
        if *self.fail_default_queries.lock() {
            return Err(AudioSwitchError::MixerError(StringError::new(
                "default query failed",
            )));
        }
        Ok(self.defaults.lock().get(&direction).cloned())
    }

    fn set_default(&self, _id: u32, name: &str, direction: Direction) -> bool {
        self.count_call();
        self.attempts.lock().push(name.to_string());
        if self.rejected.lock().contains(name) {
            return false;
        }
        self.defaults.lock().insert(direction, name.to_string());
        true
    }

    fn subscribe(&self, callback: EventCallback) -> Result<SubscriptionId> {
        let mut next = self.next_subscription.lock();
        *next += 1;
        self.subscribers.lock().insert(*next, callback);
        Ok(SubscriptionId(*next))
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        *self.unsubscribe_calls.lock() += 1;
        self.subscribers.lock().remove(&subscription.0);
    }
}

/// Notifier that records every device it was asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Device>>,
}

impl RecordingNotifier {
    /// Names of shown devices, in order
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().iter().map(|d| d.name.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, device: &Device) {
        self.shown.lock().push(device.clone());
    }
}

#[test]
fn fake_mixer_resolves_removed_devices() {
    let mixer = FakeMixer::new();
    mixer.set_devices(Direction::Output, &[(4, "HDMI")]);
    mixer.set_devices(Direction::Output, &[]);
    assert_eq!(
        mixer.lookup_device(Direction::Output, 4).unwrap().name,
        "HDMI"
    );
}
