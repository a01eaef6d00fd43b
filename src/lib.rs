//! `audioswitch` - Cycle audio devices from keyboard shortcuts
//!
//! Keeps a persistent, user-ordered list of every audio input and output
//! device ever seen, tracks which ones are currently present, and on a
//! shortcut press switches the system default to the next device marked for
//! cycling.
//!
//! # Components
//!
//! - [`registry::DeviceRegistry`]: the persisted device list and its queries
//! - [`controller::CycleController`]: shortcut handling and next-device selection
//! - [`controller::AppController`]: startup reconciliation, mixer events, teardown
//! - [`mixer::Mixer`]: sound server abstraction, with a `pactl` backend
//! - [`notify::Notifier`]: user feedback after a switch
//!
//! # Requirements
//!
//! - Linux with PulseAudio or PipeWire (`pipewire-pulse`) and `pactl` on `PATH`
//! - `notify-send` for desktop feedback (optional)

// Module declarations
pub mod config;
pub mod controller;
pub mod error;
pub mod mixer;
pub mod notify;
pub mod registry;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use error::{AudioSwitchError, Result};
