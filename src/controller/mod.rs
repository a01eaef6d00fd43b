//! Application logic controller module
//!
//! # Overview
//!
//! - `AppController`: daemon lifecycle. Waits for the mixer, reconciles the
//!   stored device list with the live device set, subscribes to device
//!   add/remove/rename events and owns the single event loop.
//! - `CycleController`: turns a shortcut press into at most one switch of the
//!   default device, walking the cycled, active devices in stored order.
//!
//! # Event Flow
//!
//! ```text
//! Mixer callback ─┐
//! Control socket ─┼→ AppEvent → AppController ─→ DeviceRegistry
//!                 │                    └──────→ CycleController → Mixer, Notifier
//! ```
//!
//! All registry writes happen on the event loop thread, preference edits from
//! the CLI included, so read-modify-write cycles never interleave.

pub mod app_controller;
pub mod cycle;

pub use app_controller::{AppController, AppEvent};
pub use cycle::{CycleController, ShortcutOutcome};
