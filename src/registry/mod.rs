//! Device registry module
//!
//! The registry owns the durable list of known audio devices and keeps it
//! consistent with the live device set reported by the mixer.
//!
//! # Overview
//!
//! - **Startup reconciliation**: `startup_reset` → `register_or_activate` for
//!   each live device → `startup_finalize`
//! - **Live updates**: `register_or_activate` / `deactivate` / `rename` on
//!   mixer events
//! - **User actions**: `set_cycled` and `reorder`, or a [`PreferenceChange`]
//!   through `apply_change`
//! - **Queries**: `get_active` and `get_cycled_active` (the rotation)
//!
//! # Ordering
//!
//! Stored array order is the cycling order. New devices are appended at the
//! end; a device that disappears keeps its slot, so reconnecting it restores
//! its place in the rotation.
//!
//! # Persistence
//!
//! All operations go through [`DeviceStore`], which reads and writes the whole
//! list at once. A storage failure propagates to the caller.

pub mod device_registry;
pub mod store;

pub use device_registry::{DeviceRegistry, PreferenceChange};
pub use store::{ConfigStore, DeviceStore, MemoryStore};
