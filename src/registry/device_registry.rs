//! Device registry implementation
//!
//! Every operation loads the full list from the store, transforms it in memory
//! and writes it back. Operations that change nothing skip the write.

use crate::config::{Device, Direction};
use crate::error::{AudioSwitchError, Result};
use crate::registry::store::DeviceStore;
use std::sync::Arc;
use tracing::{debug, info};

/// User edit of the device list, addressed by display name
///
/// Only present devices can be edited, since `list` shows present devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceChange {
    /// Opt a device in or out of the rotation
    SetCycled {
        /// Direction of the device
        direction: Direction,
        /// Display name of the device
        name: String,
        /// New cycled flag
        cycled: bool,
    },
    /// Move a device to a zero-based position among present devices
    Reorder {
        /// Direction of the device
        direction: Direction,
        /// Display name of the device
        name: String,
        /// Target position, zero-based
        position: usize,
    },
}

impl PreferenceChange {
    /// Direction and name of the device being edited
    pub fn target(&self) -> (Direction, &str) {
        match self {
            Self::SetCycled {
                direction, name, ..
            }
            | Self::Reorder {
                direction, name, ..
            } => (*direction, name),
        }
    }
}

/// Mark `name` active under `id`, appending a record if it is new
fn activate(devices: &mut Vec<Device>, name: &str, id: u32, direction: Direction) -> bool {
    if let Some(existing) = devices.iter_mut().find(|d| d.is(name, direction)) {
        if existing.active && existing.id == id {
            return false;
        }
        debug!("Reactivating {direction} device '{name}' (id {id})");
        existing.active = true;
        existing.id = id;
    } else {
        info!("New {direction} device '{name}' (id {id})");
        devices.push(Device::new(id, name, direction));
    }
    true
}

/// Persistent registry of known audio devices
#[derive(Clone)]
pub struct DeviceRegistry {
    store: Arc<dyn DeviceStore>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry").finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    /// Create a registry over the given store
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Apply `f` to the stored list and write it back if `f` reports a change
    fn update(&self, f: impl FnOnce(&mut Vec<Device>) -> bool) -> Result<bool> {
        let mut devices = self.store.load()?;
        let changed = f(&mut devices);
        if changed {
            self.store.store(&devices)?;
        }
        Ok(changed)
    }

    /// Mark every stored record inactive
    ///
    /// Called once before live devices are re-registered, so that anything the
    /// mixer does not confirm afterwards is known to be stale.
    pub fn startup_reset(&self) -> Result<()> {
        self.update(|devices| {
            let mut changed = false;
            for device in devices.iter_mut().filter(|d| d.active) {
                device.active = false;
                changed = true;
            }
            changed
        })?;
        debug!("All stored devices marked inactive");
        Ok(())
    }

    /// Register a device reported by the mixer, or reactivate its record
    ///
    /// Unknown `(name, direction)` pairs are appended at the end. Known ones are
    /// marked active and take the freshly reported `id`.
    pub fn register_or_activate(&self, name: &str, id: u32, direction: Direction) -> Result<()> {
        self.update(|devices| activate(devices, name, id, direction))?;
        Ok(())
    }

    /// A present device now reports `name` under the same mixer `id`
    ///
    /// Active records of the same direction holding `id` under another name
    /// are deactivated, then `name` is registered like a newly plugged device.
    /// Both happen in one write.
    pub fn rename(&self, name: &str, id: u32, direction: Direction) -> Result<()> {
        self.update(|devices| {
            let mut changed = false;
            for old in devices
                .iter_mut()
                .filter(|d| d.direction == direction && d.active && d.id == id && d.name != name)
            {
                info!("{direction} device '{}' is now '{name}'", old.name);
                old.active = false;
                changed = true;
            }
            activate(devices, name, id, direction) || changed
        })?;
        Ok(())
    }

    /// Drop records that are neither present nor opted into cycling
    ///
    /// Must only run after all present devices were re-registered.
    pub fn startup_finalize(&self) -> Result<()> {
        let mut pruned = 0usize;
        self.update(|devices| {
            let before = devices.len();
            devices.retain(|d| d.active || d.cycled);
            pruned = before - devices.len();
            pruned > 0
        })?;
        if pruned > 0 {
            info!("Pruned {pruned} stale device record(s)");
        }
        Ok(())
    }

    /// Mark a device as no longer present; the record is kept
    pub fn deactivate(&self, name: &str, direction: Direction) -> Result<()> {
        let changed = self.update(|devices| {
            match devices.iter_mut().find(|d| d.is(name, direction)) {
                Some(device) if device.active => {
                    device.active = false;
                    true
                }
                _ => false,
            }
        })?;
        if changed {
            debug!("Deactivated {direction} device '{name}'");
        }
        Ok(())
    }

    /// Opt a known device in or out of the rotation
    ///
    /// Unknown devices are ignored; no record is created.
    pub fn set_cycled(&self, name: &str, direction: Direction, cycled: bool) -> Result<()> {
        let changed = self.update(|devices| {
            match devices.iter_mut().find(|d| d.is(name, direction)) {
                Some(device) if device.cycled != cycled => {
                    device.cycled = cycled;
                    true
                }
                _ => false,
            }
        })?;
        if changed {
            info!("{direction} device '{name}' cycled={cycled}");
        }
        Ok(())
    }

    /// Present devices of one direction, in stored order
    pub fn get_active(&self, direction: Direction) -> Result<Vec<Device>> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .filter(|d| d.direction == direction && d.active)
            .collect())
    }

    /// Present, opted-in devices of one direction; the order is the rotation order
    pub fn get_cycled_active(&self, direction: Direction) -> Result<Vec<Device>> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .filter(|d| d.direction == direction && d.active && d.cycled)
            .collect())
    }

    /// Every stored record, both directions, in stored order
    pub fn all(&self) -> Result<Vec<Device>> {
        self.store.load()
    }

    /// Move an active device so it becomes the `new_position`-th active device
    /// of its direction (zero-based)
    ///
    /// Inactive records are not counted but keep their order relative to the
    /// others. Positions past the last active device move it to the end.
    /// Inactive or unknown devices are ignored and storage is not touched.
    pub fn reorder(&self, device: &Device, new_position: usize) -> Result<()> {
        if !device.active {
            debug!("Ignoring reorder of inactive device '{}'", device.name);
            return Ok(());
        }

        let changed = self.update(|devices| {
            let Some(from) = devices
                .iter()
                .position(|d| d.is(&device.name, device.direction) && d.active)
            else {
                return false;
            };

            let record = devices.remove(from);
            let to = devices
                .iter()
                .enumerate()
                .filter(|(_, d)| d.direction == record.direction && d.active)
                .nth(new_position)
                .map_or(devices.len(), |(index, _)| index);
            devices.insert(to, record);
            to != from
        })?;

        if changed {
            info!(
                "Moved {} device '{}' to position {new_position}",
                device.direction, device.name
            );
        }
        Ok(())
    }

    /// Apply a user edit to a present device
    ///
    /// Fails with `DeviceNotFound` when no active record carries the name.
    pub fn apply_change(&self, change: &PreferenceChange) -> Result<()> {
        let (direction, name) = change.target();
        let device = self
            .get_active(direction)?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                AudioSwitchError::DeviceNotFound(format!("{direction} device named '{name}'"))
            })?;

        match change {
            PreferenceChange::SetCycled { cycled, .. } => {
                self.set_cycled(name, direction, *cycled)
            }
            PreferenceChange::Reorder { position, .. } => self.reorder(&device, *position),
        }
    }
}
