//! Storage boundary for the device list
//!
//! The device list is one value: every read returns the whole ordered list and
//! every write replaces it. There is no per-record addressing below this trait.

use crate::config::{ConfigManager, Device};
use crate::error::Result;
use parking_lot::Mutex;

/// Whole-list storage for device records
pub trait DeviceStore: Send + Sync {
    /// Read the full list in stored order
    fn load(&self) -> Result<Vec<Device>>;

    /// Replace the full list
    fn store(&self, devices: &[Device]) -> Result<()>;
}

/// Device list stored under the `audio-devices` key of `config.json`
///
/// Other configuration (preferences) is read back and preserved on each write.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    manager: ConfigManager,
}

impl ConfigStore {
    /// Store backed by the given config file
    pub fn new(manager: ConfigManager) -> Self {
        Self { manager }
    }
}

impl DeviceStore for ConfigStore {
    fn load(&self) -> Result<Vec<Device>> {
        Ok(self.manager.load()?.audio_devices)
    }

    fn store(&self, devices: &[Device]) -> Result<()> {
        let mut config = self.manager.load()?;
        config.audio_devices = devices.to_vec();
        self.manager.save(&config)
    }
}

/// In-memory store, used when no persistence is wanted
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: Mutex<Vec<Device>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    /// Store seeded with `devices`
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
            writes: Mutex::new(0),
        }
    }

    /// Number of `store` calls so far
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl DeviceStore for MemoryStore {
    fn load(&self) -> Result<Vec<Device>> {
        Ok(self.devices.lock().clone())
    }

    fn store(&self, devices: &[Device]) -> Result<()> {
        *self.devices.lock() = devices.to_vec();
        *self.writes.lock() += 1;
        Ok(())
    }
}
