//! Configuration manager for loading and saving application configuration
//!
//! The configuration lives in `audioswitch/config.json` under the user's config
//! directory (`$XDG_CONFIG_HOME` on Linux).
//! Writes go through a temporary file in the same directory followed by an
//! atomic rename so a crash never leaves a half-written device list behind.

use crate::config::models::AppConfig;
use crate::error::{AudioSwitchError, Result, StringError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Directory name used under the XDG base directories
pub const APP_DIR_NAME: &str = "audioswitch";

/// Configuration manager bound to one config file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default per-user config file
    pub fn from_default_location() -> Self {
        Self::new(Self::get_config_path())
    }

    /// Manager for an explicit config file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this manager reads and writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the default path to the configuration file
    ///
    /// Returns: `<user config dir>/audioswitch/config.json`, or a path in the
    /// working directory when the platform reports no config directory.
    pub fn get_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("config.json")
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir(&self) -> Result<PathBuf> {
        let config_dir = self.config_dir()?;
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    }

    fn config_dir(&self) -> Result<&Path> {
        self.path
            .parent()
            .ok_or_else(|| AudioSwitchError::ConfigError(StringError::new("Invalid config path")))
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration. A file that exists but
    /// cannot be parsed is an error: the device list is never silently reset.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            debug!("Configuration file {} not found, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        serde_json::from_str(&json).map_err(|e| {
            AudioSwitchError::ConfigError(Box::new(StringError(format!(
                "{} is malformed: {e}",
                self.path.display()
            ))))
        })
    }

    /// Save configuration to disk with atomic write
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let config_dir = self.ensure_config_dir()?;

        let json = serde_json::to_string_pretty(config)?;
        let mut temp = NamedTempFile::new_in(&config_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|e| AudioSwitchError::IoError(e.error))?;

        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    /// Load, log a one-line summary, and return the configuration
    pub fn load_logged(&self) -> Result<AppConfig> {
        let config = self.load()?;
        info!(
            "Configuration loaded from {} ({} known devices)",
            self.path.display(),
            config.audio_devices.len()
        );
        Ok(config)
    }
}
