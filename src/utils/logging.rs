//! Logging system initialization
//!
//! The daemon logs to `audioswitch/audioswitch.log` under the user's state
//! directory and archives the previous sessions' logs on every startup. Client
//! commands log to stderr.

use crate::config::manager::APP_DIR_NAME;
use crate::error::{AudioSwitchError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Previous sessions kept next to the live log
const ARCHIVED_SESSIONS: u8 = 9;

const LOG_PREFIX: &str = "audioswitch";
const LOG_SUFFIX: &str = "log";

/// Directory holding the daemon log
///
/// Returns: `audioswitch` under `$XDG_STATE_HOME` (or the platform's local data
/// directory where there is no state directory), else the working directory.
pub fn log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Initialize file logging for the daemon
///
/// Log level defaults to INFO but can be configured via `RUST_LOG` environment variable.
pub fn init_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join(format!("{LOG_PREFIX}.{LOG_SUFFIX}"));
    archive_log(&log_path, ARCHIVED_SESSIONS)?;

    // Rotation is done by hand at startup
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .build(&log_dir)
        .map_err(|e| AudioSwitchError::ConfigError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AudioSwitchError::ConfigError(Box::new(e)))?;

    tracing::info!("audioswitch v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Initialize terse stderr logging for one-shot client commands
///
/// Defaults to WARN so command output stays clean.
pub fn init_cli_logging() -> Result<()> {
    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AudioSwitchError::ConfigError(Box::new(e)))
}

/// `path` with `.n` appended, e.g. `audioswitch.log.3`
fn archive_path(path: &Path, n: u8) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Move the log at `path` into its numbered archive, keeping `keep` archives
///
/// `.1` is always the most recent session. Archives shift up by one and
/// whatever would land past `.keep` is deleted. With `keep == 0` the log is
/// simply removed. A missing log leaves the archives untouched.
pub fn archive_log(path: &Path, keep: u8) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if keep == 0 {
        std::fs::remove_file(path)?;
        return Ok(());
    }

    let oldest = archive_path(path, keep);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let from = archive_path(path, n);
        if from.exists() {
            std::fs::rename(&from, archive_path(path, n + 1))?;
        }
    }
    std::fs::rename(path, archive_path(path, 1))?;
    Ok(())
}
