//! Error types for `audioswitch`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains so the log shows
//! the full cause of a failed startup or storage operation.

use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `audioswitch`
#[derive(Debug, Error)]
pub enum AudioSwitchError {
    /// Configuration could not be located, read or parsed
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The mixer backend reported an error while querying or switching devices
    #[error("Mixer error: {0}")]
    MixerError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The mixer never became ready, or reached a terminal state
    #[error("Mixer unavailable: {0}")]
    MixerUnavailable(String),

    /// Control socket failure (bind, connect, protocol)
    #[error("Control socket error: {0}")]
    IpcError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Another daemon already owns the control socket
    #[error("Another audioswitch daemon is already running")]
    AlreadyRunning,

    /// Nothing is listening on the control socket
    #[error("No audioswitch daemon listening on {0}")]
    NotRunning(String),

    /// The daemon refused a command and said why
    #[error("Daemon rejected the command: {0}")]
    Rejected(String),

    /// A preference change named a device that is not present
    #[error("No present {0}")]
    DeviceNotFound(String),

    /// Notification could not be delivered
    #[error("Notification error: {0}")]
    NotificationError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A pending wait was abandoned because teardown started
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `audioswitch` operations
pub type Result<T> = std::result::Result<T, AudioSwitchError>;

/// Convert an error to a message suitable for printing on the terminal
///
/// The messages include short troubleshooting hints for the common failures.
pub fn get_user_friendly_error(error: &AudioSwitchError) -> String {
    match error {
        AudioSwitchError::ConfigError(e) => format!(
            "Failed to load or save the device list:\n\n{e}\n\n\
             The stored configuration was left untouched. Fix or remove the file\n\
             to let audioswitch rebuild it."
        ),
        AudioSwitchError::MixerError(e) => format!(
            "The audio server reported an error:\n\n{e}\n\n\
             Check that `pactl` is installed and the sound server is running."
        ),
        AudioSwitchError::MixerUnavailable(reason) => format!(
            "The audio server is not available ({reason}).\n\n\
             Please ensure PulseAudio or PipeWire (with pipewire-pulse) is running."
        ),
        AudioSwitchError::IpcError(e) => format!(
            "Could not reach the audioswitch daemon:\n\n{e}\n\n\
             Start it with `audioswitch daemon`."
        ),
        AudioSwitchError::AlreadyRunning => "Another audioswitch daemon is already running.\n\n\
             Stop it with `audioswitch stop` before starting a new one."
            .to_string(),
        AudioSwitchError::NotRunning(path) => format!(
            "No audioswitch daemon is listening on {path}.\n\n\
             Start it with `audioswitch daemon`."
        ),
        AudioSwitchError::Rejected(reason) => format!("The daemon refused the command: {reason}"),
        AudioSwitchError::DeviceNotFound(what) => format!(
            "No present {what}.\n\n\
             Run `audioswitch list <input|output>` to see the exact device names."
        ),
        AudioSwitchError::NotificationError(e) => format!(
            "Failed to show a notification:\n\n{e}\n\n\
             This does not affect device switching."
        ),
        AudioSwitchError::Cancelled => "The operation was cancelled during shutdown.".to_string(),
        AudioSwitchError::IoError(e) => format!(
            "A file system error occurred:\n\n{e}\n\n\
             Please check file permissions and disk space."
        ),
        AudioSwitchError::JsonError(e) => format!(
            "The configuration file is corrupted:\n\n{e}\n\n\
             audioswitch will not overwrite it until it is repaired."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AudioSwitchError::AlreadyRunning;
        assert_eq!(
            error.to_string(),
            "Another audioswitch daemon is already running"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AudioSwitchError = io_error.into();
        assert!(matches!(error, AudioSwitchError::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err();
        let error: AudioSwitchError = json_error.into();
        assert!(matches!(error, AudioSwitchError::JsonError(_)));
        assert!(get_user_friendly_error(&error).contains("corrupted"));
    }

    #[test]
    fn test_mixer_unavailable_display() {
        let error = AudioSwitchError::MixerUnavailable("mixer is in a failed state".to_string());
        assert_eq!(
            error.to_string(),
            "Mixer unavailable: mixer is in a failed state"
        );
    }

    #[test]
    fn test_mixer_unavailable_user_friendly() {
        let error = AudioSwitchError::MixerUnavailable("closed".to_string());
        let message = get_user_friendly_error(&error);
        assert!(message.contains("closed"));
        assert!(message.contains("PipeWire"));
    }

    #[test]
    fn test_config_error_preserves_source() {
        let error = AudioSwitchError::ConfigError(StringError::new("bad path"));
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("bad path"));
    }

    #[test]
    fn test_device_not_found_points_at_list() {
        let error = AudioSwitchError::DeviceNotFound("output device named 'HDMI'".to_string());
        assert_eq!(error.to_string(), "No present output device named 'HDMI'");
        assert!(get_user_friendly_error(&error).contains("audioswitch list"));
    }

    #[test]
    fn test_ipc_error_user_friendly() {
        let error = AudioSwitchError::IpcError(StringError::new("connection refused"));
        let message = get_user_friendly_error(&error);
        assert!(message.contains("connection refused"));
        assert!(message.contains("audioswitch daemon"));
    }
}
