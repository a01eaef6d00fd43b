//! Desktop notifications through `notify-send`

use crate::config::{Device, FeedbackMode};
use crate::error::{AudioSwitchError, StringError};
use crate::notify::Notifier;
use std::process::Command;
use tracing::{debug, warn};

const NOTIFY_SEND: &str = "notify-send";
const APP_NAME: &str = "audioswitch";
const ICON: &str = "audio-card-symbolic";

/// How long an OSD-style popup stays up, in milliseconds
const OSD_EXPIRE_MS: u32 = 1500;

/// Freedesktop notification sender
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    mode: FeedbackMode,
}

impl DesktopNotifier {
    /// Notifier for `Notification` or `Osd` style
    pub fn new(mode: FeedbackMode) -> Self {
        Self { mode }
    }

    /// Arguments passed to `notify-send` for `device`
    fn args(&self, device: &Device) -> Vec<String> {
        let mut args = vec![
            format!("--app-name={APP_NAME}"),
            format!("--icon={ICON}"),
            "--hint=int:transient:1".to_string(),
        ];
        if self.mode == FeedbackMode::Osd {
            // Replaces the previous popup instead of stacking
            args.push(format!("--hint=string:x-canonical-private-synchronous:{APP_NAME}"));
            args.push(format!("--expire-time={OSD_EXPIRE_MS}"));
        }
        args.push(device.direction.title().to_string());
        args.push(device.name.clone());
        args
    }
}

impl Notifier for DesktopNotifier {
    fn show(&self, device: &Device) {
        let mut command = Command::new(NOTIFY_SEND);
        command.args(self.args(device));
        debug!("Showing notification for '{}'", device.name);

        // Reap the child off the caller's thread
        std::thread::spawn(move || {
            let error = match command.status() {
                Ok(status) if status.success() => return,
                Ok(status) => AudioSwitchError::NotificationError(StringError::new(format!(
                    "notify-send exited with {status}"
                ))),
                Err(e) => AudioSwitchError::NotificationError(Box::new(e)),
            };
            warn!("{error}");
        });
    }
}
