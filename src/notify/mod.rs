//! User-visible feedback for device switches
//!
//! The controllers only ever call [`Notifier::show`] and never wait on or
//! branch on its outcome.

pub mod desktop;

pub use desktop::DesktopNotifier;

use crate::config::{Device, FeedbackMode};
use std::sync::Arc;
use tracing::info;

/// Shows a device to the user
pub trait Notifier: Send + Sync {
    /// Present `device` (just switched to, or revealed as current). Fire-and-forget.
    fn show(&self, device: &Device);
}

/// Notifier that only writes a log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, device: &Device) {
        info!("{}: {}", device.direction.title(), device.name);
    }
}

/// Notifier matching the configured feedback mode
pub fn notifier_for(mode: FeedbackMode) -> Arc<dyn Notifier> {
    match mode {
        FeedbackMode::Silent => Arc::new(LogNotifier),
        FeedbackMode::Notification | FeedbackMode::Osd => Arc::new(DesktopNotifier::new(mode)),
    }
}
