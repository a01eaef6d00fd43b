//! Application controller implementation
//!
//! This module implements the daemon lifecycle: startup reconciliation,
//! subscription to mixer events, the single event loop, and teardown.
//!
//! The loop is the only writer of the device list while the daemon runs.
//! Control socket commands, preference edits included, are turned into
//! [`AppEvent`]s by [`AppController::command_handler`].

use crate::config::{Direction, UserPreferences};
use crate::controller::cycle::{CycleController, ShortcutOutcome};
use crate::error::{AudioSwitchError, Result};
use crate::mixer::{Action, Mixer, MixerEvent, SubscriptionId, wait_for_ready};
use crate::notify::Notifier;
use crate::registry::{DeviceRegistry, PreferenceChange};
use crate::utils::{CancellationToken, ControlCommand};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long a control client waits for the loop to apply a preference edit
///
/// Kept below the client's socket timeout so the reply still gets through.
const PREFERENCE_REPLY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Work item for the event loop
#[derive(Debug)]
pub enum AppEvent {
    /// Device added, removed or renamed
    Mixer(MixerEvent),
    /// Cycle shortcut pressed
    Shortcut(Direction),
    /// User edit of the device list; the outcome goes back on the sender
    Preference(PreferenceChange, mpsc::Sender<Result<()>>),
    /// Leave the event loop
    Shutdown,
}

/// Daemon lifecycle controller
pub struct AppController {
    registry: DeviceRegistry,
    mixer: Arc<dyn Mixer>,
    cycle: CycleController,
    preferences: UserPreferences,
    event_sender: mpsc::Sender<AppEvent>,
    /// Taken when the event loop starts
    event_receiver: Option<mpsc::Receiver<AppEvent>>,
    subscription: Option<SubscriptionId>,
    /// Cleared on teardown; callbacks and the loop check it before acting
    enabled: Arc<AtomicBool>,
    startup_cancel: CancellationToken,
}

impl AppController {
    /// Create a controller; nothing touches the mixer until [`enable`](Self::enable)
    pub fn new(
        registry: DeviceRegistry,
        mixer: Arc<dyn Mixer>,
        notifier: Arc<dyn Notifier>,
        preferences: UserPreferences,
    ) -> Self {
        let (event_sender, event_receiver) = mpsc::channel();
        let cycle = CycleController::new(registry.clone(), mixer.clone(), notifier, &preferences);
        Self {
            registry,
            mixer,
            cycle,
            preferences,
            event_sender,
            event_receiver: Some(event_receiver),
            subscription: None,
            enabled: Arc::new(AtomicBool::new(false)),
            startup_cancel: CancellationToken::new(),
        }
    }

    /// Sender for feeding events (shortcuts, shutdown) into the loop
    pub fn event_sender(&self) -> mpsc::Sender<AppEvent> {
        self.event_sender.clone()
    }

    /// Token that abandons the startup wait when cancelled
    pub fn startup_cancel_token(&self) -> CancellationToken {
        self.startup_cancel.clone()
    }

    /// Whether `enable` completed and `disable` has not run yet
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Handler for [`ControlSocket::serve`](crate::utils::ControlSocket::serve)
    /// that feeds commands into this controller's loop
    ///
    /// `stop` also cancels the startup wait. Preference edits block until the
    /// loop has applied them so the client sees the outcome; before `enable`
    /// completes they are refused.
    pub fn command_handler(
        &self,
    ) -> impl FnMut(ControlCommand) -> Result<ControlFlow<()>> + Send + use<> {
        let sender = self.event_sender.clone();
        let enabled = Arc::clone(&self.enabled);
        let startup_cancel = self.startup_cancel.clone();

        move |command| {
            let send = |event| sender.send(event).map_err(|_| loop_gone());
            match command {
                ControlCommand::Cycle(direction) => send(AppEvent::Shortcut(direction))?,
                ControlCommand::Stop => {
                    startup_cancel.cancel();
                    send(AppEvent::Shutdown)?;
                    return Ok(ControlFlow::Break(()));
                }
                ControlCommand::Change(change) => {
                    if !enabled.load(Ordering::SeqCst) {
                        return Err(AudioSwitchError::Rejected(
                            "daemon is not ready yet, try again shortly".to_string(),
                        ));
                    }
                    let (reply, outcome) = mpsc::channel();
                    send(AppEvent::Preference(change, reply))?;
                    outcome
                        .recv_timeout(PREFERENCE_REPLY_TIMEOUT)
                        .map_err(|e| match e {
                            mpsc::RecvTimeoutError::Timeout => AudioSwitchError::Rejected(
                                "daemon is busy, the change was not confirmed".to_string(),
                            ),
                            mpsc::RecvTimeoutError::Disconnected => loop_gone(),
                        })??;
                }
            }
            Ok(ControlFlow::Continue(()))
        }
    }

    /// Wait for the mixer, reconcile the stored list and subscribe to changes
    pub fn enable(&mut self) -> Result<()> {
        info!("Waiting for mixer");
        wait_for_ready(
            self.mixer.as_ref(),
            self.preferences.mixer_poll_interval(),
            self.preferences.mixer_ready_attempts,
            &self.startup_cancel,
        )?;
        if !self.startup_cancel.sleep(self.preferences.mixer_settle()) {
            return Err(AudioSwitchError::Cancelled);
        }

        self.reconcile()?;

        self.enabled.store(true, Ordering::SeqCst);
        let sender = self.event_sender.clone();
        let enabled = Arc::clone(&self.enabled);
        let subscription = self.mixer.subscribe(Box::new(move |event| {
            if enabled.load(Ordering::SeqCst) {
                // Receiver gone means the loop already exited
                let _ = sender.send(AppEvent::Mixer(event));
            }
        }));
        match subscription {
            Ok(id) => self.subscription = Some(id),
            Err(e) => {
                self.enabled.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        info!("audioswitch enabled");
        Ok(())
    }

    /// Startup reconciliation of the stored list against the live device set
    ///
    /// Every live device is re-registered before stale records are pruned.
    pub fn reconcile(&self) -> Result<()> {
        let mut live = Vec::new();
        for direction in Direction::ALL {
            live.push((direction, self.mixer.list_devices(direction)?));
        }

        self.registry.startup_reset()?;
        for (direction, devices) in &live {
            for device in devices {
                self.registry
                    .register_or_activate(&device.name, device.id, *direction)?;
            }
        }
        self.registry.startup_finalize()?;

        info!(
            "Reconciled {} output and {} input device(s)",
            live[0].1.len(),
            live[1].1.len()
        );
        Ok(())
    }

    /// Process one event
    ///
    /// Events arriving after teardown are discarded.
    pub fn handle_event(&mut self, event: AppEvent) -> Result<ControlFlow<()>> {
        if matches!(event, AppEvent::Shutdown) {
            return Ok(ControlFlow::Break(()));
        }
        if !self.is_enabled() {
            debug!("Discarding {event:?}: controller disabled");
            return Ok(ControlFlow::Continue(()));
        }

        match event {
            AppEvent::Mixer(mixer_event) => self.handle_mixer_event(mixer_event)?,
            AppEvent::Shortcut(direction) => match self.cycle.on_shortcut(direction)? {
                ShortcutOutcome::Switched(device) => {
                    debug!("Shortcut switched {direction} to '{}'", device.name);
                }
                ShortcutOutcome::Revealed(device) => {
                    debug!("Shortcut revealed {direction} device '{}'", device.name);
                }
                ShortcutOutcome::Unchanged => debug!("Shortcut left {direction} unchanged"),
            },
            AppEvent::Preference(change, reply) => {
                let outcome = self.registry.apply_change(&change);
                if let Err(e) = &outcome {
                    warn!("Preference change {change:?} refused: {e}");
                }
                // Client may have timed out already
                let _ = reply.send(outcome);
            }
            AppEvent::Shutdown => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    fn handle_mixer_event(&self, event: MixerEvent) -> Result<()> {
        let Some(device) = self.mixer.lookup_device(event.direction, event.device_id) else {
            debug!(
                "Ignoring {:?} for unknown {} device id {}",
                event.action, event.direction, event.device_id
            );
            return Ok(());
        };

        match event.action {
            Action::Added => {
                self.registry
                    .register_or_activate(&device.name, device.id, event.direction)
            }
            Action::Removed => self.registry.deactivate(&device.name, event.direction),
            Action::Renamed => self.registry.rename(&device.name, device.id, event.direction),
        }
    }

    /// Run the event loop until `Shutdown` or a registry failure
    ///
    /// Tears down on exit, success or failure.
    pub fn run(&mut self) -> Result<()> {
        let Some(receiver) = self.event_receiver.take() else {
            warn!("Event loop already running; run() call ignored");
            return Ok(());
        };

        info!("Entering main event loop");
        let result = loop {
            let Ok(event) = receiver.recv() else {
                warn!("Event channel disconnected. Exiting event loop.");
                break Ok(());
            };
            match self.handle_event(event) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break Ok(()),
                Err(e) => {
                    error!("Event loop aborted: {e}");
                    break Err(e);
                }
            }
        };

        self.disable();
        info!("Main event loop exited");
        result
    }

    /// Unsubscribe and cancel pending waits; persisted state is left alone
    ///
    /// Safe to call any number of times.
    pub fn disable(&mut self) {
        let was_enabled = self.enabled.swap(false, Ordering::SeqCst);
        self.startup_cancel.cancel();
        if let Some(subscription) = self.subscription.take() {
            self.mixer.unsubscribe(subscription);
        }
        if was_enabled {
            info!("audioswitch disabled");
        }
    }
}

fn loop_gone() -> AudioSwitchError {
    AudioSwitchError::Rejected("daemon is shutting down".to_string())
}

impl Drop for AppController {
    fn drop(&mut self) {
        self.disable();
    }
}
