//! Startup readiness wait for the mixer

use crate::error::{AudioSwitchError, Result};
use crate::mixer::{Mixer, MixerState};
use crate::utils::CancellationToken;
use std::time::Duration;
use tracing::{debug, info};

/// Poll `mixer` until it is ready
///
/// Sleeps `interval` between polls, at most `max_attempts` times. A `Failed`
/// or `Closed` state aborts immediately, as does cancelling `cancel`.
pub fn wait_for_ready(
    mixer: &dyn Mixer,
    interval: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut attempts = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(AudioSwitchError::Cancelled);
        }

        match mixer.state() {
            MixerState::Ready => {
                info!("Mixer ready after {attempts} poll(s)");
                return Ok(());
            }
            MixerState::Failed => {
                return Err(AudioSwitchError::MixerUnavailable(
                    "mixer is in a failed state".to_string(),
                ));
            }
            MixerState::Closed => {
                return Err(AudioSwitchError::MixerUnavailable(
                    "mixer is in a closed state".to_string(),
                ));
            }
            MixerState::Connecting => {
                if attempts >= max_attempts {
                    return Err(AudioSwitchError::MixerUnavailable(format!(
                        "still connecting after {attempts} attempts"
                    )));
                }
                attempts += 1;
                debug!("Mixer still connecting (attempt {attempts}/{max_attempts})");
                if !cancel.sleep(interval) {
                    return Err(AudioSwitchError::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeMixer;

    #[test]
    fn test_ready_immediately() {
        let mixer = FakeMixer::new();
        let result = wait_for_ready(&mixer, Duration::from_millis(1), 3, &CancellationToken::new());
        assert!(result.is_ok());
    }

    #[test]
    fn test_becomes_ready_after_polls() {
        let mixer = FakeMixer::new();
        mixer.set_states(&[MixerState::Connecting, MixerState::Connecting, MixerState::Ready]);
        let result = wait_for_ready(&mixer, Duration::from_millis(1), 5, &CancellationToken::new());
        assert!(result.is_ok());
    }

    #[test]
    fn test_failed_state_is_fatal() {
        let mixer = FakeMixer::new();
        mixer.set_states(&[MixerState::Connecting, MixerState::Failed]);
        let err = wait_for_ready(&mixer, Duration::from_millis(1), 5, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, AudioSwitchError::MixerUnavailable(_)));
    }

    #[test]
    fn test_closed_state_is_fatal() {
        let mixer = FakeMixer::new();
        mixer.set_states(&[MixerState::Closed]);
        let err = wait_for_ready(&mixer, Duration::from_millis(1), 5, &CancellationToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mixer = FakeMixer::new();
        mixer.set_states(&[MixerState::Connecting; 10]);
        let err = wait_for_ready(&mixer, Duration::from_millis(1), 3, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, AudioSwitchError::MixerUnavailable(_)));
    }

    #[test]
    fn test_cancelled_wait_is_abandoned() {
        let mixer = FakeMixer::new();
        mixer.set_states(&[MixerState::Connecting; 10]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait_for_ready(&mixer, Duration::from_secs(60), 100, &cancel).unwrap_err();
        assert!(matches!(err, AudioSwitchError::Cancelled));
    }
}
