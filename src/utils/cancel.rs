//! Cancellation token for interruptible waits
//!
//! Owned by whichever routine starts a wait; cloning hands out another handle
//! to the same flag. Cancelling wakes every sleeper immediately.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Shared cancellation flag with an interruptible sleep
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// New, not-yet-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .wake
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return !*cancelled;
            }
        }
        false
    }
}
