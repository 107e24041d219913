//! Bounded acknowledgment gates
//!
//! Blocking waits for out-of-band acknowledgments (screen-off ack, keyguard
//! drawn). Every wait has an upper bound; a timeout means "proceed without
//! confirmation".

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of [`OffGate::cancel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No screen-off in flight, nothing to cancel
    NotPending,
    /// Recorded; the off sequence sees it when it starts waiting
    Flagged,
    /// A blocked waiter was woken with the canceled flag
    WokeWaiter,
}

/// Result of a gate wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResult {
    /// Acknowledged
    Proceed,
    /// Canceled while pending
    Canceled,
    /// No acknowledgment within the bound; proceed anyway
    TimedOut,
}

#[derive(Debug, Default)]
struct OffGateState {
    open: bool,
    canceled: bool,
    acked: bool,
    waiting: bool,
}

/// Screen-off window between suspend-begin and the screen-off acknowledgment
#[derive(Debug, Default)]
pub struct OffGate {
    state: Mutex<OffGateState>,
    cv: Condvar,
}

impl OffGate {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the cancellation window
    pub fn open(&self) {
        let mut state = self.state.lock();
        *state = OffGateState {
            open: true,
            ..OffGateState::default()
        };
        debug!("Screen-off window opened");
    }

    /// Whether a screen-off is pending
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Cancel the pending screen-off
    pub fn cancel(&self) -> CancelOutcome {
        let mut state = self.state.lock();
        if !state.open || state.canceled {
            return CancelOutcome::NotPending;
        }
        state.canceled = true;
        if state.waiting {
            self.cv.notify_all();
            info!("Screen-off canceled, waking waiter");
            CancelOutcome::WokeWaiter
        } else {
            info!("Screen-off canceled before wait");
            CancelOutcome::Flagged
        }
    }

    /// Screen-off acknowledgment
    pub fn ack(&self) {
        let mut state = self.state.lock();
        if state.open {
            state.acked = true;
            self.cv.notify_all();
        }
    }

    /// Wait for the acknowledgment or a cancellation, then close the window
    pub fn wait(&self, timeout: Duration) -> GateResult {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.waiting = true;

        let result = loop {
            if state.canceled {
                break GateResult::Canceled;
            }
            if state.acked {
                break GateResult::Proceed;
            }
            if self.cv.wait_until(&mut state, deadline).timed_out() {
                break if state.canceled {
                    GateResult::Canceled
                } else if state.acked {
                    GateResult::Proceed
                } else {
                    GateResult::TimedOut
                };
            }
        };

        *state = OffGateState::default();
        debug!("Screen-off window closed: {:?}", result);
        result
    }
}

#[derive(Debug, Default)]
struct AckState {
    armed: bool,
    signaled: bool,
}

/// One-shot acknowledgment (keyguard drawn before screen on)
#[derive(Debug, Default)]
pub struct AckGate {
    state: Mutex<AckState>,
    cv: Condvar,
}

impl AckGate {
    /// Create a disarmed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect an acknowledgment
    pub fn arm(&self) {
        *self.state.lock() = AckState {
            armed: true,
            signaled: false,
        };
    }

    /// Deliver the acknowledgment
    pub fn signal(&self) {
        let mut state = self.state.lock();
        if state.armed {
            state.signaled = true;
            self.cv.notify_all();
        }
    }

    /// Wait for the acknowledgment, skipped when the gate is not armed
    pub fn wait(&self, timeout: Duration) -> GateResult {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        if !state.armed {
            return GateResult::Proceed;
        }
        while !state.signaled {
            if self.cv.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        let result = if state.signaled {
            GateResult::Proceed
        } else {
            GateResult::TimedOut
        };
        *state = AckState::default();
        result
    }
}
