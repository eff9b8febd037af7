//! Pre-streaming hold and cancellation for a single transfer.
//!
//! The controller is the only state in this module shared across threads: a
//! single-slot decision protected by a mutex, released through a
//! [`Notify`]. A decision armed before the worker parks is never lost: the
//! waiter checks the slot before suspending and again after every wakeup.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::debug;

/// Outcome of the pre-streaming hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed to streaming.
    Continue,
    /// Abort without touching storage.
    Cancel,
}

/// Controls one transfer's optional suspend-before-streaming checkpoint.
///
/// With the hold disabled (the default), [`await_decision`] returns
/// [`GateDecision::Continue`] immediately and `resume`/`cancel` calls are
/// harmless no-ops that arm the slot for a wait that will never consume it.
///
/// With the hold enabled, the worker parks at [`await_decision`] after the
/// content length has been announced, until [`resume`] or [`cancel`] arms a
/// decision. Precedence is deterministic: `Cancel` always wins. A `cancel()`
/// followed by `resume()` stays cancelled, and a `resume()` followed by
/// `cancel()` becomes cancelled.
///
/// [`await_decision`]: DownloadController::await_decision
/// [`resume`]: DownloadController::resume
/// [`cancel`]: DownloadController::cancel
#[derive(Debug, Default)]
pub struct DownloadController {
    hold: AtomicBool,
    slot: Mutex<Option<GateDecision>>,
    released: Notify,
}

impl DownloadController {
    /// Creates a controller with the hold disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the suspend-before-streaming hold.
    ///
    /// Must be called before the transfer is spawned; flipping it while a
    /// worker is already past the checkpoint has no effect on that worker.
    pub fn set_hold(&self, enabled: bool) {
        self.hold.store(enabled, Ordering::Release);
    }

    /// Returns whether the hold is enabled.
    #[must_use]
    pub fn holds_before_streaming(&self) -> bool {
        self.hold.load(Ordering::Acquire)
    }

    /// Releases a parked worker to continue streaming.
    ///
    /// If no worker is parked yet, the decision is remembered and the
    /// forthcoming wait returns immediately. An armed `Cancel` is never
    /// overwritten. Calling this after the transfer has already proceeded
    /// is a no-op.
    pub fn resume(&self) {
        self.arm(GateDecision::Continue);
    }

    /// Cancels the transfer at the checkpoint.
    ///
    /// Arms a `Cancel` decision unconditionally, then releases a parked
    /// worker (or primes the forthcoming wait). A cancel issued before or
    /// during the wait is never lost. Effective only while the worker has
    /// not yet passed the checkpoint; once streaming has begun the transfer
    /// runs to completion or to a stream error.
    pub fn cancel(&self) {
        self.arm(GateDecision::Cancel);
    }

    fn arm(&self, decision: GateDecision) {
        {
            let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            match (*slot, decision) {
                // Cancel overrides anything; Continue only fills an empty slot.
                (_, GateDecision::Cancel) | (None, GateDecision::Continue) => {
                    *slot = Some(decision);
                }
                (Some(_), GateDecision::Continue) => {}
            }
            debug!(?decision, armed = ?*slot, "gate decision armed");
        }
        self.released.notify_one();
    }

    fn take_decision(&self) -> Option<GateDecision> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    /// Parks the calling worker until a decision is available.
    ///
    /// Returns [`GateDecision::Continue`] immediately when the hold is
    /// disabled. Consuming the decision empties the slot, so a later
    /// `resume`/`cancel` arms a fresh one. Dropping the returned future
    /// (worker abort) leaves the controller consistent.
    pub async fn await_decision(&self) -> GateDecision {
        if !self.holds_before_streaming() {
            return GateDecision::Continue;
        }

        loop {
            // Register interest before checking the slot so a notify between
            // the check and the await is not lost.
            let released = self.released.notified();
            if let Some(decision) = self.take_decision() {
                debug!(?decision, "gate decision taken");
                return decision;
            }
            released.await;
        }
    }
}
