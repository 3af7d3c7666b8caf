//! Cancellation fabric for one session's in-flight turn (spec §4.7).
//!
//! Each turn gets a fresh `CancelToken`. The Barge-in Controller cancels the
//! token belonging to the currently active epoch; the LLM call, TTS stream,
//! and stroke emission loop each observe it at their next suspension point
//! and abort. This mirrors the source's single `_interrupted` boolean, but
//! makes cancellation observable per-epoch instead of globally.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cheaply-cloned cancellation flag for one turn.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks which epoch is currently producing output and holds its cancel
/// token, so a barge-in can reach the turn in flight without the turn
/// having to register itself anywhere else.
pub struct BargeController {
    active: Mutex<Option<(u64, CancelToken)>>,
    active_epoch: AtomicU64,
}

impl BargeController {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            active_epoch: AtomicU64::new(0),
        }
    }

    /// Called by the Turn Orchestrator at the start of a turn (step 1):
    /// register the epoch and hand back its cancel token.
    pub fn begin_turn(&self, epoch: u64) -> CancelToken {
        let token = CancelToken::new();
        *self.active.lock() = Some((epoch, token.clone()));
        self.active_epoch.store(epoch, Ordering::Release);
        token
    }

    /// Called when a turn completes or is superseded: clear the active
    /// marker if it still refers to this epoch.
    pub fn end_turn(&self, epoch: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|(e, _)| *e == epoch) {
            *active = None;
        }
    }

    /// Cancel whatever turn is currently active. Returns the epoch that was
    /// cancelled, if any. Idempotent: a second call with nothing active is
    /// a no-op, satisfying "two barge-ins in quick succession = one".
    pub fn barge_in(&self) -> Option<u64> {
        let active = self.active.lock();
        if let Some((epoch, token)) = active.as_ref() {
            token.cancel();
            Some(*epoch)
        } else {
            None
        }
    }

    /// The epoch most recently started, used by the gateway send step to
    /// drop output tagged with an older, superseded epoch.
    pub fn active_epoch(&self) -> u64 {
        self.active_epoch.load(Ordering::Acquire)
    }
}

impl Default for BargeController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        t.cancel();
        assert!(t.is_cancelled());
    }

    #[test]
    fn barge_in_cancels_active_turn() {
        let ctl = BargeController::new();
        let token = ctl.begin_turn(1);
        assert!(!token.is_cancelled());
        let cancelled_epoch = ctl.barge_in();
        assert_eq!(cancelled_epoch, Some(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn double_barge_in_is_idempotent() {
        let ctl = BargeController::new();
        let token = ctl.begin_turn(1);
        ctl.barge_in();
        let second = ctl.barge_in();
        // still reports the same (already-cancelled) epoch, no panic/new state
        assert_eq!(second, Some(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn barge_in_with_nothing_active_is_noop() {
        let ctl = BargeController::new();
        assert_eq!(ctl.barge_in(), None);
    }

    #[test]
    fn end_turn_clears_only_matching_epoch() {
        let ctl = BargeController::new();
        ctl.begin_turn(1);
        ctl.end_turn(2); // stale, should not clear epoch 1
        assert!(ctl.barge_in().is_some());
    }
}
