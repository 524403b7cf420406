//! Single-in-flight call tracking
//!
//! Each adapter owns one [`CallSlot`]. Beginning a call cancels whatever call
//! was outstanding and installs a fresh token; the returned guard clears the
//! slot when the call finishes, however it finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Holder of at most one live cancellation token
#[derive(Debug, Default)]
pub struct CallSlot {
    current: Mutex<Option<ActiveCall>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct ActiveCall {
    id: u64,
    token: CancellationToken,
}

impl CallSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveCall>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel any outstanding call and start tracking a new one
    pub fn begin(&self) -> CallGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self.lock().replace(ActiveCall {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            tracing::debug!(call = previous.id, "cancelling superseded call");
            previous.token.cancel();
        }

        CallGuard { slot: self, id, token }
    }

    /// Cancel the outstanding call, if any
    ///
    /// Idempotent. The slot itself is cleared by the call's guard.
    pub fn cancel(&self) {
        if let Some(active) = self.lock().as_ref() {
            active.token.cancel();
        }
    }

    /// Whether a call currently holds the slot
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }
}

/// Handle for one in-flight call
///
/// Dropping the guard clears the slot unless a newer call has replaced it.
#[derive(Debug)]
pub struct CallGuard<'a> {
    slot: &'a CallSlot,
    id: u64,
    token: CancellationToken,
}

impl CallGuard<'_> {
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.slot.lock();
        if current.as_ref().is_some_and(|active| active.id == self.id) {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_slot_on_drop() {
        let slot = CallSlot::new();
        {
            let _call = slot.begin();
            assert!(slot.is_active());
        }
        assert!(!slot.is_active());
    }

    #[test]
    fn new_call_cancels_previous() {
        let slot = CallSlot::new();
        let first = slot.begin();
        let second = slot.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        // The stale guard must not clear the newer call's token
        drop(first);
        assert!(slot.is_active());
        drop(second);
        assert!(!slot.is_active());
    }

    #[test]
    fn cancel_is_idempotent() {
        let slot = CallSlot::new();
        slot.cancel();

        let call = slot.begin();
        slot.cancel();
        slot.cancel();
        assert!(call.is_cancelled());
    }

    #[test]
    fn cancel_after_completion_does_not_affect_next_call() {
        let slot = CallSlot::new();
        drop(slot.begin());
        slot.cancel();

        let call = slot.begin();
        assert!(!call.is_cancelled());
    }
}
