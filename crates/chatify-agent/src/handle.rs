//! A cloneable handle for poking a session from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the session from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) is_sending: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_sending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the send in flight, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a send is currently running.
    pub fn is_sending(&self) -> bool {
        self.is_sending.load(Ordering::Acquire)
    }

    /// Claim the sending flag. Fails if a send is already running.
    pub(crate) fn try_begin(&self) -> bool {
        self.is_sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Install a fresh cancellation token for a new send and return it.
    pub(crate) fn reset_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    /// Release the sending flag.
    pub(crate) fn finish(&self) {
        self.is_sending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_exclusive() {
        let handle = SessionHandle::new();
        assert!(handle.try_begin());
        assert!(!handle.clone().try_begin());
        assert!(handle.is_sending());
        handle.finish();
        assert!(!handle.is_sending());
        assert!(handle.try_begin());
    }

    #[test]
    fn test_abort_cancels_current_token_only() {
        let handle = SessionHandle::new();
        let first = handle.reset_cancel();
        handle.abort();
        assert!(first.is_cancelled());

        let second = handle.reset_cancel();
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = SessionHandle::new();
        let remote = handle.clone();
        let token = handle.reset_cancel();

        assert!(handle.try_begin());
        assert!(remote.is_sending());
        remote.abort();
        assert!(token.is_cancelled());

        handle.finish();
        assert!(!remote.is_sending());
    }
}
