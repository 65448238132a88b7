//! Cancellation coordination.
//!
//! A [`CancelSignal`] is shared between a caller and its in-flight requests.
//! Once cancelled, pending network attempts and backoff sleeps are abandoned
//! and the request resolves to [`crate::FetcherError::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared handle to a cancellation signal.
pub type SharedCancel = Arc<CancelSignal>;

/// One-shot cancellation flag with async notification.
#[derive(Debug, Default)]
pub struct CancelSignal {
    is_cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    /// Create a new signal.
    pub fn new() -> Self {
        Self {
            is_cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared signal wrapped in [`Arc`].
    pub fn shared() -> SharedCancel {
        Arc::new(Self::new())
    }

    /// Request cancellation. Wakes all waiters exactly once.
    pub fn cancel(&self) {
        if !self.is_cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested. Returns immediately if already set.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel() is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
