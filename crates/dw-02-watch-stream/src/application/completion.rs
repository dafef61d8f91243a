//! Single-resolution completion signals.
//!
//! Transports report open, close and failure through independent callbacks.
//! A [`Completion`] is shared by all of them and resolves exactly once; the
//! first caller wins and later resolutions are ignored.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Write side of a one-shot signal that any clone may resolve.
pub struct Completion<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Completion<T> {
    /// Create a completion and the receiver that awaits it.
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Resolve with `value`. Returns `false` if already resolved.
    pub fn resolve(&self, value: T) -> bool {
        match self.sender.lock().take() {
            // A dropped receiver still counts as resolved.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    /// Whether a value was already delivered.
    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }
}
