//! Cancellation token for stage jobs
//!
//! Provides the cooperative cancellation flag carried by every stage
//! job. Cancellation is one-directional: once set, the flag is never
//! cleared, and a running job is not interrupted — the completion path
//! checks the flag before committing any result.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative job cancellation
///
/// Workers and completion handlers check `is_cancelled()` to decide
/// whether a job's result should still be committed. Multiple tokens
/// can share the same underlying cancellation state via Arc.
///
/// # Example
///
/// ```
/// use filmstrip_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// // In worker thread:
/// // if worker_token.is_cancelled() {
/// //     return; // Skip the stage function, result is unwanted
/// // }
///
/// // On the coordination thread:
/// token.cancel();
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token
    ///
    /// The token starts in a non-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token
    ///
    /// All clones of this token will also observe the cancellation.
    /// The operation is idempotent and cannot be undone: a cancelled
    /// job's result is discarded even if the stage function finishes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if this token has been cancelled
    ///
    /// Returns `true` if `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
