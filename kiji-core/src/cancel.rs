//! Cooperative cancellation for long-running pipeline stages.
//!
//! Components never block on the token; they poll it at their yield points
//! (batch boundaries, phase boundaries, BFS layer expansions) and unwind
//! without leaving half-written state behind.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::{CoreError, Result, Stage};

/// Shared flag polled by pipeline components at their yield points.
///
/// Cloning the token shares the underlying flag.
///
/// # Examples
/// ```
/// use kiji_core::CancelToken;
///
/// let token = CancelToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observers see the flag at their next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fails with [`CoreError::Cancelled`] when cancellation was requested.
    ///
    /// # Errors
    /// Returns [`CoreError::Cancelled`] carrying `stage` when the flag is set.
    pub fn checkpoint(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            return Err(CoreError::Cancelled { stage });
        }
        Ok(())
    }
}
