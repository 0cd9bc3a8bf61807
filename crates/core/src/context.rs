//! Deadline and cancellation propagation.
//!
//! Store queries and cache streams are blocking calls with no implicit
//! timeout. Callers that need bounded latency create a [`Context`] with a
//! deadline (or cancel one explicitly) and pass it down; every I/O layer
//! checks it before and during iteration and aborts with
//! [`Error::Cancelled`]/[`Error::DeadlineExceeded`].
//!
//! A `Context` is cheap to clone (an `Arc` around a flag and an optional
//! deadline) and safe to share across fan-out threads.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation scope for blocking store/cache operations.
#[derive(Debug, Clone)]
pub struct Context {
    state: Arc<State>,
}

#[derive(Debug)]
struct State {
    deadline: Option<Instant>,
    cancelled: AtomicBool,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Context {
            state: Arc::new(State {
                deadline: None,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// A context that expires at the given instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Context {
            state: Arc::new(State {
                deadline: Some(deadline),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// A context that expires after the given duration.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Cancel this context. All clones observe the cancellation.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// Whether the context has been cancelled (explicitly or by deadline).
    pub fn is_cancelled(&self) -> bool {
        if self.state.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.state.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    /// Return an error if the context is cancelled or expired.
    ///
    /// I/O implementations call this at suspension points; a fan-out that
    /// observes an error here must abandon its remaining sub-operations
    /// rather than return partial results as if complete.
    pub fn check(&self) -> Result<()> {
        if self.state.cancelled.load(Ordering::Acquire) {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.state.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
