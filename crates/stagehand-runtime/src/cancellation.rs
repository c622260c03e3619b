#![forbid(unsafe_code)]

//! Cooperative cancellation for timer and tween chains.
//!
//! A [`CancellationSource`] hands out [`CancellationToken`]s. Work scheduled
//! with a token is skipped once the source is cancelled, so tearing down a
//! multi-step sequence is one call instead of tracking every pending handle.
//!
//! The scene runs on one thread, so the shared flag is an `Rc<Cell<bool>>`.
//!
//! # Invariants
//!
//! 1. Cancellation is sticky: a cancelled source never becomes live again.
//!    Start a fresh source for the next run.
//! 2. Dropping the source does not cancel its tokens.

use std::cell::Cell;
use std::rc::Rc;

/// Observes whether its source has been cancelled.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    /// A token whose source is already gone; it is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// The control side that triggers cancellation.
#[derive(Debug, Default)]
pub struct CancellationSource {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token observing this source.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Rc::clone(&self.cancelled),
        }
    }

    /// Signal every token derived from this source.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
