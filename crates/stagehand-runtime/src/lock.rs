#![forbid(unsafe_code)]

//! Exclusive operation locks.
//!
//! Each logically exclusive operation gets one [`ExclusiveLock`]. Starting
//! the operation is a [`try_acquire`](ExclusiveLock::try_acquire): success
//! means the caller owns the operation until it releases; failure means an
//! instance is already running and the request should be dropped, not
//! queued.

use std::fmt;

/// A try-acquire flag with release semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusiveLock {
    held: bool,
}

impl ExclusiveLock {
    #[must_use]
    pub const fn new() -> Self {
        Self { held: false }
    }

    /// Take the lock. Returns `false` if it is already held.
    #[must_use = "a failed acquire means the operation must not start"]
    pub fn try_acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        true
    }

    /// Release the lock. Returns whether it was held.
    pub fn release(&mut self) -> bool {
        std::mem::replace(&mut self.held, false)
    }

    #[inline]
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }
}

/// Operations that must never overlap with themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BackgroundCascade,
    ResetSequence,
    HoldTimer,
}

impl Operation {
    pub const ALL: [Self; 3] = [Self::BackgroundCascade, Self::ResetSequence, Self::HoldTimer];

    const fn index(self) -> usize {
        match self {
            Self::BackgroundCascade => 0,
            Self::ResetSequence => 1,
            Self::HoldTimer => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BackgroundCascade => "background-cascade",
            Self::ResetSequence => "reset-sequence",
            Self::HoldTimer => "hold-timer",
        })
    }
}

/// One lock per [`Operation`].
#[derive(Debug, Clone, Default)]
pub struct OperationLocks {
    locks: [ExclusiveLock; 3],
}

impl OperationLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "a failed acquire means the operation must not start"]
    pub fn try_acquire(&mut self, op: Operation) -> bool {
        self.locks[op.index()].try_acquire()
    }

    pub fn release(&mut self, op: Operation) -> bool {
        self.locks[op.index()].release()
    }

    #[must_use]
    pub fn is_held(&self, op: Operation) -> bool {
        self.locks[op.index()].is_held()
    }

    /// Release everything, returning how many locks were held.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for lock in &mut self.locks {
            if lock.release() {
                released += 1;
            }
        }
        released
    }

    /// Operations currently running.
    pub fn held(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(|op| self.is_held(*op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let mut lock = ExclusiveLock::new();
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());
        assert!(lock.release());
        assert!(!lock.release());
        assert!(lock.try_acquire());
    }

    #[test]
    fn operations_are_independent() {
        let mut locks = OperationLocks::new();
        assert!(locks.try_acquire(Operation::BackgroundCascade));
        assert!(locks.try_acquire(Operation::ResetSequence));
        assert!(!locks.try_acquire(Operation::BackgroundCascade));
        assert!(!locks.is_held(Operation::HoldTimer));
        assert_eq!(
            locks.held().collect::<Vec<_>>(),
            vec![Operation::BackgroundCascade, Operation::ResetSequence]
        );
    }

    #[test]
    fn release_all_counts_held() {
        let mut locks = OperationLocks::new();
        let _ = locks.try_acquire(Operation::HoldTimer);
        let _ = locks.try_acquire(Operation::ResetSequence);
        assert_eq!(locks.release_all(), 2);
        assert_eq!(locks.held().count(), 0);
    }

    #[test]
    fn repeated_acquire_grants_exactly_once() {
        let mut locks = OperationLocks::new();
        let granted = (0..10)
            .filter(|_| locks.try_acquire(Operation::BackgroundCascade))
            .count();
        assert_eq!(granted, 1);
    }

    #[test]
    fn display_names() {
        assert_eq!(Operation::ResetSequence.to_string(), "reset-sequence");
    }
}
