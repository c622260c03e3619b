#![forbid(unsafe_code)]

//! Delayed work on a virtual clock.
//!
//! [`TimerQueue`] is the `setTimeout` of the scene: items become due after a
//! delay measured on a clock that only moves when [`TimerQueue::advance`] is
//! called. [`StepSequence`] is an ordered list of `{delay, action}` steps
//! for scripted beats that run one after another.
//!
//! # Invariants
//!
//! 1. An item scheduled with delay `d` at clock `t` is returned by the first
//!    `advance` that moves the clock to `t + d` or later.
//! 2. Items due on the same `advance` come out ordered by due time, then by
//!    scheduling order.
//! 3. Cancelled items (by id, by token or by `cancel_all`) are never
//!    returned.
//! 4. A step sequence carries leftover time from one step into the next, so
//!    its total duration does not drift with the frame step.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::time::Duration;

use ahash::AHashSet;
use tracing::trace;

use crate::cancellation::CancellationToken;

// ---------------------------------------------------------------------------
// TimerQueue
// ---------------------------------------------------------------------------

/// Identifies a scheduled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Entry<T> {
    id: TimerId,
    due: Duration,
    item: T,
    token: Option<CancellationToken>,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (due, id); ids grow in scheduling order.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Priority queue of delayed items.
pub struct TimerQueue<T> {
    now: Duration,
    heap: BinaryHeap<Entry<T>>,
    cancelled: AHashSet<TimerId>,
    next_id: u64,
}

impl<T> fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now)
            .field("pending", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            heap: BinaryHeap::new(),
            cancelled: AHashSet::new(),
            next_id: 1,
        }
    }

    /// Current clock reading.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `item` to become due after `delay`.
    pub fn schedule(&mut self, delay: Duration, item: T) -> TimerId {
        self.push(delay, item, None)
    }

    /// Schedule `item`, dropping it silently if `token` is cancelled first.
    pub fn schedule_with_token(
        &mut self,
        delay: Duration,
        item: T,
        token: CancellationToken,
    ) -> TimerId {
        self.push(delay, item, Some(token))
    }

    fn push(&mut self, delay: Duration, item: T, token: Option<CancellationToken>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay);
        trace!(
            target: "stagehand.timers",
            id = id.0,
            due_ms = due.as_millis() as u64,
            "timer scheduled"
        );
        self.heap.push(Entry {
            id,
            due,
            item,
            token,
        });
        id
    }

    /// Cancel a pending item. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let pending = self
            .heap
            .iter()
            .any(|e| e.id == id && !self.cancelled.contains(&id));
        if pending {
            self.cancelled.insert(id);
        }
        pending
    }

    /// Drop every pending item. Returns how many were live.
    pub fn cancel_all(&mut self) -> usize {
        let live = self.len();
        self.heap.clear();
        self.cancelled.clear();
        live
    }

    /// Pending items that have not been cancelled by id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.id))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clock reading at which the next item becomes due.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.id))
            .map(|e| e.due)
            .min()
    }

    /// Move the clock forward and return the items that became due.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|e| e.due <= self.now) {
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            if entry.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                trace!(target: "stagehand.timers", id = entry.id.0, "timer skipped, token cancelled");
                continue;
            }
            due.push(entry.item);
        }
        due
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// StepSequence
// ---------------------------------------------------------------------------

/// One scripted beat: wait `delay`, then fire `action`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<A> {
    pub delay: Duration,
    pub action: A,
}

/// An ordered list of delayed steps, run one after another.
#[derive(Debug, Clone)]
pub struct StepSequence<A> {
    steps: VecDeque<Step<A>>,
    waited: Duration,
}

impl<A> StepSequence<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            waited: Duration::ZERO,
        }
    }

    /// Append a step (builder pattern).
    #[must_use]
    pub fn then(mut self, delay: Duration, action: A) -> Self {
        self.steps.push_back(Step { delay, action });
        self
    }

    /// Advance by `dt`, returning the actions whose delay has elapsed.
    pub fn advance(&mut self, dt: Duration) -> Vec<A> {
        if self.steps.is_empty() {
            return Vec::new();
        }
        self.waited = self.waited.saturating_add(dt);
        let mut fired = Vec::new();
        while let Some(step) = self.steps.front() {
            if self.waited < step.delay {
                break;
            }
            self.waited -= step.delay;
            if let Some(step) = self.steps.pop_front() {
                fired.push(step.action);
            }
        }
        if self.steps.is_empty() {
            self.waited = Duration::ZERO;
        }
        fired
    }

    /// Drop the remaining steps. Returns how many were pending.
    pub fn cancel(&mut self) -> usize {
        let n = self.steps.len();
        self.steps.clear();
        self.waited = Duration::ZERO;
        n
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time left until the whole sequence has fired.
    #[must_use]
    pub fn time_left(&self) -> Duration {
        self.steps
            .iter()
            .map(|s| s.delay)
            .sum::<Duration>()
            .saturating_sub(self.waited)
    }
}

impl<A> Default for StepSequence<A> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
