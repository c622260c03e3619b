#![forbid(unsafe_code)]

//! Press-and-hold activation.
//!
//! A [`HoldTimer`] turns a sustained press into progress over a fixed
//! duration and a single terminal [`HoldEvent::Completed`].
//!
//! # State Machine
//!
//! ```text
//! Idle ──press──▶ Holding ──elapsed ≥ duration──▶ Completed (blocked)
//!   ▲                │                                │
//!   └───release──────┘ (emits Reset)                  └──unblock──▶ Idle
//! ```
//!
//! # Invariants
//!
//! 1. Progress is computed from the instants passed in, never from the number
//!    of ticks, so frame rate does not change how long a hold takes.
//! 2. Progress reported during one hold is non-decreasing.
//! 3. Progress events are throttled to at most one per `progress_interval`.
//!    The final 1.0 progress event is never throttled.
//! 4. `Completed` is emitted exactly once per hold and latches `blocked`.
//!    While blocked, presses and releases are ignored and no `Reset` is ever
//!    emitted, until the owner calls [`unblock`](HoldTimer::unblock).
//!
//! # Failure Modes
//!
//! - A release whose timestamp is already past the hold duration completes
//!   the hold instead of resetting it.
//! - Instants earlier than the press saturate to zero elapsed time.

use std::time::Duration;

use tracing::{debug, info};
use web_time::Instant;

use crate::event::{PointerEvent, PointerKind, PointerSource};

/// Timing for a hold interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldConfig {
    /// Press time needed to complete (default: 2.5s).
    pub duration: Duration,
    /// Minimum spacing between progress events (default: 50ms).
    pub progress_interval: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(2500),
            progress_interval: Duration::from_millis(50),
        }
    }
}

/// Where the timer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Holding { started: Instant },
    Completed,
}

/// Output of the timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldEvent {
    /// Throttled progress while held.
    Progress { elapsed: Duration, progress: f64 },
    /// The hold reached its full duration.
    Completed,
    /// The hold was released early; progress is back to zero.
    Reset,
}

/// What ended a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseCause {
    PointerUp,
    PointerLeave,
    PointerCancel,
    /// A touch ended somewhere else on the page.
    GlobalTouchEnd,
}

/// Hold-to-activate timer.
#[derive(Debug, Clone)]
pub struct HoldTimer {
    config: HoldConfig,
    state: HoldState,
    blocked: bool,
    last_emit: Option<Instant>,
    last_progress: f64,
}

impl HoldTimer {
    #[must_use]
    pub fn new(config: HoldConfig) -> Self {
        Self {
            config,
            state: HoldState::Idle,
            blocked: false,
            last_emit: None,
            last_progress: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> HoldState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    #[inline]
    #[must_use]
    pub fn is_holding(&self) -> bool {
        matches!(self.state, HoldState::Holding { .. })
    }

    /// Begin a hold. Returns `false` if blocked or already holding.
    pub fn press(&mut self, now: Instant) -> bool {
        if self.blocked || self.state != HoldState::Idle {
            debug!(target: "stagehand.hold", blocked = self.blocked, "press ignored");
            return false;
        }
        self.state = HoldState::Holding { started: now };
        self.last_emit = None;
        self.last_progress = 0.0;
        debug!(target: "stagehand.hold", "hold started");
        true
    }

    /// Normalized progress at `now`.
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        match self.state {
            HoldState::Idle => 0.0,
            HoldState::Completed => 1.0,
            HoldState::Holding { started } => {
                let elapsed = now.saturating_duration_since(started);
                self.fraction(elapsed).max(self.last_progress)
            }
        }
    }

    fn fraction(&self, elapsed: Duration) -> f64 {
        if self.config.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.config.duration.as_secs_f64()).min(1.0)
    }

    /// Sample the hold at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<HoldEvent> {
        let HoldState::Holding { started } = self.state else {
            return Vec::new();
        };
        let elapsed = now.saturating_duration_since(started);

        if elapsed >= self.config.duration {
            self.state = HoldState::Completed;
            self.blocked = true;
            self.last_progress = 1.0;
            self.last_emit = Some(now);
            info!(target: "stagehand.hold", "hold completed");
            return vec![
                HoldEvent::Progress {
                    elapsed: self.config.duration,
                    progress: 1.0,
                },
                HoldEvent::Completed,
            ];
        }

        let due = self
            .last_emit
            .is_none_or(|at| now.saturating_duration_since(at) >= self.config.progress_interval);
        if !due {
            return Vec::new();
        }
        let progress = self.fraction(elapsed).max(self.last_progress);
        self.last_progress = progress;
        self.last_emit = Some(now);
        vec![HoldEvent::Progress { elapsed, progress }]
    }

    /// End the press. Emits `Reset` unless the timer is blocked or idle.
    pub fn release(&mut self, now: Instant, cause: ReleaseCause) -> Vec<HoldEvent> {
        if self.blocked {
            debug!(target: "stagehand.hold", ?cause, "release ignored while blocked");
            return Vec::new();
        }
        let HoldState::Holding { started } = self.state else {
            return Vec::new();
        };
        if now.saturating_duration_since(started) >= self.config.duration {
            return self.tick(now);
        }
        self.state = HoldState::Idle;
        self.last_emit = None;
        self.last_progress = 0.0;
        debug!(target: "stagehand.hold", ?cause, "hold reset");
        vec![HoldEvent::Reset]
    }

    /// Route a pointer sample to press, tick or release.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<HoldEvent> {
        match event.kind {
            PointerKind::Down if event.over_target => {
                self.press(event.time);
                Vec::new()
            }
            PointerKind::Down => Vec::new(),
            PointerKind::Move => self.tick(event.time),
            PointerKind::Up => {
                let cause = if event.source == PointerSource::Touch && !event.over_target {
                    ReleaseCause::GlobalTouchEnd
                } else {
                    ReleaseCause::PointerUp
                };
                self.release(event.time, cause)
            }
            PointerKind::Leave => self.release(event.time, ReleaseCause::PointerLeave),
            PointerKind::Cancel => self.release(event.time, ReleaseCause::PointerCancel),
        }
    }

    /// Clear the completion latch and return to idle.
    pub fn unblock(&mut self) {
        self.blocked = false;
        self.state = HoldState::Idle;
        self.last_emit = None;
        self.last_progress = 0.0;
    }
}

impl Default for HoldTimer {
    fn default() -> Self {
        Self::new(HoldConfig::default())
    }
}
