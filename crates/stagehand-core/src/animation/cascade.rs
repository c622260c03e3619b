#![forbid(unsafe_code)]

//! Staggered per-layer ramps on one shared clock.
//!
//! A [`StaggerCascade`] drives [`LAYERS`] independent progress values. Layer
//! `i` starts `i × per_layer_delay` after the cascade and ramps linearly to
//! 1.0 over `ramp`:
//!
//! ```text
//! local(i) = clamp((elapsed − i·delay) / ramp, 0, 1)
//! ```
//!
//! A reverse cascade reports `1 − local(i)` computed from its own clock,
//! which starts at zero. It is not the forward cascade played backwards:
//! the first layer to start leaving the end state is still layer 0.
//!
//! # Invariants
//!
//! 1. Every layer value stays in `[0, 1]` and is monotone in elapsed time
//!    (non-decreasing forward, non-increasing reverse).
//! 2. Forward and reverse values for the same elapsed time sum to 1.
//! 3. [`is_complete`](Animation::is_complete) flips at the nominal `total`;
//!    [`is_settled`](StaggerCascade::is_settled) flips once the last layer
//!    has finished its ramp. With the default timing these are 5000ms and
//!    7000ms.
//!
//! # Failure Modes
//!
//! - Zero ramp: each layer jumps from 0 to 1 when its delay elapses.

use std::time::Duration;

use super::Animation;

/// Number of background layers a cascade drives.
pub const LAYERS: usize = 5;

/// Stagger timing shared by forward and reverse cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeTiming {
    /// Delay between successive layer starts (default: 1000ms).
    pub per_layer_delay: Duration,
    /// Time each layer takes to go from 0 to 1 (default: 3000ms).
    pub ramp: Duration,
    /// Nominal cascade length used to signal completion (default: 5000ms).
    pub total: Duration,
}

impl Default for CascadeTiming {
    fn default() -> Self {
        Self {
            per_layer_delay: Duration::from_millis(1000),
            ramp: Duration::from_millis(3000),
            total: Duration::from_millis(5000),
        }
    }
}

impl CascadeTiming {
    /// Forward progress of layer `index` after `elapsed`.
    #[must_use]
    pub fn layer_progress(&self, index: usize, elapsed: Duration) -> f64 {
        let start = self.per_layer_delay.as_secs_f64() * index as f64;
        let local = elapsed.as_secs_f64() - start;
        if self.ramp.is_zero() {
            return if local >= 0.0 { 1.0 } else { 0.0 };
        }
        (local / self.ramp.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Time at which the last of `layers` layers reaches the end of its ramp.
    #[must_use]
    pub fn settle_time(&self, layers: usize) -> Duration {
        let last = u32::try_from(layers.saturating_sub(1)).unwrap_or(u32::MAX);
        self.per_layer_delay
            .saturating_mul(last)
            .saturating_add(self.ramp)
    }
}

/// Which way the layer values move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeDirection {
    /// 0 → 1.
    Forward,
    /// 1 → 0, as `1 − local`.
    Reverse,
}

/// A running cascade over [`LAYERS`] layers.
#[derive(Debug, Clone)]
pub struct StaggerCascade {
    timing: CascadeTiming,
    direction: CascadeDirection,
    elapsed: Duration,
}

impl StaggerCascade {
    #[must_use]
    pub fn new(timing: CascadeTiming, direction: CascadeDirection) -> Self {
        Self {
            timing,
            direction,
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn forward(timing: CascadeTiming) -> Self {
        Self::new(timing, CascadeDirection::Forward)
    }

    #[must_use]
    pub fn reverse(timing: CascadeTiming) -> Self {
        Self::new(timing, CascadeDirection::Reverse)
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> CascadeDirection {
        self.direction
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    #[must_use]
    pub fn timing(&self) -> &CascadeTiming {
        &self.timing
    }

    /// Value of one layer, already inverted for reverse cascades.
    #[must_use]
    pub fn layer_value(&self, index: usize) -> f64 {
        let local = self.timing.layer_progress(index, self.elapsed);
        match self.direction {
            CascadeDirection::Forward => local,
            CascadeDirection::Reverse => 1.0 - local,
        }
    }

    /// All layer values, layer 0 first.
    #[must_use]
    pub fn layer_values(&self) -> [f64; LAYERS] {
        std::array::from_fn(|i| self.layer_value(i))
    }

    /// Whether every layer has finished its ramp.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.elapsed >= self.timing.settle_time(LAYERS)
    }
}

impl Animation for StaggerCascade {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.timing.total
    }

    /// Nominal progress `elapsed / total`.
    fn value(&self) -> f64 {
        if self.timing.total.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.timing.total.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.timing.total)
    }
}
