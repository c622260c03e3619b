#![forbid(unsafe_code)]

//! Snap-to-nearest over evenly spaced slots.
//!
//! # Invariants
//!
//! 1. A selection is committed only when the nearest slot is strictly closer
//!    than the threshold (`distance < threshold`). A value exactly on the
//!    threshold keeps the previous selection.
//! 2. When two slots are equally near, the lower index wins.
//! 3. Circular grids measure distance around the period, so values any
//!    number of turns away resolve to the same slot.

/// `count` slots spaced `spacing` apart, starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapGrid {
    count: usize,
    spacing: f64,
    origin: f64,
    threshold: f64,
    period: Option<f64>,
}

impl SnapGrid {
    /// Slots along a line. Threshold defaults to half the spacing.
    #[must_use]
    pub fn linear(count: usize, spacing: f64) -> Self {
        let spacing = spacing.abs();
        Self {
            count,
            spacing,
            origin: 0.0,
            threshold: spacing / 2.0,
            period: None,
        }
    }

    /// Slots evenly spread around a circle of `period` (e.g. `TAU` or 360).
    #[must_use]
    pub fn circular(count: usize, period: f64) -> Self {
        let period = period.abs();
        let spacing = if count == 0 {
            period
        } else {
            period / count as f64
        };
        Self {
            count,
            spacing,
            origin: 0.0,
            threshold: spacing / 2.0,
            period: Some(period),
        }
    }

    /// Maximum commit distance (builder pattern).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.abs();
        self
    }

    /// Position of slot 0 (builder pattern).
    #[must_use]
    pub fn with_origin(mut self, origin: f64) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    #[must_use]
    pub fn is_circular(&self) -> bool {
        self.period.is_some()
    }

    #[must_use]
    pub fn slot_center(&self, index: usize) -> f64 {
        self.origin + self.spacing * index as f64
    }

    /// Signed offset that moves `value` onto `target`, the short way round
    /// on circular grids.
    fn offset(&self, value: f64, target: f64) -> f64 {
        let d = target - value;
        match self.period {
            Some(p) if p > 0.0 => {
                let d = d.rem_euclid(p);
                if d > p / 2.0 { d - p } else { d }
            }
            _ => d,
        }
    }

    /// Unsigned distance between a value and a slot position.
    #[must_use]
    pub fn distance(&self, value: f64, target: f64) -> f64 {
        self.offset(value, target).abs()
    }

    /// Nearest slot and its distance. `None` for an empty grid.
    #[must_use]
    pub fn nearest(&self, value: f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.count {
            let d = self.distance(value, self.slot_center(i));
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best
    }

    /// Commit the nearest slot if within the threshold, else keep `previous`.
    #[must_use]
    pub fn snap(&self, value: f64, previous: Option<usize>) -> Option<usize> {
        match self.nearest(value) {
            Some((index, distance)) if distance < self.threshold => Some(index),
            _ => previous,
        }
    }

    /// Nearest slot and the value that lands exactly on it.
    ///
    /// On circular grids the landing value stays in the same turn as
    /// `value`, so settling never spins the long way round.
    #[must_use]
    pub fn settle_target(&self, value: f64) -> Option<(usize, f64)> {
        let (index, _) = self.nearest(value)?;
        let center = self.slot_center(index);
        let target = if self.is_circular() {
            value + self.offset(value, center)
        } else {
            center
        };
        Some((index, target))
    }
}
