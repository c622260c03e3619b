#![forbid(unsafe_code)]

//! Slot pickers: a drag tracker whose value settles onto a snap grid.
//!
//! Two shapes share one implementation:
//!
//! - **Wheel** ([`SlotPicker::wheel`]): a vertical list of items of equal
//!   extent, scrolled by dragging and bounded at both ends.
//! - **Ring** ([`SlotPicker::ring`]): items around a circle, rotated by
//!   horizontal drags with no bounds.
//!
//! While dragging or coasting the selection follows [`SnapGrid::snap`], so it
//! only changes when the value comes within the threshold of a slot. Once
//! motion stops the value is moved onto the nearest slot.

use std::f64::consts::TAU;

use web_time::Instant;

use super::drag::{Axis, DragTracker, ReleaseOutcome};
use super::snap::SnapGrid;
use super::GestureConfig;
use crate::geometry::Point;

/// Result of releasing or advancing a picker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickerStep {
    /// Nothing is moving.
    Idle,
    /// Momentum is still carrying the value.
    Coasting {
        value: f64,
        selected: Option<usize>,
    },
    /// Motion ended on a slot.
    Settled { index: usize, value: f64 },
}

/// A tracker, a grid and the committed selection.
#[derive(Debug, Clone)]
pub struct SlotPicker {
    tracker: DragTracker,
    grid: SnapGrid,
    selected: Option<usize>,
}

impl SlotPicker {
    /// Vertical wheel of `count` items, each `item_extent` pointer units
    /// tall. Dragging up scrolls toward later items.
    #[must_use]
    pub fn wheel(count: usize, item_extent: f64, config: GestureConfig) -> Self {
        let item_extent = item_extent.abs();
        let max = item_extent * count.saturating_sub(1) as f64;
        Self {
            tracker: DragTracker::new(Axis::Y, config)
                .with_sensitivity(-1.0)
                .with_bounds(0.0, max),
            grid: SnapGrid::linear(count, item_extent),
            selected: if count > 0 { Some(0) } else { None },
        }
    }

    /// Ring of `count` items rotated by horizontal drags, `radians_per_unit`
    /// radians per pointer unit.
    #[must_use]
    pub fn ring(count: usize, radians_per_unit: f64, config: GestureConfig) -> Self {
        Self {
            tracker: DragTracker::new(Axis::X, config).with_sensitivity(radians_per_unit),
            grid: SnapGrid::circular(count, TAU),
            selected: if count > 0 { Some(0) } else { None },
        }
    }

    /// Override the snap threshold (builder pattern).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.grid = self.grid.with_threshold(threshold);
        self
    }

    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.tracker.value()
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &SnapGrid {
        &self.grid
    }

    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &DragTracker {
        &self.tracker
    }

    /// Jump straight to a slot.
    pub fn select(&mut self, index: usize) {
        if index < self.grid.count() {
            self.tracker.set_value(self.grid.slot_center(index));
            self.selected = Some(index);
        }
    }

    pub fn on_drag_start(&mut self, pos: Point, now: Instant) {
        self.tracker.on_drag_start(pos, now);
    }

    /// Returns the selection after this move.
    pub fn on_drag_move(&mut self, pos: Point, now: Instant) -> Option<usize> {
        let value = self.tracker.on_drag_move(pos, now);
        self.selected = self.grid.snap(value, self.selected);
        self.selected
    }

    pub fn on_drag_end(&mut self, pos: Point, now: Instant) -> PickerStep {
        match self.tracker.on_drag_end(pos, now) {
            ReleaseOutcome::Momentum { .. } => {
                let value = self.tracker.value();
                self.selected = self.grid.snap(value, self.selected);
                PickerStep::Coasting {
                    value,
                    selected: self.selected,
                }
            }
            ReleaseOutcome::Settled { .. } => self.settle(),
        }
    }

    /// Advance coasting by one reference frame.
    pub fn step_frame(&mut self) -> PickerStep {
        let Some(value) = self.tracker.step_frame() else {
            return PickerStep::Idle;
        };
        if self.tracker.is_coasting() {
            self.selected = self.grid.snap(value, self.selected);
            PickerStep::Coasting {
                value,
                selected: self.selected,
            }
        } else {
            self.settle()
        }
    }

    fn settle(&mut self) -> PickerStep {
        let Some((index, target)) = self.grid.settle_target(self.tracker.value()) else {
            return PickerStep::Idle;
        };
        self.tracker.set_value(target);
        let value = self.tracker.value();
        self.selected = Some(index);
        PickerStep::Settled { index, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MS_16: Duration = Duration::from_millis(16);

    fn run_until_settled(p: &mut SlotPicker, first: PickerStep) -> (usize, f64) {
        let mut step = first;
        for _ in 0..10_000 {
            match step {
                PickerStep::Settled { index, value } => return (index, value),
                PickerStep::Idle => panic!("picker went idle without settling"),
                PickerStep::Coasting { .. } => step = p.step_frame(),
            }
        }
        panic!("picker never settled");
    }

    #[test]
    fn slow_wheel_drag_settles_on_nearest_item() {
        let t = Instant::now();
        let mut p = SlotPicker::wheel(24, 40.0, GestureConfig::default());
        p.on_drag_start(Point::new(0.0, 200.0), t);
        // Up by 95 → offset 95 → item 2 (80) is nearest.
        p.on_drag_move(Point::new(0.0, 105.0), t + Duration::from_millis(400));
        let step = p.on_drag_end(Point::new(0.0, 105.0), t + Duration::from_millis(900));
        assert_eq!(step, PickerStep::Settled { index: 2, value: 80.0 });
        assert_eq!(p.selected(), Some(2));
    }

    #[test]
    fn wheel_selection_waits_for_threshold() {
        let t = Instant::now();
        let mut p = SlotPicker::wheel(10, 40.0, GestureConfig::default()).with_threshold(5.0);
        p.on_drag_start(Point::new(0.0, 0.0), t);
        assert_eq!(p.on_drag_move(Point::new(0.0, -30.0), t + MS_16), Some(0));
        assert_eq!(p.on_drag_move(Point::new(0.0, -37.0), t + MS_16 * 2), Some(1));
    }

    #[test]
    fn flick_coasts_then_lands_on_a_slot() {
        let t = Instant::now();
        let mut p = SlotPicker::wheel(24, 40.0, GestureConfig::default());
        p.on_drag_start(Point::new(0.0, 300.0), t);
        p.on_drag_move(Point::new(0.0, 240.0), t + MS_16);
        let first = p.on_drag_end(Point::new(0.0, 240.0), t + MS_16);
        assert!(matches!(first, PickerStep::Coasting { .. }));
        let (index, value) = run_until_settled(&mut p, first);
        assert_eq!(value, 40.0 * index as f64);
        assert!(index > 1);
        assert_eq!(p.step_frame(), PickerStep::Idle);
    }

    #[test]
    fn wheel_is_bounded() {
        let t = Instant::now();
        let mut p = SlotPicker::wheel(3, 40.0, GestureConfig::default());
        p.on_drag_start(Point::new(0.0, 0.0), t);
        p.on_drag_move(Point::new(0.0, -1000.0), t + Duration::from_millis(500));
        assert_eq!(p.value(), 80.0);
        let step = p.on_drag_end(Point::new(0.0, -1000.0), t + Duration::from_millis(900));
        assert_eq!(step, PickerStep::Settled { index: 2, value: 80.0 });
    }

    #[test]
    fn ring_wraps_to_slot_in_same_turn() {
        let t = Instant::now();
        let mut p = SlotPicker::ring(5, 0.01, GestureConfig::default());
        p.on_drag_start(Point::ORIGIN, t);
        // 700 units → 7.0 rad, one turn plus 0.717 rad; slot 1 sits at 1.2566.
        p.on_drag_move(Point::new(700.0, 0.0), t + Duration::from_millis(800));
        let step = p.on_drag_end(Point::new(700.0, 0.0), t + Duration::from_secs(1));
        let PickerStep::Settled { index, value } = step else {
            panic!("expected settle, got {step:?}");
        };
        assert_eq!(index, 1);
        assert!((value - (TAU + TAU / 5.0)).abs() < 1e-9);
    }

    #[test]
    fn select_jumps() {
        let mut p = SlotPicker::ring(6, 0.01, GestureConfig::default());
        p.select(4);
        assert_eq!(p.selected(), Some(4));
        assert!((p.value() - TAU * 4.0 / 6.0).abs() < 1e-12);
        p.select(99);
        assert_eq!(p.selected(), Some(4));
    }
}
