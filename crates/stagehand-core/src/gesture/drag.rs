#![forbid(unsafe_code)]

//! Drag sessions and the single-axis drag tracker.

use std::time::Duration;

use tracing::trace;
use web_time::Instant;

use super::GestureConfig;
use super::momentum::Momentum;
use crate::geometry::Point;

// ---------------------------------------------------------------------------
// DragSession
// ---------------------------------------------------------------------------

/// Pointer bookkeeping for one press-move-release interaction.
///
/// Created on press and dropped on release; nothing survives between
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    start: Point,
    last: Point,
    started_at: Instant,
    last_time: Instant,
}

impl DragSession {
    #[must_use]
    pub fn new(pos: Point, now: Instant) -> Self {
        Self {
            start: pos,
            last: pos,
            started_at: now,
            last_time: now,
        }
    }

    /// Record a new sample, returning the delta and time since the previous one.
    pub fn update(&mut self, pos: Point, now: Instant) -> (Point, Duration) {
        let delta = pos - self.last;
        let dt = now.saturating_duration_since(self.last_time);
        self.last = pos;
        self.last_time = now;
        (delta, dt)
    }

    #[inline]
    #[must_use]
    pub fn start(&self) -> Point {
        self.start
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Point {
        self.last
    }

    /// Offset from the press position to the latest sample.
    #[must_use]
    pub fn total_delta(&self) -> Point {
        self.last - self.start
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.last_time.saturating_duration_since(self.started_at)
    }

    /// Time since the latest sample.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_time)
    }
}

// ---------------------------------------------------------------------------
// DragTracker
// ---------------------------------------------------------------------------

/// Pointer axis a tracker reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn pick(self, p: Point) -> f64 {
        match self {
            Self::X => p.x,
            Self::Y => p.y,
        }
    }
}

/// What happened when the pointer was released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// Fast enough to coast; drive it with [`DragTracker::step_frame`].
    Momentum { velocity: f64 },
    /// Too slow to coast; the value is final.
    Settled { value: f64 },
}

/// Maps pointer motion along one axis onto a clamped scalar.
///
/// Pointer deltas are scaled by `sensitivity`, added to the value, then
/// clamped to the optional bounds. Velocity is the change in value per
/// reference frame, measured between consecutive samples.
#[derive(Debug, Clone)]
pub struct DragTracker {
    config: GestureConfig,
    axis: Axis,
    sensitivity: f64,
    bounds: Option<(f64, f64)>,
    value: f64,
    velocity: f64,
    session: Option<DragSession>,
    momentum: Option<Momentum>,
}

impl DragTracker {
    #[must_use]
    pub fn new(axis: Axis, config: GestureConfig) -> Self {
        Self {
            config,
            axis,
            sensitivity: 1.0,
            bounds: None,
            value: 0.0,
            velocity: 0.0,
            session: None,
            momentum: None,
        }
    }

    /// Value units per pointer unit (builder pattern). Negative inverts.
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Clamp the value to `[min, max]` (builder pattern).
    #[must_use]
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min.min(max), min.max(max)));
        self.value = self.clamp(self.value);
        self
    }

    /// Initial value (builder pattern).
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = self.clamp(value);
        self
    }

    fn clamp(&self, v: f64) -> f64 {
        match self.bounds {
            Some((min, max)) => v.clamp(min, max),
            None => v,
        }
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Velocity in value units per reference frame.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_coasting(&self) -> bool {
        self.momentum.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Jump to a value, stopping any momentum.
    pub fn set_value(&mut self, value: f64) {
        self.momentum = None;
        self.velocity = 0.0;
        self.value = self.clamp(value);
    }

    /// Press: open a session and stop any coasting.
    pub fn on_drag_start(&mut self, pos: Point, now: Instant) {
        self.momentum = None;
        self.velocity = 0.0;
        self.session = Some(DragSession::new(pos, now));
    }

    /// Move: apply the scaled delta and refresh the velocity estimate.
    ///
    /// Samples with no elapsed time keep the previous velocity.
    pub fn on_drag_move(&mut self, pos: Point, now: Instant) -> f64 {
        let Some(session) = self.session.as_mut() else {
            return self.value;
        };
        let (delta, dt) = session.update(pos, now);
        let previous = self.value;
        self.value = self.clamp(self.value + self.axis.pick(delta) * self.sensitivity);

        let dt_ms = dt.as_secs_f64() * 1000.0;
        if dt_ms > 0.0 {
            let max = self.config.max_velocity.abs();
            self.velocity =
                ((self.value - previous) / dt_ms * self.config.frame_ms).clamp(-max, max);
        }
        trace!(
            target: "stagehand.gesture",
            value = self.value,
            velocity = self.velocity,
            "drag move"
        );
        self.value
    }

    /// Release: coast if fast enough, otherwise settle where the value is.
    ///
    /// A release that adds no motion keeps the last move's velocity when it
    /// lands within `release_window_ms` of that move. Holding still longer
    /// drops the flick.
    pub fn on_drag_end(&mut self, pos: Point, now: Instant) -> ReleaseOutcome {
        let Some(session) = self.session else {
            return ReleaseOutcome::Settled { value: self.value };
        };
        let idle_ms = session.idle_for(now).as_secs_f64() * 1000.0;
        let carried = self.velocity;
        let before = self.value;
        self.on_drag_move(pos, now);
        if self.value == before {
            self.velocity = if idle_ms <= self.config.release_window_ms {
                carried
            } else {
                0.0
            };
        }
        self.session = None;

        if self.velocity.abs() > self.config.min_velocity {
            let mut momentum = Momentum::new(self.velocity, &self.config);
            if let Some((min, max)) = self.bounds {
                momentum = momentum.with_bounds(min, max);
            }
            self.momentum = Some(momentum);
            ReleaseOutcome::Momentum {
                velocity: self.velocity,
            }
        } else {
            self.velocity = 0.0;
            ReleaseOutcome::Settled { value: self.value }
        }
    }

    /// Advance coasting by one reference frame.
    ///
    /// Returns the new value, or `None` when not coasting. The frame that
    /// brings the velocity below the stop threshold ends coasting.
    pub fn step_frame(&mut self) -> Option<f64> {
        let momentum = self.momentum.as_mut()?;
        self.value = momentum.step(self.value);
        self.velocity = momentum.velocity();
        if momentum.is_settled() {
            self.momentum = None;
            self.velocity = 0.0;
        }
        Some(self.value)
    }

    /// Drop the session and any momentum without moving the value.
    pub fn cancel(&mut self) {
        self.session = None;
        self.momentum = None;
        self.velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::FRAME_MS;
    use std::f64::consts::FRAC_PI_2;

    const MS_16: Duration = Duration::from_millis(16);
    const MS_50: Duration = Duration::from_millis(50);

    fn tracker() -> DragTracker {
        DragTracker::new(Axis::X, GestureConfig::default())
    }

    #[test]
    fn session_tracks_deltas() {
        let t = Instant::now();
        let mut s = DragSession::new(Point::new(1.0, 1.0), t);
        let (d, dt) = s.update(Point::new(4.0, 0.0), t + MS_50);
        assert_eq!(d, Point::new(3.0, -1.0));
        assert_eq!(dt, MS_50);
        s.update(Point::new(6.0, 0.0), t + MS_50 + MS_50);
        assert_eq!(s.total_delta(), Point::new(5.0, -1.0));
        assert_eq!(s.duration(), Duration::from_millis(100));
    }

    #[test]
    fn velocity_is_per_reference_frame() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(10.0, 0.0), t + MS_50);
        // 10 units in 50ms → 0.2 units/ms → 3.334 units per 16.67ms frame.
        assert!((tr.velocity() - 10.0 / 50.0 * FRAME_MS).abs() < 1e-9);
    }

    #[test]
    fn sensitivity_and_axis_are_applied() {
        let t = Instant::now();
        let mut tr = DragTracker::new(Axis::Y, GestureConfig::default()).with_sensitivity(-0.5);
        tr.on_drag_start(Point::ORIGIN, t);
        assert_eq!(tr.on_drag_move(Point::new(100.0, 10.0), t + MS_16), -5.0);
    }

    #[test]
    fn rotation_is_clamped_to_quarter_turn() {
        let t = Instant::now();
        let mut tr = tracker().with_sensitivity(0.01).with_bounds(0.0, FRAC_PI_2);
        tr.on_drag_start(Point::ORIGIN, t);
        assert_eq!(tr.on_drag_move(Point::new(500.0, 0.0), t + MS_16), FRAC_PI_2);
        assert_eq!(tr.on_drag_move(Point::new(-500.0, 0.0), t + MS_16 + MS_16), 0.0);
    }

    #[test]
    fn slow_release_settles() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(1.0, 0.0), t + Duration::from_millis(500));
        let out = tr.on_drag_end(Point::new(1.0, 0.0), t + Duration::from_millis(600));
        assert_eq!(out, ReleaseOutcome::Settled { value: 1.0 });
        assert!(!tr.is_coasting());
        assert_eq!(tr.step_frame(), None);
    }

    #[test]
    fn fast_release_coasts_then_stops() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(30.0, 0.0), t + MS_50);
        let out = tr.on_drag_end(Point::new(30.0, 0.0), t + MS_50);
        let ReleaseOutcome::Momentum { velocity } = out else {
            panic!("expected momentum, got {out:?}");
        };
        assert!(velocity > 0.1);

        let mut frames = 0;
        let mut last = tr.value();
        while let Some(v) = tr.step_frame() {
            assert!(v >= last);
            last = v;
            frames += 1;
            assert!(frames < 1000);
        }
        assert!(last > 30.0);
        assert_eq!(tr.velocity(), 0.0);
    }

    #[test]
    fn late_release_keeps_flick_velocity() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(30.0, 0.0), t + MS_16);
        let flick = tr.velocity();
        assert!(flick > 30.0);
        let out = tr.on_drag_end(Point::new(30.0, 0.0), t + MS_16 + Duration::from_millis(8));
        assert_eq!(out, ReleaseOutcome::Momentum { velocity: flick });
        assert!(tr.is_coasting());
    }

    #[test]
    fn holding_still_before_release_drops_the_flick() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(30.0, 0.0), t + MS_16);
        let out = tr.on_drag_end(Point::new(30.0, 0.0), t + MS_16 + Duration::from_millis(200));
        assert_eq!(out, ReleaseOutcome::Settled { value: 30.0 });
        assert_eq!(tr.velocity(), 0.0);
    }

    #[test]
    fn release_with_motion_measures_its_own_velocity() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(30.0, 0.0), t + MS_16);
        let out = tr.on_drag_end(Point::new(31.0, 0.0), t + MS_16 + MS_16);
        let ReleaseOutcome::Momentum { velocity } = out else {
            panic!("expected momentum, got {out:?}");
        };
        assert!((velocity - 1.0 / 16.0 * FRAME_MS).abs() < 1e-9);
    }

    #[test]
    fn new_press_cancels_momentum() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(30.0, 0.0), t + MS_50);
        tr.on_drag_end(Point::new(30.0, 0.0), t + MS_50);
        assert!(tr.is_coasting());
        tr.on_drag_start(Point::ORIGIN, t + MS_50 + MS_16);
        assert!(!tr.is_coasting());
        assert!(tr.is_dragging());
    }

    #[test]
    fn move_without_session_is_ignored() {
        let t = Instant::now();
        let mut tr = tracker().with_value(2.0);
        assert_eq!(tr.on_drag_move(Point::new(100.0, 0.0), t), 2.0);
        assert_eq!(
            tr.on_drag_end(Point::ORIGIN, t),
            ReleaseOutcome::Settled { value: 2.0 }
        );
    }

    #[test]
    fn zero_dt_keeps_previous_velocity() {
        let t = Instant::now();
        let mut tr = tracker();
        tr.on_drag_start(Point::ORIGIN, t);
        tr.on_drag_move(Point::new(5.0, 0.0), t + MS_50);
        let v = tr.velocity();
        tr.on_drag_move(Point::new(6.0, 0.0), t + MS_50);
        assert_eq!(tr.velocity(), v);
        assert_eq!(tr.value(), 6.0);
    }
}
