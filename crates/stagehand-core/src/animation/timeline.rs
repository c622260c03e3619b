#![forbid(unsafe_code)]

//! Timeline: several tweens composed on one clock.
//!
//! A [`Timeline`] places [`TweenSpec`]s at start offsets relative to its own
//! start. Steps sharing an offset begin on the same tick, which is how a
//! camera move and the object it frames are kept in lockstep. The timeline
//! completes once every step has completed.
//!
//! # Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use stagehand_core::animation::{StartOffset, Timeline, TweenSpec};
//!
//! let tl = Timeline::new()
//!     .to(TweenSpec::new(Cam, Duration::from_secs(2)).position(cam_to), StartOffset::At(Duration::ZERO))
//!     .to(TweenSpec::new(Phone, Duration::from_secs(2)).position(phone_to), StartOffset::At(Duration::ZERO))
//!     .to(TweenSpec::new(Card, Duration::from_millis(500)).to(Prop::Opacity, 1.0), StartOffset::Sequential);
//! ```
//!
//! # Invariants
//!
//! 1. Steps are kept sorted by offset; steps with equal offsets keep their
//!    insertion order.
//! 2. A step first advances on the tick where the timeline clock reaches its
//!    offset, and only by the part of that tick past the offset.
//! 3. `StartOffset::Sequential` places a step at the end of the step added
//!    just before it (offset zero for the first step).
//! 4. The total duration is `max(offset + duration)` over all steps.
//!
//! # Failure Modes
//!
//! - Empty timeline: progress is 1.0 and it completes on its first tick.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use super::tween::{TargetStore, Tween, TweenSpec};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a step starts on the timeline clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// Right after the previously added step ends.
    Sequential,
    /// At an absolute offset from the timeline start.
    At(Duration),
}

/// Playback state of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not yet started.
    Idle,
    /// Actively playing.
    Playing,
    /// Paused; can be resumed.
    Paused,
    /// Every step has completed.
    Finished,
}

struct Step<K> {
    offset: Duration,
    tween: Tween<K>,
    label: Option<String>,
}

/// A set of tweens with relative start offsets and one aggregate completion.
pub struct Timeline<K> {
    steps: Vec<Step<K>>,
    total_duration: Duration,
    /// End of the most recently added step, for sequential placement.
    last_end: Duration,
    state: PlaybackState,
    current_time: Duration,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl<K> fmt::Debug for Timeline<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("step_count", &self.steps.len())
            .field("total_duration", &self.total_duration)
            .field("state", &self.state)
            .field("current_time", &self.current_time)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<K: Copy + Eq + Hash> Timeline<K> {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            total_duration: Duration::ZERO,
            last_end: Duration::ZERO,
            state: PlaybackState::Idle,
            current_time: Duration::ZERO,
            on_complete: None,
        }
    }

    /// Add a step (builder pattern).
    #[must_use]
    pub fn to(mut self, spec: TweenSpec<K>, offset: StartOffset) -> Self {
        self.push_step(spec, offset, None);
        self
    }

    /// Add a labeled step (builder pattern).
    #[must_use]
    pub fn to_labeled(mut self, label: &str, spec: TweenSpec<K>, offset: StartOffset) -> Self {
        self.push_step(spec, offset, Some(label.to_string()));
        self
    }

    /// Run `f` once when every step has completed (builder pattern).
    #[must_use]
    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn push_step(&mut self, spec: TweenSpec<K>, offset: StartOffset, label: Option<String>) {
        let offset = match offset {
            StartOffset::Sequential => self.last_end,
            StartOffset::At(at) => at,
        };
        let end = offset.saturating_add(spec.duration());
        self.last_end = end;
        self.total_duration = self.total_duration.max(end);

        let pos = self.steps.partition_point(|s| s.offset <= offset);
        self.steps.insert(
            pos,
            Step {
                offset,
                tween: Tween::new(spec),
                label,
            },
        );
    }
}

impl<K: Copy + Eq + Hash> Default for Timeline<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Playback control
// ---------------------------------------------------------------------------

impl<K: Copy + Eq + Hash> Timeline<K> {
    /// Start playback. Only an idle timeline can be started; steps are not
    /// replayed because their start values are captured once.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Idle {
            self.state = PlaybackState::Playing;
        }
    }

    /// Pause playback. No-op if not playing.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Resume from pause. No-op if not paused.
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    /// Stop playback for good. Remaining steps never complete.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Finished {
            self.state = PlaybackState::Finished;
            self.on_complete = None;
        }
    }

    /// Current progress as a value in [0.0, 1.0].
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.steps.is_empty() {
            return 1.0;
        }
        if self.total_duration.is_zero() {
            return if self.state == PlaybackState::Finished { 1.0 } else { 0.0 };
        }
        let t = self.current_time.as_secs_f64() / self.total_duration.as_secs_f64();
        t.clamp(0.0, 1.0)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> Duration {
        self.current_time
    }

    /// Total duration: the latest step end.
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.total_duration
    }

    #[inline]
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Linear progress of a labeled step.
    ///
    /// Returns `None` if the label doesn't exist.
    #[must_use]
    pub fn step_progress(&self, label: &str) -> Option<f64> {
        self.steps
            .iter()
            .find(|s| s.label.as_deref() == Some(label))
            .map(|s| s.tween.progress())
    }

    /// Start offset of a labeled step.
    #[must_use]
    pub fn step_offset(&self, label: &str) -> Option<Duration> {
        self.steps
            .iter()
            .find(|s| s.label.as_deref() == Some(label))
            .map(|s| s.offset)
    }

    /// Advance the clock by `dt`, writing into `store`.
    ///
    /// Returns `true` on the tick where the last step completes.
    pub(crate) fn advance(&mut self, dt: Duration, store: &mut TargetStore<K>) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }

        let new_time = self.current_time.saturating_add(dt);

        for step in &mut self.steps {
            if step.tween.is_finished() || new_time < step.offset {
                continue;
            }
            let step_dt = if self.current_time >= step.offset {
                dt
            } else {
                // Step starts within this tick; forward only the part past its offset.
                new_time.saturating_sub(step.offset)
            };
            step.tween.advance(step_dt, store);
        }

        self.current_time = new_time;

        if self.steps.iter().all(|s| s.tween.is_finished()) {
            self.current_time = self.current_time.min(self.total_duration);
            self.state = PlaybackState::Finished;
            if let Some(complete) = self.on_complete.take() {
                complete();
            }
            return true;
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::tween::{Prop, Transform};
    use crate::geometry::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_300: Duration = Duration::from_millis(300);
    const MS_500: Duration = Duration::from_millis(500);

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Obj {
        Cam,
        Phone,
        Card,
    }

    fn store() -> TargetStore<Obj> {
        let mut s = TargetStore::new();
        s.insert(Obj::Cam, Transform::at(Vec3::new(0.0, 0.0, 10.0)));
        s.insert(Obj::Phone, Transform::default());
        s.insert(Obj::Card, Transform::default().with_opacity(0.0));
        s
    }

    fn playing(tl: Timeline<Obj>) -> Timeline<Obj> {
        let mut tl = tl;
        tl.play();
        tl
    }

    #[test]
    fn empty_timeline_is_immediately_complete() {
        let mut tl: Timeline<Obj> = playing(Timeline::new());
        assert_eq!(tl.progress(), 1.0);
        assert!(tl.advance(Duration::ZERO, &mut store()));
        assert_eq!(tl.state(), PlaybackState::Finished);
    }

    #[test]
    fn parallel_steps_start_on_same_tick() {
        let mut s = store();
        let mut tl = playing(
            Timeline::new()
                .to(
                    TweenSpec::new(Obj::Cam, MS_500).position(Vec3::new(0.0, 0.0, 5.0)),
                    StartOffset::At(Duration::ZERO),
                )
                .to(
                    TweenSpec::new(Obj::Cam, MS_500).look_at(Vec3::new(0.0, 2.0, 0.0)),
                    StartOffset::At(Duration::ZERO),
                )
                .to(
                    TweenSpec::new(Obj::Phone, MS_500).rotation(Vec3::new(0.0, 1.0, 0.0)),
                    StartOffset::At(Duration::ZERO),
                ),
        );

        tl.advance(MS_100, &mut s);
        let cam = s.get(Obj::Cam).unwrap();
        let phone = s.get(Obj::Phone).unwrap();
        assert!((cam.position.z - 9.0).abs() < 1e-9);
        assert!((cam.look_at.y - 0.4).abs() < 1e-9);
        assert!((phone.rotation.y - 0.2).abs() < 1e-9);
    }

    #[test]
    fn sequential_step_waits_for_previous() {
        let mut s = store();
        let mut tl = playing(
            Timeline::new()
                .to_labeled(
                    "move",
                    TweenSpec::new(Obj::Phone, MS_200).to(Prop::X, 2.0),
                    StartOffset::At(Duration::ZERO),
                )
                .to_labeled(
                    "reveal",
                    TweenSpec::new(Obj::Card, MS_200).to(Prop::Opacity, 1.0),
                    StartOffset::Sequential,
                ),
        );
        assert_eq!(tl.duration(), Duration::from_millis(400));
        assert_eq!(tl.step_offset("reveal"), Some(MS_200));

        tl.advance(MS_100, &mut s);
        assert!((tl.step_progress("move").unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(tl.step_progress("reveal"), Some(0.0));

        // Crosses the 200ms boundary: reveal only gets the 100ms past it.
        tl.advance(MS_200, &mut s);
        assert_eq!(tl.step_progress("move"), Some(1.0));
        assert!((tl.step_progress("reveal").unwrap() - 0.5).abs() < 1e-9);
        assert!((s.get(Obj::Card).unwrap().opacity - 0.5).abs() < 1e-9);

        assert!(tl.advance(MS_100, &mut s));
        assert_eq!(s.get(Obj::Card).unwrap().opacity, 1.0);
        assert!((tl.progress() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sequential_step_starts_from_previous_end_value() {
        let mut s = store();
        let mut tl = playing(
            Timeline::new()
                .to(TweenSpec::new(Obj::Phone, MS_100).to(Prop::Y, 4.0), StartOffset::Sequential)
                .to(TweenSpec::new(Obj::Phone, MS_100).to(Prop::Y, 0.0), StartOffset::Sequential),
        );
        tl.advance(MS_100, &mut s);
        assert_eq!(s.get(Obj::Phone).unwrap().position.y, 4.0);
        tl.advance(Duration::from_millis(50), &mut s);
        assert!((s.get(Obj::Phone).unwrap().position.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn total_duration_is_latest_end() {
        let tl: Timeline<Obj> = Timeline::new()
            .to(TweenSpec::new(Obj::Cam, MS_500), StartOffset::At(Duration::ZERO))
            .to(TweenSpec::new(Obj::Card, MS_100), StartOffset::At(MS_200));
        assert_eq!(tl.duration(), MS_500);
        assert_eq!(tl.step_count(), 2);
    }

    #[test]
    fn completes_once_with_callback() {
        let mut s = store();
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let mut tl = playing(
            Timeline::new()
                .to(TweenSpec::new(Obj::Cam, MS_300).to(Prop::Z, 0.0), StartOffset::At(Duration::ZERO))
                .on_complete(move || f.set(f.get() + 1)),
        );
        assert!(!tl.advance(MS_200, &mut s));
        assert!(tl.advance(MS_200, &mut s));
        assert!(!tl.advance(MS_200, &mut s));
        assert_eq!(fired.get(), 1);
        assert_eq!(tl.current_time(), MS_300);
    }

    #[test]
    fn pause_resume() {
        let mut s = store();
        let mut tl = playing(
            Timeline::new().to(TweenSpec::new(Obj::Cam, MS_500).to(Prop::Z, 0.0), StartOffset::Sequential),
        );
        tl.advance(MS_100, &mut s);
        tl.pause();
        assert_eq!(tl.state(), PlaybackState::Paused);
        let at_pause = tl.current_time();
        tl.advance(MS_300, &mut s);
        assert_eq!(tl.current_time(), at_pause);
        tl.resume();
        assert_eq!(tl.state(), PlaybackState::Playing);
        tl.advance(MS_100, &mut s);
        assert_eq!(tl.current_time(), MS_200);
    }

    #[test]
    fn stop_drops_completion() {
        let mut s = store();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let mut tl = playing(
            Timeline::new()
                .to(TweenSpec::new(Obj::Cam, MS_100).to(Prop::Z, 0.0), StartOffset::Sequential)
                .on_complete(move || f.set(true)),
        );
        tl.stop();
        assert!(!tl.advance(MS_500, &mut s));
        assert!(!fired.get());
        assert_eq!(s.get(Obj::Cam).unwrap().position.z, 10.0);
    }

    #[test]
    fn idle_timeline_does_not_advance() {
        let mut s = store();
        let mut tl = Timeline::new().to(TweenSpec::new(Obj::Cam, MS_100).to(Prop::Z, 0.0), StartOffset::Sequential);
        assert!(!tl.advance(MS_500, &mut s));
        assert_eq!(tl.state(), PlaybackState::Idle);
    }

    #[test]
    fn unknown_label_is_none() {
        let tl: Timeline<Obj> = Timeline::new();
        assert_eq!(tl.step_progress("nope"), None);
        assert_eq!(tl.step_offset("nope"), None);
    }
}
