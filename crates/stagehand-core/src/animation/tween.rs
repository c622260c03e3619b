#![forbid(unsafe_code)]

//! Property tweens over keyed scene targets.
//!
//! A [`TweenSpec`] describes where some properties of one target should end
//! up, how long it takes and which easing curve shapes the motion. The
//! [`TweenEngine`] runs specs (and whole [`Timeline`]s) against a
//! [`TargetStore`], writing interpolated values on every tick.
//!
//! # Invariants
//!
//! 1. Start values are captured on a tween's first tick, not when the
//!    [`TweenSpec`] is built. A tween queued behind another one starts from
//!    wherever the earlier one left the target.
//! 2. `on_update` runs on every tick the tween is advanced, with the linear
//!    progress in `[0, 1]`.
//! 3. `on_complete` runs exactly once, on the tick that reaches the end.
//!    Cancelled tweens never run it.
//! 4. On completion every property holds exactly its end value, independent
//!    of rounding in the easing curve.
//! 5. [`TweenEngine::tick`] reports completed handles in start order.
//!
//! # Failure Modes
//!
//! - Zero duration: the tween jumps to its end values and completes on its
//!   first tick.
//! - Cancelling an unknown or finished handle returns `false` and does
//!   nothing.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use ahash::AHashMap;
use tracing::debug;

use super::easing::{EasingFn, linear};
use super::timeline::Timeline;
use crate::geometry::Vec3;

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// An animatable channel of a [`Transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prop {
    X,
    Y,
    Z,
    RotX,
    RotY,
    RotZ,
    LookX,
    LookY,
    LookZ,
    Scale,
    Opacity,
}

/// Position, orientation and appearance of one scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    /// Point the object faces. Only meaningful for cameras.
    pub look_at: Vec3,
    pub scale: f64,
    pub opacity: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            look_at: Vec3::ZERO,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

impl Transform {
    /// A default transform placed at `position`.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Set the rotation (builder pattern).
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the look-at point (builder pattern).
    #[must_use]
    pub fn with_look_at(mut self, look_at: Vec3) -> Self {
        self.look_at = look_at;
        self
    }

    /// Set the opacity (builder pattern).
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub fn get(&self, prop: Prop) -> f64 {
        match prop {
            Prop::X => self.position.x,
            Prop::Y => self.position.y,
            Prop::Z => self.position.z,
            Prop::RotX => self.rotation.x,
            Prop::RotY => self.rotation.y,
            Prop::RotZ => self.rotation.z,
            Prop::LookX => self.look_at.x,
            Prop::LookY => self.look_at.y,
            Prop::LookZ => self.look_at.z,
            Prop::Scale => self.scale,
            Prop::Opacity => self.opacity,
        }
    }

    pub fn set(&mut self, prop: Prop, value: f64) {
        match prop {
            Prop::X => self.position.x = value,
            Prop::Y => self.position.y = value,
            Prop::Z => self.position.z = value,
            Prop::RotX => self.rotation.x = value,
            Prop::RotY => self.rotation.y = value,
            Prop::RotZ => self.rotation.z = value,
            Prop::LookX => self.look_at.x = value,
            Prop::LookY => self.look_at.y = value,
            Prop::LookZ => self.look_at.z = value,
            Prop::Scale => self.scale = value,
            Prop::Opacity => self.opacity = value,
        }
    }
}

/// Transforms of every animatable object, keyed by a caller-chosen id.
#[derive(Debug, Clone)]
pub struct TargetStore<K> {
    targets: AHashMap<K, Transform>,
}

impl<K: Copy + Eq + Hash> TargetStore<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: AHashMap::new(),
        }
    }

    /// Insert or replace a target, returning the previous transform.
    pub fn insert(&mut self, key: K, transform: Transform) -> Option<Transform> {
        self.targets.insert(key, transform)
    }

    #[must_use]
    pub fn get(&self, key: K) -> Option<&Transform> {
        self.targets.get(&key)
    }

    /// Mutable access, creating a default transform for unknown keys.
    pub fn transform_mut(&mut self, key: K) -> &mut Transform {
        self.targets.entry(key).or_default()
    }

    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.targets.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for TargetStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TweenSpec
// ---------------------------------------------------------------------------

type UpdateFn = Box<dyn FnMut(f64)>;
type CompleteFn = Box<dyn FnOnce()>;

/// Description of one tween: target, end values, duration, easing and
/// callbacks.
pub struct TweenSpec<K> {
    target: K,
    props: Vec<(Prop, f64)>,
    duration: Duration,
    easing: EasingFn,
    on_update: Option<UpdateFn>,
    on_complete: Option<CompleteFn>,
}

impl<K: fmt::Debug> fmt::Debug for TweenSpec<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenSpec")
            .field("target", &self.target)
            .field("props", &self.props)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl<K> TweenSpec<K> {
    #[must_use]
    pub fn new(target: K, duration: Duration) -> Self {
        Self {
            target,
            props: Vec::new(),
            duration,
            easing: linear,
            on_update: None,
            on_complete: None,
        }
    }

    /// Tween `prop` to `value` (builder pattern). A later call for the same
    /// prop replaces the earlier end value.
    #[must_use]
    pub fn to(mut self, prop: Prop, value: f64) -> Self {
        match self.props.iter_mut().find(|(p, _)| *p == prop) {
            Some(entry) => entry.1 = value,
            None => self.props.push((prop, value)),
        }
        self
    }

    #[must_use]
    pub fn position(self, v: Vec3) -> Self {
        self.to(Prop::X, v.x).to(Prop::Y, v.y).to(Prop::Z, v.z)
    }

    #[must_use]
    pub fn rotation(self, v: Vec3) -> Self {
        self.to(Prop::RotX, v.x)
            .to(Prop::RotY, v.y)
            .to(Prop::RotZ, v.z)
    }

    #[must_use]
    pub fn look_at(self, v: Vec3) -> Self {
        self.to(Prop::LookX, v.x)
            .to(Prop::LookY, v.y)
            .to(Prop::LookZ, v.z)
    }

    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Called every tick with the linear progress.
    #[must_use]
    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    /// Called once when the tween reaches its end.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &K {
        &self.target
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

// ---------------------------------------------------------------------------
// Running tween
// ---------------------------------------------------------------------------

/// A queued `TweenSpec` with its progress.
pub(crate) struct Tween<K> {
    spec: TweenSpec<K>,
    from: Option<Vec<f64>>,
    elapsed: Duration,
    finished: bool,
}

impl<K: Copy + Eq + Hash> Tween<K> {
    pub(crate) fn new(spec: TweenSpec<K>) -> Self {
        Self {
            spec,
            from: None,
            elapsed: Duration::ZERO,
            finished: false,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn progress(&self) -> f64 {
        if self.finished {
            return 1.0;
        }
        if self.spec.duration.is_zero() {
            return 0.0;
        }
        (self.elapsed.as_secs_f64() / self.spec.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Advance by `dt` and write the interpolated values into `store`.
    ///
    /// Returns `true` on the tick that finishes the tween; the completion
    /// callback has already run by then.
    pub(crate) fn advance(&mut self, dt: Duration, store: &mut TargetStore<K>) -> bool {
        if self.finished {
            return false;
        }

        let transform = store.transform_mut(self.spec.target);
        let props = &self.spec.props;
        let from = self
            .from
            .get_or_insert_with(|| props.iter().map(|(p, _)| transform.get(*p)).collect());

        self.elapsed = self.elapsed.saturating_add(dt);
        let done = self.elapsed >= self.spec.duration;
        let t = if done {
            1.0
        } else {
            self.elapsed.as_secs_f64() / self.spec.duration.as_secs_f64()
        };
        let eased = (self.spec.easing)(t);

        for ((prop, to), start) in props.iter().zip(from.iter()) {
            let value = if done {
                *to
            } else {
                start + (to - start) * eased
            };
            transform.set(*prop, value);
        }

        if let Some(update) = self.spec.on_update.as_mut() {
            update(t);
        }

        if done {
            self.finished = true;
            if let Some(complete) = self.spec.on_complete.take() {
                complete();
            }
        }
        done
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Identifies a tween or timeline started on a [`TweenEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

impl TweenHandle {
    #[inline]
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

enum Job<K> {
    Tween(Tween<K>),
    Timeline(Timeline<K>),
}

/// Runs tweens and timelines against a [`TargetStore`].
pub struct TweenEngine<K> {
    jobs: Vec<(TweenHandle, Job<K>)>,
    next_id: u64,
    paused: bool,
}

impl<K> fmt::Debug for TweenEngine<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenEngine")
            .field("active", &self.jobs.len())
            .field("paused", &self.paused)
            .finish()
    }
}

impl<K: Copy + Eq + Hash> TweenEngine<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            paused: false,
        }
    }

    fn next_handle(&mut self) -> TweenHandle {
        let handle = TweenHandle(self.next_id);
        self.next_id += 1;
        handle
    }

    /// Start a single tween. It first moves on the next [`tick`](Self::tick).
    pub fn animate(&mut self, spec: TweenSpec<K>) -> TweenHandle {
        let handle = self.next_handle();
        debug!(
            target: "stagehand.tween",
            handle = handle.0,
            duration_ms = spec.duration.as_millis() as u64,
            props = spec.props.len(),
            "tween started"
        );
        self.jobs.push((handle, Job::Tween(Tween::new(spec))));
        handle
    }

    /// Start a timeline from its beginning.
    pub fn play(&mut self, mut timeline: Timeline<K>) -> TweenHandle {
        let handle = self.next_handle();
        debug!(
            target: "stagehand.tween",
            handle = handle.0,
            steps = timeline.step_count(),
            duration_ms = timeline.duration().as_millis() as u64,
            "timeline started"
        );
        timeline.play();
        self.jobs.push((handle, Job::Timeline(timeline)));
        handle
    }

    /// Stop a tween or timeline without running its completion callback.
    ///
    /// Properties keep whatever value the last tick wrote.
    pub fn cancel(&mut self, handle: TweenHandle) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|(h, _)| *h != handle);
        let removed = self.jobs.len() != before;
        if removed {
            debug!(target: "stagehand.tween", handle = handle.0, "tween cancelled");
        }
        removed
    }

    /// Cancel everything. Returns how many jobs were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.jobs.len();
        self.jobs.clear();
        n
    }

    #[must_use]
    pub fn is_active(&self, handle: TweenHandle) -> bool {
        self.jobs.iter().any(|(h, _)| *h == handle)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }

    /// Linear progress of an active job, `None` once it is gone.
    #[must_use]
    pub fn progress(&self, handle: TweenHandle) -> Option<f64> {
        self.jobs
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, job)| match job {
                Job::Tween(t) => t.progress(),
                Job::Timeline(tl) => tl.progress(),
            })
    }

    /// Freeze every job; ticks are ignored until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance every job by `dt`.
    ///
    /// Returns the handles that completed on this tick, in start order.
    pub fn tick(&mut self, dt: Duration, store: &mut TargetStore<K>) -> Vec<TweenHandle> {
        if self.paused {
            return Vec::new();
        }

        let mut completed = Vec::new();
        for (handle, job) in &mut self.jobs {
            let done = match job {
                Job::Tween(tween) => tween.advance(dt, store),
                Job::Timeline(timeline) => timeline.advance(dt, store),
            };
            if done {
                completed.push(*handle);
            }
        }

        if !completed.is_empty() {
            self.jobs.retain(|(h, _)| !completed.contains(h));
            debug!(
                target: "stagehand.tween",
                completed = completed.len(),
                remaining = self.jobs.len(),
                "tweens completed"
            );
        }
        completed
    }
}

impl<K: Copy + Eq + Hash> Default for TweenEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{StartOffset, ease_in_out, ease_out_bounce};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_250: Duration = Duration::from_millis(250);
    const MS_500: Duration = Duration::from_millis(500);
    const SEC_1: Duration = Duration::from_secs(1);

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Obj {
        Box,
        Cam,
    }

    fn store() -> TargetStore<Obj> {
        let mut s = TargetStore::new();
        s.insert(Obj::Box, Transform::at(Vec3::new(0.0, 10.0, 0.0)));
        s.insert(Obj::Cam, Transform::at(Vec3::new(0.0, 0.0, 5.0)));
        s
    }

    fn y(s: &TargetStore<Obj>, k: Obj) -> f64 {
        s.get(k).map(|t| t.position.y).unwrap()
    }

    #[test]
    fn tween_interpolates_linearly() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        engine.animate(TweenSpec::new(Obj::Box, SEC_1).to(Prop::Y, 0.0));

        engine.tick(MS_250, &mut s);
        assert!((y(&s, Obj::Box) - 7.5).abs() < 1e-9);
        engine.tick(MS_250, &mut s);
        assert!((y(&s, Obj::Box) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn completion_lands_exactly_on_end_values() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let h = engine.animate(
            TweenSpec::new(Obj::Box, Duration::from_millis(1200))
                .to(Prop::Y, -6.0)
                .easing(ease_out_bounce),
        );
        let mut done = Vec::new();
        for _ in 0..80 {
            done.extend(engine.tick(Duration::from_millis(16), &mut s));
        }
        assert_eq!(done, vec![h]);
        assert_eq!(y(&s, Obj::Box), -6.0);
        assert!(!engine.is_active(h));
    }

    #[test]
    fn on_complete_fires_exactly_once() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        engine.animate(
            TweenSpec::new(Obj::Box, MS_100)
                .to(Prop::Y, 1.0)
                .on_complete(move || c.set(c.get() + 1)),
        );
        for _ in 0..10 {
            engine.tick(MS_100, &mut s);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cancel_never_fires_on_complete() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let h = engine.animate(
            TweenSpec::new(Obj::Box, SEC_1)
                .to(Prop::Y, 0.0)
                .on_complete(move || f.set(true)),
        );
        engine.tick(MS_500, &mut s);
        assert!(engine.cancel(h));
        assert!(!engine.cancel(h));
        engine.tick(SEC_1, &mut s);
        assert!(!fired.get());
        assert!((y(&s, Obj::Box) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn on_update_reports_linear_progress() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.animate(
            TweenSpec::new(Obj::Box, SEC_1)
                .to(Prop::Y, 0.0)
                .easing(ease_in_out)
                .on_update(move |t| sink.borrow_mut().push(t)),
        );
        for _ in 0..4 {
            engine.tick(MS_250, &mut s);
        }
        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert!((seen[0] - 0.25).abs() < 1e-9);
        assert_eq!(seen[3], 1.0);
    }

    #[test]
    fn zero_duration_completes_on_first_tick() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let h = engine.animate(TweenSpec::new(Obj::Box, Duration::ZERO).to(Prop::Opacity, 0.0));
        assert_eq!(engine.tick(Duration::ZERO, &mut s), vec![h]);
        assert_eq!(s.get(Obj::Box).unwrap().opacity, 0.0);
    }

    #[test]
    fn start_values_are_captured_lazily() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let spec = TweenSpec::new(Obj::Box, MS_100).to(Prop::Y, 0.0);
        s.transform_mut(Obj::Box).position.y = 2.0;
        engine.animate(spec);
        engine.tick(Duration::from_millis(50), &mut s);
        assert!((y(&s, Obj::Box) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn completed_handles_reported_in_start_order() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let a = engine.animate(TweenSpec::new(Obj::Cam, MS_100).to(Prop::Z, 1.0));
        let b = engine.animate(TweenSpec::new(Obj::Box, MS_100).to(Prop::Y, 1.0));
        assert_eq!(engine.tick(MS_100, &mut s), vec![a, b]);
    }

    #[test]
    fn pause_freezes_all_jobs() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let h = engine.animate(TweenSpec::new(Obj::Box, SEC_1).to(Prop::Y, 0.0));
        engine.tick(MS_500, &mut s);
        engine.pause();
        assert!(engine.tick(SEC_1, &mut s).is_empty());
        assert!((y(&s, Obj::Box) - 5.0).abs() < 1e-9);
        engine.resume();
        assert_eq!(engine.tick(MS_500, &mut s), vec![h]);
    }

    #[test]
    fn plays_timelines_alongside_tweens() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        let tl = Timeline::new()
            .to(TweenSpec::new(Obj::Cam, MS_500).to(Prop::Z, 10.0), StartOffset::At(Duration::ZERO))
            .to(TweenSpec::new(Obj::Box, MS_500).to(Prop::Y, 0.0), StartOffset::At(Duration::ZERO));
        let h = engine.play(tl);
        assert!((engine.progress(h).unwrap() - 0.0).abs() < 1e-12);
        engine.tick(MS_250, &mut s);
        assert!((y(&s, Obj::Box) - 5.0).abs() < 1e-9);
        assert!((s.get(Obj::Cam).unwrap().position.z - 7.5).abs() < 1e-9);
        assert_eq!(engine.tick(MS_250, &mut s), vec![h]);
        assert_eq!(engine.progress(h), None);
    }

    #[test]
    fn cancel_all_drops_everything() {
        let mut s = store();
        let mut engine = TweenEngine::new();
        engine.animate(TweenSpec::new(Obj::Box, SEC_1).to(Prop::Y, 0.0));
        engine.animate(TweenSpec::new(Obj::Cam, SEC_1).to(Prop::Z, 0.0));
        assert_eq!(engine.cancel_all(), 2);
        assert_eq!(engine.active_count(), 0);
        assert!(engine.tick(SEC_1, &mut s).is_empty());
    }

    #[test]
    fn spec_to_replaces_same_prop() {
        let spec = TweenSpec::new(Obj::Box, MS_100).to(Prop::Y, 1.0).to(Prop::Y, 2.0);
        assert_eq!(spec.props, vec![(Prop::Y, 2.0)]);
    }

    #[test]
    fn transform_get_set_round_trip_per_prop() {
        let mut t = Transform::default();
        let props = [
            Prop::X,
            Prop::Y,
            Prop::Z,
            Prop::RotX,
            Prop::RotY,
            Prop::RotZ,
            Prop::LookX,
            Prop::LookY,
            Prop::LookZ,
            Prop::Scale,
            Prop::Opacity,
        ];
        for (i, p) in props.iter().enumerate() {
            t.set(*p, i as f64);
        }
        for (i, p) in props.iter().enumerate() {
            assert_eq!(t.get(*p), i as f64);
        }
    }
}
