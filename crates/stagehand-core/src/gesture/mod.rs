#![forbid(unsafe_code)]

//! Drag, momentum and snap.
//!
//! The pieces compose bottom-up:
//!
//! - [`DragSession`]: ephemeral pointer bookkeeping from press to release.
//! - [`DragTracker`]: maps pointer motion onto one clamped scalar value and
//!   estimates its velocity in units per 60fps frame.
//! - [`Momentum`]: post-release decay of that velocity with wall damping.
//! - [`SnapGrid`]: nearest-slot search with a commit threshold, linear or
//!   circular.
//! - [`SlotPicker`]: tracker + momentum + snap, as a wheel picker or a ring
//!   selector.
//!
//! # Invariants
//!
//! 1. Velocities are expressed per reference frame of [`FRAME_MS`]
//!    milliseconds, so values are comparable across input rates.
//! 2. Every velocity entering momentum is clamped to `max_velocity`.
//! 3. Momentum always terminates: friction is clamped below 1 and the stop
//!    threshold above 0.

pub mod drag;
pub mod momentum;
pub mod picker;
pub mod snap;

pub use drag::{Axis, DragSession, DragTracker, ReleaseOutcome};
pub use momentum::{Momentum, frames_to_rest};
pub use picker::{PickerStep, SlotPicker};
pub use snap::SnapGrid;

/// Length of the reference frame velocities are normalized to.
pub const FRAME_MS: f64 = 16.67;

/// Tuning shared by every drag surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Per-frame velocity multiplier during momentum (default: 0.92).
    pub friction: f64,
    /// Speed below which motion stops, in units per frame (default: 0.1).
    pub min_velocity: f64,
    /// Extra multiplier applied when momentum hits a bound (default: 0.3).
    pub wall_damping: f64,
    /// Largest speed accepted from input, in units per frame (default: 60.0).
    pub max_velocity: f64,
    /// Reference frame length in milliseconds (default: [`FRAME_MS`]).
    pub frame_ms: f64,
    /// A release this soon after the last move keeps that move's velocity
    /// (default: 80.0).
    pub release_window_ms: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            friction: 0.92,
            min_velocity: 0.1,
            wall_damping: 0.3,
            max_velocity: 60.0,
            frame_ms: FRAME_MS,
            release_window_ms: 80.0,
        }
    }
}
