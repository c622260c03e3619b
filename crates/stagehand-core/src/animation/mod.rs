#![forbid(unsafe_code)]

//! Time-driven animation primitives.
//!
//! Two families live here:
//!
//! - Self-contained [`Animation`]s ([`Fade`], [`StaggerCascade`]) that own
//!   their progress and are ticked with a `Duration`.
//! - The [`TweenEngine`], which mutates properties of keyed scene targets
//!   held in a [`TargetStore`], either one [`TweenSpec`] at a time or as a
//!   composed [`Timeline`].

use std::time::Duration;

pub mod cascade;
pub mod easing;
mod fade;
pub mod timeline;
pub mod tween;

pub use cascade::{CascadeDirection, CascadeTiming, LAYERS, StaggerCascade};
pub use easing::{
    EasingFn, ease_in, ease_in_cubic, ease_in_out, ease_in_out_cubic, ease_out, ease_out_bounce,
    ease_out_cubic, linear,
};
pub use fade::Fade;
pub use timeline::{PlaybackState, StartOffset, Timeline};
pub use tween::{Prop, TargetStore, Transform, TweenEngine, TweenHandle, TweenSpec};

/// A value that progresses over time.
///
/// Implementors are advanced with [`tick`](Animation::tick) and report a
/// normalized [`value`](Animation::value) in `[0.0, 1.0]`.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current normalized value.
    fn value(&self) -> f64;

    /// Return to the initial state.
    fn reset(&mut self);

    /// Time ticked past the end of the animation, if any.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}
