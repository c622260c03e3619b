#![forbid(unsafe_code)]

//! Post-release velocity decay.

use super::GestureConfig;

const MAX_FRICTION: f64 = 0.999;
const MIN_STOP_VELOCITY: f64 = 1e-6;

/// Frame-stepped momentum for one scalar value.
///
/// Each [`step`](Momentum::step) moves the value by the current velocity and
/// multiplies the velocity by `friction`. Hitting a bound clamps the value
/// and multiplies the velocity by `wall_damping` as well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Momentum {
    velocity: f64,
    friction: f64,
    min_velocity: f64,
    wall_damping: f64,
    bounds: Option<(f64, f64)>,
    frames: u32,
}

impl Momentum {
    /// Start from `velocity` (units per frame), clamped to the config's
    /// `max_velocity`.
    #[must_use]
    pub fn new(velocity: f64, config: &GestureConfig) -> Self {
        let max = config.max_velocity.abs();
        Self {
            velocity: if velocity.is_finite() {
                velocity.clamp(-max, max)
            } else {
                0.0
            },
            friction: config.friction.clamp(0.0, MAX_FRICTION),
            min_velocity: config.min_velocity.max(MIN_STOP_VELOCITY),
            wall_damping: config.wall_damping.clamp(0.0, 1.0),
            bounds: None,
            frames: 0,
        }
    }

    /// Hard bounds for the value (builder pattern).
    #[must_use]
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min.min(max), min.max(max)));
        self
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Frames stepped so far.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Whether the velocity has decayed below the stop threshold.
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.velocity.abs() < self.min_velocity
    }

    /// Advance one frame from `value`, returning the new value.
    ///
    /// A settled momentum returns `value` unchanged.
    pub fn step(&mut self, value: f64) -> f64 {
        if self.is_settled() {
            return value;
        }
        let mut next = value + self.velocity;
        self.velocity *= self.friction;
        if let Some((min, max)) = self.bounds {
            if next < min || next > max {
                next = next.clamp(min, max);
                self.velocity *= self.wall_damping;
            }
        }
        self.frames += 1;
        next
    }
}

/// Frames of free decay needed for `v0` to drop below `min_velocity`.
///
/// Matches the number of [`Momentum::step`] calls when no bound is hit.
#[must_use]
pub fn frames_to_rest(v0: f64, friction: f64, min_velocity: f64) -> u32 {
    let friction = friction.clamp(f64::MIN_POSITIVE, MAX_FRICTION);
    let min_velocity = min_velocity.max(MIN_STOP_VELOCITY);
    let v0 = v0.abs();
    if v0 < min_velocity {
        return 0;
    }
    let n = (min_velocity / v0).ln() / friction.ln();
    // At exact powers the velocity equals the threshold, which is not yet below it.
    let frames = n.ceil();
    let frames = if frames == n { frames + 1.0 } else { frames };
    frames as u32
}
