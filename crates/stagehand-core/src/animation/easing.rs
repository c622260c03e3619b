#![forbid(unsafe_code)]

//! Easing curves.
//!
//! Every curve maps `t ∈ [0, 1]` to an eased progress with `f(0) = 0` and
//! `f(1) = 1`. Inputs outside the unit interval are clamped first.

/// An easing curve.
pub type EasingFn = fn(f64) -> f64;

#[inline]
fn unit(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

#[must_use]
pub fn linear(t: f64) -> f64 {
    unit(t)
}

/// Quadratic ease-in.
#[must_use]
pub fn ease_in(t: f64) -> f64 {
    let t = unit(t);
    t * t
}

/// Quadratic ease-out.
#[must_use]
pub fn ease_out(t: f64) -> f64 {
    let t = unit(t);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out.
#[must_use]
pub fn ease_in_out(t: f64) -> f64 {
    let t = unit(t);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[must_use]
pub fn ease_in_cubic(t: f64) -> f64 {
    let t = unit(t);
    t * t * t
}

#[must_use]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = unit(t);
    1.0 - (1.0 - t).powi(3)
}

#[must_use]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = unit(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Bounce at the end, used for objects dropping onto a surface.
#[must_use]
pub fn ease_out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    let t = unit(t);
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
