#![forbid(unsafe_code)]

//! Core choreography primitives for Stagehand.
//!
//! Everything in this crate is single-threaded, deterministic and free of
//! I/O. Time is always injected: animations advance by a caller-supplied
//! `Duration`, gesture and hold sessions read the `Instant` stamped on each
//! pointer event.
//!
//! # Modules
//!
//! - [`animation`]: easing curves, the tween engine, timelines and the
//!   staggered layer cascade.
//! - [`background`]: layered gradient palettes and their interpolation.
//! - [`gesture`]: drag sessions, momentum decay, snapping and slot pickers.
//! - [`hold`]: press-and-hold activation timer.
//! - [`event`] and [`geometry`]: pointer input and vector types.

pub mod animation;
pub mod background;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod hold;
