#![forbid(unsafe_code)]

//! Stagehand public facade crate.
//!
//! Re-exports the choreography primitives from `stagehand-core` and, with
//! the `runtime` feature (on by default), the director and its services
//! from `stagehand-runtime`. [`Scene`] bundles a bus and a director for the
//! common case of driving one scene.

use std::fmt;
#[cfg(feature = "runtime")]
use std::io::Write;
#[cfg(feature = "runtime")]
use std::time::Duration;

// --- Animation re-exports --------------------------------------------------

pub use stagehand_core::animation::{
    Animation, CascadeDirection, CascadeTiming, EasingFn, Fade, LAYERS, PlaybackState, Prop,
    StaggerCascade, StartOffset, TargetStore, Timeline, Transform, TweenEngine, TweenHandle,
    TweenSpec,
};

// --- Background re-exports -------------------------------------------------

pub use stagehand_core::background::{
    ColorPair, ColorParseError, Palette, Rgb, Rgba, build_background, interpolate,
};

// --- Input re-exports ------------------------------------------------------

pub use stagehand_core::event::{PointerEvent, PointerKind, PointerSource};
pub use stagehand_core::geometry::{Point, Vec3};
pub use stagehand_core::gesture::{
    Axis, DragTracker, GestureConfig, Momentum, ReleaseOutcome, SlotPicker, SnapGrid,
};
pub use stagehand_core::hold::{HoldConfig, HoldEvent, HoldTimer};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use stagehand_runtime::{
    AppId, ConfigError, Control, Director, EventBus, LoadingPhase, PhonePhase, SceneConfig,
    SceneEvent, SceneSnapshot, SceneTarget, Stage, Subscription, Topic,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for stagehand apps.
#[derive(Debug)]
pub enum Error {
    /// I/O failure while writing scene output.
    Io(std::io::Error),
    /// Scene configuration could not be loaded or is invalid.
    #[cfg(feature = "runtime")]
    Config(ConfigError),
    /// A palette colour string did not parse.
    Color(ColorParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            Self::Color(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<ColorParseError> for Error {
    fn from(err: ColorParseError) -> Self {
        Self::Color(err)
    }
}

/// Standard result type for stagehand APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse one gradient layer from a hex start colour and an `rgba(..)` end.
pub fn color_pair(start: &str, end: &str) -> Result<ColorPair> {
    Ok(ColorPair::new(start.parse()?, end.parse()?))
}

// --- Scene facade ---------------------------------------------------------

/// A director mounted on its own bus.
#[cfg(feature = "runtime")]
pub struct Scene {
    bus: EventBus,
    director: Director,
}

#[cfg(feature = "runtime")]
impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("director", &self.director)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "runtime")]
impl Scene {
    /// Mount a scene with `config`.
    #[must_use]
    pub fn new(config: SceneConfig) -> Self {
        let bus = EventBus::new();
        let director = Director::new(config, bus.clone());
        Self { bus, director }
    }

    /// Mount a scene configured from a TOML or JSON file.
    #[cfg(feature = "config-files")]
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = SceneConfig::from_file(path)?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn director(&self) -> &Director {
        &self.director
    }

    pub fn director_mut(&mut self) -> &mut Director {
        &mut self.director
    }

    /// Tick in `frame` steps until at least `total` has passed. Returns the
    /// number of frames run.
    pub fn advance(&mut self, total: Duration, frame: Duration) -> usize {
        if frame.is_zero() {
            return 0;
        }
        let mut frames = 0;
        let mut t = Duration::ZERO;
        while t < total {
            self.director.tick(frame);
            t += frame;
            frames += 1;
        }
        frames
    }

    /// Write a one-line human summary of the current state.
    pub fn write_summary(&self, out: &mut impl Write) -> Result<()> {
        let snap = self.director.snapshot();
        writeln!(
            out,
            "{:>8}ms  {:<18} phone={:?} layers={:?}",
            snap.time.as_millis(),
            format!("{:?}", snap.stage),
            snap.phone_phase,
            snap.background_progress
        )?;
        Ok(())
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Animation, CascadeDirection, Error, PointerEvent, Point, Result, TweenEngine, TweenSpec,
        Vec3,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{Control, Director, EventBus, Scene, SceneConfig, SceneEvent, Stage};

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use stagehand_core as core;
#[cfg(feature = "runtime")]
pub use stagehand_runtime as runtime;
