#![forbid(unsafe_code)]

//! The loading sequence that opens the scene.
//!
//! The bar fills to a stall point and the scripted "loading failed" beat
//! appears. The visitor has to drag a rotator past a threshold angle to help;
//! the bar then fills to the end, the boot subtitles play and the sequence
//! completes.
//!
//! # Invariants
//!
//! 1. [`LoadingPhase`] only moves forward:
//!    `Loading → ErrorShown → Helped → FinalSubtitles → Complete`.
//! 2. The rotator angle is clamped to `[0, π/2]`.
//! 3. Progress never exceeds the stall point before the visitor helps.

use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};
use stagehand_core::event::{PointerEvent, PointerKind};
use stagehand_core::gesture::{Axis, DragTracker, GestureConfig};
use tracing::info;

/// Where the loading narrative is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadingPhase {
    Loading,
    ErrorShown,
    Helped,
    FinalSubtitles,
    Complete,
}

/// Loading bar tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct BootConfig {
    /// Bar fill speed before the stall, fraction per second (default: 0.5).
    pub fill_rate: f64,
    /// Fraction at which loading "fails" (default: 0.7).
    pub stall_at: f64,
    /// Fill speed after the visitor helped (default: 1.0).
    pub helped_fill_rate: f64,
    /// Rotator angle that counts as help, in degrees (default: 80).
    pub threshold_deg: f64,
    /// Radians per pointer pixel on the rotator (default: 0.01).
    pub rotate_sensitivity: f64,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            fill_rate: 0.5,
            stall_at: 0.7,
            helped_fill_rate: 1.0,
            threshold_deg: 80.0,
            rotate_sensitivity: 0.01,
        }
    }
}

/// Loading bar, rotator and phase.
#[derive(Debug, Clone)]
pub struct BootSequence {
    config: BootConfig,
    phase: LoadingPhase,
    progress: f64,
    rotator: DragTracker,
}

impl BootSequence {
    #[must_use]
    pub fn new(config: BootConfig, gesture: GestureConfig) -> Self {
        Self {
            config,
            phase: LoadingPhase::Loading,
            progress: 0.0,
            rotator: DragTracker::new(Axis::X, gesture)
                .with_sensitivity(config.rotate_sensitivity)
                .with_bounds(0.0, FRAC_PI_2),
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> LoadingPhase {
        self.phase
    }

    /// Bar fill in `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Rotator angle in radians.
    #[inline]
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.rotator.value()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == LoadingPhase::Complete
    }

    fn enter(&mut self, next: LoadingPhase) -> Option<LoadingPhase> {
        if next <= self.phase {
            return None;
        }
        info!(target: "stagehand.director", from = ?self.phase, to = ?next, "loading phase");
        self.phase = next;
        Some(next)
    }

    /// Fill the bar and coast the rotator. Returns the phase entered on this
    /// tick, if any.
    pub fn tick(&mut self, dt: Duration) -> Option<LoadingPhase> {
        let secs = dt.as_secs_f64();
        self.rotator.step_frame();
        match self.phase {
            LoadingPhase::Loading => {
                self.progress = (self.progress + self.config.fill_rate * secs).min(self.config.stall_at);
                if self.progress >= self.config.stall_at {
                    return self.enter(LoadingPhase::ErrorShown);
                }
                None
            }
            LoadingPhase::Helped => {
                self.progress = (self.progress + self.config.helped_fill_rate * secs).min(1.0);
                if self.progress >= 1.0 {
                    return self.enter(LoadingPhase::FinalSubtitles);
                }
                None
            }
            LoadingPhase::ErrorShown => self.check_rotation(),
            LoadingPhase::FinalSubtitles | LoadingPhase::Complete => None,
        }
    }

    fn check_rotation(&mut self) -> Option<LoadingPhase> {
        if self.phase == LoadingPhase::ErrorShown
            && self.rotator.value() >= self.config.threshold_deg.to_radians()
        {
            return self.enter(LoadingPhase::Helped);
        }
        None
    }

    /// Route a pointer sample to the rotator.
    pub fn pointer(&mut self, event: &PointerEvent) -> Option<LoadingPhase> {
        match event.kind {
            PointerKind::Down if event.over_target => {
                self.rotator.on_drag_start(event.pos, event.time);
                None
            }
            PointerKind::Down => None,
            PointerKind::Move => {
                self.rotator.on_drag_move(event.pos, event.time);
                self.check_rotation()
            }
            PointerKind::Up | PointerKind::Leave | PointerKind::Cancel => {
                self.rotator.on_drag_end(event.pos, event.time);
                self.check_rotation()
            }
        }
    }

    /// The boot subtitles finished.
    pub fn finish_subtitles(&mut self) -> Option<LoadingPhase> {
        if self.phase != LoadingPhase::FinalSubtitles {
            return None;
        }
        self.enter(LoadingPhase::Complete)
    }
}

impl Default for BootSequence {
    fn default() -> Self {
        Self::new(BootConfig::default(), GestureConfig::default())
    }
}
