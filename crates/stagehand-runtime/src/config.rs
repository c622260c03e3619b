#![forbid(unsafe_code)]

//! Scene tuning as data.
//!
//! Every constant the choreography depends on lives in [`SceneConfig`], which
//! can be loaded from TOML or JSON (with the `config-files` feature).
//!
//! # Loading
//!
//! ```toml
//! [hold]
//! duration_ms = 3000
//!
//! [gesture]
//! friction = 0.9
//! ```
//!
//! ```rust,ignore
//! let config = SceneConfig::from_toml_file("scene.toml")?;
//! let config = SceneConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `SceneConfig::default()` reproduces the built-in values of each
//! component, so a missing file, a missing section or a missing field all
//! fall back to the stock scene.

#[cfg(feature = "config-files")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};
use stagehand_core::animation::CascadeTiming;
use stagehand_core::gesture::GestureConfig;
use stagehand_core::hold::HoldConfig;
use thiserror::Error;

use crate::boot::BootConfig;
use crate::charger::ChargerConfig;

// ---------------------------------------------------------------------------
// Top-level SceneConfig
// ---------------------------------------------------------------------------

/// All scene tuning.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct SceneConfig {
    /// Background cascade stagger.
    pub background: BackgroundSettings,
    /// Power-button hold.
    pub hold: HoldSettings,
    /// Drag, momentum and snap.
    pub gesture: GestureSettings,
    /// Charger geometry.
    pub charger: ChargerConfig,
    /// Fixed delays and durations of the scripted sequence.
    pub timing: TimingSettings,
    /// Loading sequence.
    pub boot: BootConfig,
    /// Subtitle fades.
    pub subtitles: SubtitleSettings,
}

impl SceneConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.checked()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.checked()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Pick TOML or JSON by file extension (`.json` is JSON, anything else
    /// TOML).
    #[cfg(feature = "config-files")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Serialize to TOML.
    #[cfg(feature = "config-files")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[cfg(feature = "config-files")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Background
        let bg = &self.background;
        if bg.ramp_ms == 0 {
            errors.push("background.ramp_ms must be > 0".into());
        }
        if bg.total_ms == 0 {
            errors.push("background.total_ms must be > 0".into());
        }

        // Hold
        if self.hold.duration_ms == 0 {
            errors.push("hold.duration_ms must be > 0".into());
        }
        if self.hold.progress_interval_ms > self.hold.duration_ms {
            errors.push(format!(
                "hold.progress_interval_ms ({}) must not exceed hold.duration_ms ({})",
                self.hold.progress_interval_ms, self.hold.duration_ms
            ));
        }

        // Gesture
        let g = &self.gesture;
        if !(g.friction > 0.0 && g.friction < 1.0) {
            errors.push(format!("gesture.friction must be in (0, 1), got {}", g.friction));
        }
        if !(g.min_velocity > 0.0) {
            errors.push(format!(
                "gesture.min_velocity must be > 0, got {}",
                g.min_velocity
            ));
        }
        if !(0.0..=1.0).contains(&g.wall_damping) {
            errors.push(format!(
                "gesture.wall_damping must be in [0, 1], got {}",
                g.wall_damping
            ));
        }
        if !(g.max_velocity >= g.min_velocity) {
            errors.push("gesture.max_velocity must be >= gesture.min_velocity".into());
        }
        if !(g.frame_ms > 0.0) {
            errors.push(format!("gesture.frame_ms must be > 0, got {}", g.frame_ms));
        }
        if !(g.release_window_ms >= 0.0) {
            errors.push(format!(
                "gesture.release_window_ms must be >= 0, got {}",
                g.release_window_ms
            ));
        }

        // Charger
        let c = &self.charger;
        if !(c.valley_min_x < c.valley_max_x) {
            errors.push("charger.valley_min_x must be < charger.valley_max_x".into());
        }
        if !(c.x_min < c.x_max) {
            errors.push("charger.x_min must be < charger.x_max".into());
        }
        if !(c.free_cap_y < c.lock_y) {
            errors.push("charger.free_cap_y must be < charger.lock_y".into());
        }
        if !(c.min_y < c.free_cap_y) {
            errors.push("charger.min_y must be < charger.free_cap_y".into());
        }

        // Timing
        for (name, ms) in self.timing.named() {
            if ms == 0 {
                errors.push(format!("timing.{name} must be > 0"));
            }
        }

        // Boot
        let b = &self.boot;
        if !(b.fill_rate > 0.0) || !(b.helped_fill_rate > 0.0) {
            errors.push("boot fill rates must be > 0".into());
        }
        if !(b.stall_at > 0.0 && b.stall_at < 1.0) {
            errors.push(format!("boot.stall_at must be in (0, 1), got {}", b.stall_at));
        }
        if !(b.threshold_deg > 0.0 && b.threshold_deg <= 90.0) {
            errors.push(format!(
                "boot.threshold_deg must be in (0, 90], got {}",
                b.threshold_deg
            ));
        }

        // Subtitles
        if self.subtitles.fade_in_ms == 0 {
            errors.push("subtitles.fade_in_ms must be > 0".into());
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Background cascade stagger, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct BackgroundSettings {
    pub per_layer_delay_ms: u64,
    pub ramp_ms: u64,
    pub total_ms: u64,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        let timing = CascadeTiming::default();
        Self {
            per_layer_delay_ms: timing.per_layer_delay.as_millis() as u64,
            ramp_ms: timing.ramp.as_millis() as u64,
            total_ms: timing.total.as_millis() as u64,
        }
    }
}

impl BackgroundSettings {
    #[must_use]
    pub fn to_cascade_timing(&self) -> CascadeTiming {
        CascadeTiming {
            per_layer_delay: Duration::from_millis(self.per_layer_delay_ms),
            ramp: Duration::from_millis(self.ramp_ms),
            total: Duration::from_millis(self.total_ms),
        }
    }
}

/// Power-button hold, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct HoldSettings {
    pub duration_ms: u64,
    pub progress_interval_ms: u64,
}

impl Default for HoldSettings {
    fn default() -> Self {
        let hold = HoldConfig::default();
        Self {
            duration_ms: hold.duration.as_millis() as u64,
            progress_interval_ms: hold.progress_interval.as_millis() as u64,
        }
    }
}

impl HoldSettings {
    #[must_use]
    pub fn to_hold_config(&self) -> HoldConfig {
        HoldConfig {
            duration: Duration::from_millis(self.duration_ms),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
        }
    }
}

/// Drag physics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct GestureSettings {
    pub friction: f64,
    pub min_velocity: f64,
    pub wall_damping: f64,
    pub max_velocity: f64,
    pub frame_ms: f64,
    pub release_window_ms: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        let g = GestureConfig::default();
        Self {
            friction: g.friction,
            min_velocity: g.min_velocity,
            wall_damping: g.wall_damping,
            max_velocity: g.max_velocity,
            frame_ms: g.frame_ms,
            release_window_ms: g.release_window_ms,
        }
    }
}

impl GestureSettings {
    #[must_use]
    pub fn to_gesture_config(&self) -> GestureConfig {
        GestureConfig {
            friction: self.friction,
            min_velocity: self.min_velocity,
            wall_damping: self.wall_damping,
            max_velocity: self.max_velocity,
            frame_ms: self.frame_ms,
            release_window_ms: self.release_window_ms,
        }
    }
}

/// Fixed beats of the script, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct TimingSettings {
    /// Phone drop after boot.
    pub phone_drop_ms: u64,
    /// Dead-battery blink sequence.
    pub blink_ms: u64,
    /// Wait between the blink and the charge prompt.
    pub charge_prompt_ms: u64,
    /// Charger body sliding into reach.
    pub charger_reveal_ms: u64,
    /// Camera returning home after the charger locks.
    pub camera_home_ms: u64,
    /// Green battery flash before the lock screen.
    pub battery_flash_ms: u64,
    /// Charger unplug at the start of the projects transition.
    pub unplug_ms: u64,
    /// Pause between the cascade and the camera move.
    pub post_cascade_ms: u64,
    /// Camera and phone move to the projects view.
    pub camera_move_ms: u64,
    /// Pause between the camera move and the card reveal.
    pub card_reveal_delay_ms: u64,
    /// Project card fade.
    pub card_fade_ms: u64,
    /// Pause between the reverse cascade and the reverse camera move.
    pub reverse_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            phone_drop_ms: 1200,
            blink_ms: 3500,
            charge_prompt_ms: 1500,
            charger_reveal_ms: 800,
            camera_home_ms: 1500,
            battery_flash_ms: 1000,
            unplug_ms: 800,
            post_cascade_ms: 500,
            camera_move_ms: 2000,
            card_reveal_delay_ms: 500,
            card_fade_ms: 600,
            reverse_delay_ms: 500,
        }
    }
}

impl TimingSettings {
    fn named(&self) -> [(&'static str, u64); 12] {
        [
            ("phone_drop_ms", self.phone_drop_ms),
            ("blink_ms", self.blink_ms),
            ("charge_prompt_ms", self.charge_prompt_ms),
            ("charger_reveal_ms", self.charger_reveal_ms),
            ("camera_home_ms", self.camera_home_ms),
            ("battery_flash_ms", self.battery_flash_ms),
            ("unplug_ms", self.unplug_ms),
            ("post_cascade_ms", self.post_cascade_ms),
            ("camera_move_ms", self.camera_move_ms),
            ("card_reveal_delay_ms", self.card_reveal_delay_ms),
            ("card_fade_ms", self.card_fade_ms),
            ("reverse_delay_ms", self.reverse_delay_ms),
        ]
    }

    /// Milliseconds as a [`Duration`].
    #[must_use]
    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// Subtitle fades, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct SubtitleSettings {
    pub fade_in_ms: u64,
    /// Added to every line's own delay.
    pub extra_delay_ms: u64,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            fade_in_ms: 400,
            extra_delay_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a scene configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config-files")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config-files")]
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[cfg(feature = "config-files")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
