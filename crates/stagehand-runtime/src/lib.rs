#![forbid(unsafe_code)]

//! Event plumbing and scene orchestration for stagehand.
//!
//! The [`Director`] owns the scripted narrative: boot, unlock, the power
//! hold, charging, the projects transition and its reset. It is built from
//! the pure pieces in `stagehand-core` plus the runtime services here:
//!
//! - [`EventBus`]: typed publish/subscribe with guard-based unsubscription.
//! - [`TimerQueue`] and [`StepSequence`]: delayed work on a virtual clock.
//! - [`OperationLocks`]: try-acquire guards for operations that must not
//!   overlap.
//! - [`CancellationSource`]: one switch that voids a whole chain of work.
//! - [`SubtitleBoard`]: per-app subtitle chains.
//! - [`BootSequence`] and [`ChargerRig`]: the two interactive set pieces.
//! - [`SceneConfig`]: every tuning constant in one place.
//!
//! Everything is single-threaded and driven by explicit `tick` calls, so a
//! whole walkthrough can be replayed deterministically.

pub mod boot;
pub mod bus;
pub mod cancellation;
pub mod charger;
pub mod config;
pub mod director;
pub mod lock;
pub mod subtitles;
pub mod timers;

pub use boot::{BootConfig, BootSequence, LoadingPhase};
pub use bus::{AppId, EventBus, SceneEvent, Subscription, Topic};
pub use cancellation::{CancellationSource, CancellationToken};
pub use charger::{ChargerConfig, ChargerRig, ChargerStep};
pub use config::{
    BackgroundSettings, ConfigError, GestureSettings, HoldSettings, SceneConfig, SubtitleSettings,
    TimingSettings,
};
pub use director::{Control, Director, PhonePhase, SceneSnapshot, SceneTarget, Stage};
pub use lock::{ExclusiveLock, Operation, OperationLocks};
pub use subtitles::{SubtitleBoard, SubtitleChain, SubtitleCue, SubtitleEntry, SubtitleSource};
pub use timers::{Step, StepSequence, TimerId, TimerQueue};
