#![forbid(unsafe_code)]

//! Subtitle chains.
//!
//! A [`SubtitleChain`] plays an ordered script of lines one at a time. Each
//! line fades in; once the fade has finished the chain waits the line's own
//! delay plus a shared extra delay, then moves to the next line. The
//! [`SubtitleBoard`] keeps one chain per app plus the boot chain, and starts
//! or stops app chains from bus events.
//!
//! # Invariants
//!
//! 1. At most one line of a chain is visible at a time.
//! 2. Line `n + 1` never starts before line `n` has fully faded in.
//! 3. Starting a running chain is a no-op.

use std::fmt;
use std::time::Duration;

use stagehand_core::animation::{Animation, Fade, ease_out};
use tracing::debug;

use crate::bus::{AppId, SceneEvent};

/// One line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub text: String,
    /// Time the line stays up after its fade-in completes.
    pub fade_delay: Duration,
}

impl SubtitleEntry {
    #[must_use]
    pub fn new(text: impl Into<String>, fade_delay_ms: u64) -> Self {
        Self {
            text: text.into(),
            fade_delay: Duration::from_millis(fade_delay_ms),
        }
    }
}

/// Progress notifications from a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleCue {
    /// Line `index` started fading in.
    Show { index: usize },
    /// Line `index` finished fading in.
    Visible { index: usize },
    /// The last line's delay ran out.
    Finished,
}

#[derive(Debug, Clone, Copy)]
enum ChainState {
    Idle,
    FadingIn { index: usize, fade: Fade },
    Waiting { index: usize, remaining: Duration },
    Done,
}

/// An ordered script played one line at a time.
#[derive(Clone)]
pub struct SubtitleChain {
    entries: Vec<SubtitleEntry>,
    fade_in: Duration,
    extra_delay: Duration,
    state: ChainState,
    pending: Vec<SubtitleCue>,
}

impl fmt::Debug for SubtitleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtitleChain")
            .field("entries", &self.entries.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SubtitleChain {
    #[must_use]
    pub fn new(entries: Vec<SubtitleEntry>, fade_in: Duration, extra_delay: Duration) -> Self {
        Self {
            entries,
            fade_in,
            extra_delay,
            state: ChainState::Idle,
            pending: Vec::new(),
        }
    }

    fn fade(&self) -> Fade {
        Fade::new(self.fade_in).easing(ease_out)
    }

    /// Start from the first line. Returns `false` if already running or the
    /// script is empty.
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.entries.is_empty() {
            return false;
        }
        self.state = ChainState::FadingIn {
            index: 0,
            fade: self.fade(),
        };
        self.pending.push(SubtitleCue::Show { index: 0 });
        true
    }

    /// Stop and hide. Returns whether the chain was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = ChainState::Idle;
        self.pending.clear();
        was_running
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            ChainState::FadingIn { .. } | ChainState::Waiting { .. }
        )
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ChainState::Done)
    }

    /// Index and text of the visible line.
    #[must_use]
    pub fn current(&self) -> Option<(usize, &str)> {
        let index = match self.state {
            ChainState::FadingIn { index, .. } | ChainState::Waiting { index, .. } => index,
            ChainState::Idle | ChainState::Done => return None,
        };
        self.entries.get(index).map(|e| (index, e.text.as_str()))
    }

    /// Opacity of the visible line.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        match &self.state {
            ChainState::FadingIn { fade, .. } => fade.value(),
            ChainState::Waiting { .. } => 1.0,
            ChainState::Idle | ChainState::Done => 0.0,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    /// Advance by `dt`. Time left over from one stage carries into the next.
    pub fn advance(&mut self, dt: Duration) -> Vec<SubtitleCue> {
        let mut cues = std::mem::take(&mut self.pending);
        let mut budget = dt;
        loop {
            match &mut self.state {
                ChainState::FadingIn { index, fade } => {
                    fade.tick(budget);
                    if !fade.is_complete() {
                        break;
                    }
                    budget = fade.overshoot();
                    let index = *index;
                    let hold = self
                        .entries
                        .get(index)
                        .map_or(Duration::ZERO, |e| e.fade_delay)
                        .saturating_add(self.extra_delay);
                    cues.push(SubtitleCue::Visible { index });
                    self.state = ChainState::Waiting {
                        index,
                        remaining: hold,
                    };
                }
                ChainState::Waiting { index, remaining } => {
                    if budget < *remaining {
                        *remaining -= budget;
                        break;
                    }
                    budget -= *remaining;
                    let next = *index + 1;
                    if next < self.entries.len() {
                        self.state = ChainState::FadingIn {
                            index: next,
                            fade: self.fade(),
                        };
                        cues.push(SubtitleCue::Show { index: next });
                    } else {
                        self.state = ChainState::Done;
                        cues.push(SubtitleCue::Finished);
                        break;
                    }
                }
                ChainState::Idle | ChainState::Done => break,
            }
        }
        cues
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Which chain a cue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleSource {
    Boot,
    App(AppId),
}

/// The boot chain plus one chain per subtitled app.
#[derive(Debug, Clone)]
pub struct SubtitleBoard {
    boot: SubtitleChain,
    apps: Vec<(AppId, SubtitleChain)>,
}

impl SubtitleBoard {
    /// A board loaded with the built-in scripts.
    #[must_use]
    pub fn new(fade_in: Duration, extra_delay: Duration) -> Self {
        let chain = |entries| SubtitleChain::new(entries, fade_in, extra_delay);
        Self {
            boot: chain(boot_script()),
            apps: AppId::SUBTITLED
                .into_iter()
                .map(|app| (app, chain(app_script(app))))
                .collect(),
        }
    }

    /// Replace the script for `source` (builder pattern).
    #[must_use]
    pub fn with_script(mut self, source: SubtitleSource, entries: Vec<SubtitleEntry>) -> Self {
        if let Some(chain) = self.chain_mut(source) {
            *chain = SubtitleChain::new(entries, chain.fade_in, chain.extra_delay);
        }
        self
    }

    #[must_use]
    pub fn chain(&self, source: SubtitleSource) -> Option<&SubtitleChain> {
        match source {
            SubtitleSource::Boot => Some(&self.boot),
            SubtitleSource::App(app) => self.apps.iter().find(|(a, _)| *a == app).map(|(_, c)| c),
        }
    }

    fn chain_mut(&mut self, source: SubtitleSource) -> Option<&mut SubtitleChain> {
        match source {
            SubtitleSource::Boot => Some(&mut self.boot),
            SubtitleSource::App(app) => self
                .apps
                .iter_mut()
                .find(|(a, _)| *a == app)
                .map(|(_, c)| c),
        }
    }

    pub fn start(&mut self, source: SubtitleSource) -> bool {
        let started = self.chain_mut(source).is_some_and(SubtitleChain::start);
        debug!(target: "stagehand.director", ?source, started, "subtitle chain start");
        started
    }

    pub fn cancel(&mut self, source: SubtitleSource) -> bool {
        self.chain_mut(source).is_some_and(SubtitleChain::cancel)
    }

    /// Stop every chain.
    pub fn cancel_all(&mut self) {
        self.boot.cancel();
        self.cancel_apps();
    }

    /// Stop the app chains, leaving the boot chain running.
    pub fn cancel_apps(&mut self) {
        for (_, chain) in &mut self.apps {
            chain.cancel();
        }
    }

    /// React to app lifecycle events. Returns whether any chain changed.
    pub fn handle(&mut self, event: &SceneEvent) -> bool {
        match *event {
            SceneEvent::AppContentShown { app, shown: true } => self.start(SubtitleSource::App(app)),
            SceneEvent::AppContentShown { app, shown: false }
            | SceneEvent::AppClosed { app, closed: true } => {
                self.cancel(SubtitleSource::App(app))
            }
            _ => false,
        }
    }

    /// Advance every running chain.
    pub fn advance(&mut self, dt: Duration) -> Vec<(SubtitleSource, SubtitleCue)> {
        let mut cues: Vec<_> = self
            .boot
            .advance(dt)
            .into_iter()
            .map(|c| (SubtitleSource::Boot, c))
            .collect();
        for (app, chain) in &mut self.apps {
            cues.extend(
                chain
                    .advance(dt)
                    .into_iter()
                    .map(|c| (SubtitleSource::App(*app), c)),
            );
        }
        cues
    }

    /// Every visible line with its opacity, boot chain first.
    #[must_use]
    pub fn visible(&self) -> Vec<(SubtitleSource, &str, f64)> {
        std::iter::once((SubtitleSource::Boot, &self.boot))
            .chain(self.apps.iter().map(|(a, c)| (SubtitleSource::App(*a), c)))
            .filter_map(|(source, chain)| {
                chain
                    .current()
                    .map(|(_, text)| (source, text, chain.opacity()))
            })
            .collect()
    }
}

fn boot_script() -> Vec<SubtitleEntry> {
    vec![
        SubtitleEntry::new("Thanks, that did the trick.", 1500),
        SubtitleEntry::new("Let's get this phone started.", 1500),
    ]
}

fn app_script(app: AppId) -> Vec<SubtitleEntry> {
    match app {
        AppId::Messages => vec![
            SubtitleEntry::new("A few messages from friends and colleagues.", 2000),
            SubtitleEntry::new("Scroll around, nobody will mind.", 2000),
        ],
        AppId::Email => vec![SubtitleEntry::new("My inbox. Mostly newsletters.", 2000)],
        AppId::Safari => vec![
            SubtitleEntry::new("Some bookmarks worth a look.", 2000),
            SubtitleEntry::new("Tap one to open it.", 1500),
        ],
        AppId::Notes => vec![
            SubtitleEntry::new("This is where ideas go.", 2000),
            SubtitleEntry::new("Some of them are even good.", 1500),
        ],
        AppId::Snake => vec![
            SubtitleEntry::new("Swipe to steer.", 1500),
            SubtitleEntry::new("Try to beat the high score.", 2000),
        ],
        AppId::Projects => Vec::new(),
    }
}
