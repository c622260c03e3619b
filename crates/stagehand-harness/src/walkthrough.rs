//! Scripted walkthrough of the whole scene.
//!
//! Drives a [`Scene`] the way a visitor would: help the loader, unlock,
//! hold the power button, plug in the charger, open projects and reset.
//! Every bus event, stage change and periodic sample is written as one JSON
//! object per line.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use stagehand::{
    Control, Director, LAYERS, LoadingPhase, Point, PointerEvent, Scene, SceneEvent, Stage,
    Subscription,
};
use tracing::info;
use web_time::Instant;

use crate::error::{HarnessError, Result};

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Event {
        t_ms: u64,
        topic: String,
        payload: Value,
    },
    Stage {
        t_ms: u64,
        stage: String,
        phone: String,
    },
    Sample {
        t_ms: u64,
        stage: String,
        background_progress: [f64; LAYERS],
        camera: [f64; 3],
        phone: [f64; 3],
        card_opacity: f64,
    },
    Done {
        t_ms: u64,
        frames: u64,
        events: u64,
        stage: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct WalkthroughOptions {
    pub frame: Duration,
    /// Sample interval; zero disables samples.
    pub sample_every: Duration,
    pub include_reset: bool,
}

impl Default for WalkthroughOptions {
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(16),
            sample_every: Duration::from_millis(250),
            include_reset: true,
        }
    }
}

/// Totals reported when the script ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub frames: u64,
    pub events: u64,
    pub final_stage: Stage,
}

/// Converts a bus event into its JSON payload.
#[must_use]
pub fn event_payload(event: &SceneEvent) -> Value {
    match *event {
        SceneEvent::ChargerConnected { connected } => json!({ "connected": connected }),
        SceneEvent::PhoneScreenVisibility { visible } => json!({ "visible": visible }),
        SceneEvent::HoldProgress { hold_time } => json!({ "holdTime": hold_time }),
        SceneEvent::AppContentShown { app, shown } => json!({ "app": app.name(), "shown": shown }),
        SceneEvent::AppClosed { app, closed } => json!({ "app": app.name(), "closed": closed }),
        _ => Value::Null,
    }
}

pub struct Walkthrough<W: Write> {
    scene: Scene,
    options: WalkthroughOptions,
    out: W,
    pending: Rc<RefCell<Vec<SceneEvent>>>,
    _recorder: Subscription,
    frames: u64,
    events: u64,
    last_stage: Stage,
    since_sample: Duration,
}

impl<W: Write> Walkthrough<W> {
    pub fn new(scene: Scene, options: WalkthroughOptions, out: W) -> Result<Self> {
        if options.frame.is_zero() {
            return Err(HarnessError::invalid("frame length must be > 0"));
        }
        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&pending);
        let recorder = scene
            .bus()
            .subscribe_all(move |e| sink.borrow_mut().push(*e));
        let last_stage = scene.director().stage();
        Ok(Self {
            scene,
            options,
            out,
            pending,
            _recorder: recorder,
            frames: 0,
            events: 0,
            last_stage,
            since_sample: Duration::ZERO,
        })
    }

    #[must_use]
    pub fn director(&self) -> &Director {
        self.scene.director()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn t_ms(&self) -> u64 {
        self.director().elapsed().as_millis() as u64
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// Write out everything that happened since the last flush.
    fn flush(&mut self) -> Result<()> {
        let t_ms = self.t_ms();
        let events = std::mem::take(&mut *self.pending.borrow_mut());
        for event in events {
            self.events += 1;
            self.write(&Record::Event {
                t_ms,
                topic: event.topic().to_string(),
                payload: event_payload(&event),
            })?;
        }

        let stage = self.director().stage();
        if stage != self.last_stage {
            self.last_stage = stage;
            let phone = format!("{:?}", self.director().phone_phase());
            self.write(&Record::Stage {
                t_ms,
                stage: format!("{stage:?}"),
                phone,
            })?;
        }

        if !self.options.sample_every.is_zero() && self.since_sample >= self.options.sample_every {
            self.since_sample = Duration::ZERO;
            let snap = self.director().snapshot();
            let v = |p: stagehand::Vec3| [p.x, p.y, p.z];
            self.write(&Record::Sample {
                t_ms,
                stage: format!("{:?}", snap.stage),
                background_progress: snap.background_progress,
                camera: v(snap.camera.position),
                phone: v(snap.phone.position),
                card_opacity: snap.card_opacity,
            })?;
        }
        Ok(())
    }

    fn frame(&mut self) -> Result<()> {
        let frame = self.options.frame;
        self.scene.director_mut().tick(frame);
        self.frames += 1;
        self.since_sample += frame;
        self.flush()
    }

    /// Run frames for at least `total`.
    pub fn wait(&mut self, total: Duration) -> Result<()> {
        let mut t = Duration::ZERO;
        while t < total {
            self.frame()?;
            t += self.options.frame;
        }
        Ok(())
    }

    /// Run frames until `done` holds or `limit` passes.
    pub fn wait_for(
        &mut self,
        waiting_for: &'static str,
        limit: Duration,
        done: impl Fn(&Director) -> bool,
    ) -> Result<()> {
        let mut t = Duration::ZERO;
        while !done(self.director()) {
            if t >= limit {
                return Err(HarnessError::Stalled {
                    stage: self.director().stage(),
                    waiting_for,
                    waited: t,
                });
            }
            self.frame()?;
            t += self.options.frame;
        }
        Ok(())
    }

    fn pointer(
        &mut self,
        make: fn(Point, Instant) -> PointerEvent,
        at: Point,
        control: Control,
    ) -> Result<()> {
        let now = self.director().now();
        self.scene.director_mut().pointer(&make(at, now), control);
        self.flush()
    }

    /// Press at `from`, move to `to` over `steps` frames, release.
    pub fn drag(&mut self, control: Control, from: Point, to: Point, steps: u32) -> Result<()> {
        self.pointer(PointerEvent::down, from, control)?;
        for i in 1..=steps {
            self.frame()?;
            let f = f64::from(i) / f64::from(steps);
            let p = Point::new(from.x + (to.x - from.x) * f, from.y + (to.y - from.y) * f);
            self.pointer(PointerEvent::moved, p, control)?;
        }
        self.frame()?;
        self.pointer(PointerEvent::up, to, control)
    }

    pub fn emit(&mut self, event: SceneEvent) -> Result<()> {
        self.scene.bus().emit(event);
        self.flush()
    }

    /// Play the full script.
    pub fn run(&mut self) -> Result<Summary> {
        let secs = Duration::from_secs;
        info!(
            target: "stagehand.harness",
            frame_ms = self.options.frame.as_millis() as u64,
            "walkthrough started"
        );

        self.wait_for("loading error", secs(10), |d| {
            d.loading_phase() >= LoadingPhase::ErrorShown
        })?;
        self.drag(Control::LoadingRotator, Point::ORIGIN, Point::new(150.0, 0.0), 20)?;
        self.wait_for("unlock prompt", secs(30), |d| d.stage() == Stage::Unlocking)?;

        self.drag(Control::UnlockSlider, Point::ORIGIN, Point::new(200.0, 0.0), 40)?;
        self.wait_for("home screen", secs(2), |d| d.stage() == Stage::Home)?;

        self.pointer(PointerEvent::down, Point::ORIGIN, Control::PowerButton)?;
        self.wait_for("battery death", secs(10), |d| d.stage() == Stage::BatteryDead)?;
        self.pointer(PointerEvent::up, Point::ORIGIN, Control::PowerButton)?;

        self.wait_for("charger", secs(15), |d| d.charger().is_enabled())?;
        self.drag(
            Control::Charger,
            Point::new(-0.06, -5.2),
            Point::new(-0.06, 3.35),
            50,
        )?;
        self.wait_for("charged", secs(10), |d| d.stage() == Stage::LandedFinal)?;

        self.emit(SceneEvent::ProjectsAppClicked)?;
        self.wait_for("projects view", secs(20), |d| d.stage() == Stage::ProjectsView)?;

        if self.options.include_reset {
            self.emit(SceneEvent::ResetToInitialView)?;
            self.wait_for("reset", secs(20), |d| d.stage() == Stage::LandedFinal)?;
            self.wait(secs(1))?;
        }

        let summary = Summary {
            frames: self.frames,
            events: self.events,
            final_stage: self.director().stage(),
        };
        self.write(&Record::Done {
            t_ms: self.t_ms(),
            frames: summary.frames,
            events: summary.events,
            stage: format!("{:?}", summary.final_stage),
        })?;
        self.out.flush()?;
        info!(
            target: "stagehand.harness",
            frames = summary.frames,
            events = summary.events,
            "walkthrough finished"
        );
        Ok(summary)
    }
}
