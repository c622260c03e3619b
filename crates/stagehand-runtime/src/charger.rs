#![forbid(unsafe_code)]

//! Drag-to-connect charger.
//!
//! The plug is dragged on a vertical plane. Its reach is capped at
//! `free_cap_y` everywhere except inside the socket "valley" (a narrow band
//! of x), where it may go up to `lock_y`. Reaching `lock_y` inside the valley
//! locks the plug in.
//!
//! # Invariants
//!
//! 1. The plug position always satisfies the constraints: x within
//!    `[x_min, x_max]`, y within `[min_y, cap(x)]`.
//! 2. [`ChargerStep::Locked`] is reported at most once per drag session,
//!    however often the plug crosses the lock line while the pointer is
//!    down.
//! 3. Nothing here reports a disconnect while dragging.
//! 4. A locked plug stays seated inside the valley: later samples of the
//!    same session do not move it.

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};
use stagehand_core::geometry::Point;
use tracing::{debug, info};

/// Charger geometry, in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct ChargerConfig {
    /// Body height while plugged in (default: -5.2).
    pub connected_y: f64,
    /// Body height while unplugged (default: -6.0).
    pub disconnected_y: f64,
    /// Plug rest position (default: x -0.06).
    pub rest_x: f64,
    /// Plug rest height (default: -5.2).
    pub rest_y: f64,
    pub x_min: f64,
    pub x_max: f64,
    /// Lowest plug height (default: -6.0).
    pub min_y: f64,
    /// Highest plug height outside the valley (default: 3.2).
    pub free_cap_y: f64,
    /// Plug height that locks it in (default: 3.32).
    pub lock_y: f64,
    pub valley_min_x: f64,
    pub valley_max_x: f64,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            connected_y: -5.2,
            disconnected_y: -6.0,
            rest_x: -0.06,
            rest_y: -5.2,
            x_min: -1.0,
            x_max: 1.0,
            min_y: -6.0,
            free_cap_y: 3.2,
            lock_y: 3.32,
            valley_min_x: -0.09,
            valley_max_x: -0.03,
        }
    }
}

impl ChargerConfig {
    /// Whether `x` lines up with the socket.
    #[must_use]
    pub fn in_valley(&self, x: f64) -> bool {
        (self.valley_min_x..=self.valley_max_x).contains(&x)
    }

    /// Highest reachable plug height at `x`.
    #[must_use]
    pub fn cap_at(&self, x: f64) -> f64 {
        if self.in_valley(x) {
            self.lock_y
        } else {
            self.free_cap_y
        }
    }

    /// Clamp a requested plug position onto the reachable region.
    #[must_use]
    pub fn constrain(&self, target: Point) -> Point {
        let x = target.x.clamp(self.x_min, self.x_max);
        let y = target.y.clamp(self.min_y, self.cap_at(x));
        Point::new(x, y)
    }

    #[must_use]
    pub fn rest(&self) -> Point {
        Point::new(self.rest_x, self.rest_y)
    }
}

/// What a drag call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargerStep {
    /// No session, or the rig is disabled.
    Ignored,
    Moved(Point),
    /// First time the plug reached the lock line in this session.
    Locked(Point),
    /// Pointer released. `connected` is whether the plug locked in.
    Released { at: Point, connected: bool },
}

/// Plug position, session bookkeeping and the connection latch.
#[derive(Debug, Clone)]
pub struct ChargerRig {
    config: ChargerConfig,
    plug: Point,
    enabled: bool,
    dragging: bool,
    /// Lock reported in the current session.
    lock_signalled: bool,
    connected: bool,
}

impl ChargerRig {
    #[must_use]
    pub fn new(config: ChargerConfig) -> Self {
        Self {
            plug: config.rest(),
            config,
            enabled: false,
            dragging: false,
            lock_signalled: false,
            connected: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn plug(&self) -> Point {
        self.plug
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Allow or refuse new drag sessions.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Press on the plug. Returns `false` when disabled or already locked.
    pub fn begin_drag(&mut self) -> bool {
        if !self.enabled || self.connected || self.dragging {
            return false;
        }
        self.dragging = true;
        self.lock_signalled = false;
        debug!(target: "stagehand.director", plug_y = self.plug.y, "charger drag started");
        true
    }

    /// Move the plug toward `target`, subject to the constraints.
    pub fn drag_to(&mut self, target: Point) -> ChargerStep {
        if !self.dragging {
            return ChargerStep::Ignored;
        }
        if self.lock_signalled {
            return ChargerStep::Moved(self.plug);
        }
        self.plug = self.config.constrain(target);
        let at_lock = self.config.in_valley(self.plug.x) && self.plug.y >= self.config.lock_y;
        if at_lock && !self.lock_signalled {
            self.lock_signalled = true;
            info!(target: "stagehand.director", x = self.plug.x, y = self.plug.y, "charger locked");
            return ChargerStep::Locked(self.plug);
        }
        ChargerStep::Moved(self.plug)
    }

    /// Release the plug. A plug that locked during the session snaps to the
    /// socket and stays connected.
    pub fn end_drag(&mut self) -> ChargerStep {
        if !self.dragging {
            return ChargerStep::Ignored;
        }
        self.dragging = false;
        if self.lock_signalled {
            self.connected = true;
            let x = self
                .plug
                .x
                .clamp(self.config.valley_min_x, self.config.valley_max_x);
            self.plug = Point::new(x, self.config.lock_y);
        }
        ChargerStep::Released {
            at: self.plug,
            connected: self.connected,
        }
    }

    /// Abort the session without connecting.
    pub fn cancel_drag(&mut self) {
        self.dragging = false;
        self.lock_signalled = false;
    }

    /// Pull the plug out and return it to rest.
    pub fn unplug(&mut self) {
        self.connected = false;
        self.dragging = false;
        self.lock_signalled = false;
        self.plug = self.config.rest();
    }

    /// Seat the plug without a drag, as when the scene is reset.
    pub fn plug_in(&mut self) {
        self.connected = true;
        self.dragging = false;
        self.plug = Point::new(self.config.rest_x, self.config.lock_y);
    }
}

impl Default for ChargerRig {
    fn default() -> Self {
        Self::new(ChargerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rig() -> ChargerRig {
        let mut rig = ChargerRig::default();
        rig.set_enabled(true);
        rig
    }

    #[test]
    fn drag_into_valley_clamps_to_lock_line() {
        let mut rig = rig();
        assert!(rig.begin_drag());
        let mut locks = 0;
        let steps = 50;
        for i in 1..=steps {
            let y = -5.2 + (3.35 + 5.2) * f64::from(i) / f64::from(steps);
            if let ChargerStep::Locked(_) = rig.drag_to(Point::new(-0.06, y)) {
                locks += 1;
            }
        }
        assert_eq!(locks, 1);
        assert_eq!(rig.plug().y, 3.32);
        assert_eq!(
            rig.end_drag(),
            ChargerStep::Released {
                at: Point::new(-0.06, 3.32),
                connected: true
            }
        );
        assert!(rig.is_connected());
    }

    #[test]
    fn outside_valley_caps_lower() {
        let mut rig = rig();
        rig.begin_drag();
        assert_eq!(
            rig.drag_to(Point::new(0.5, 10.0)),
            ChargerStep::Moved(Point::new(0.5, 3.2))
        );
        assert_eq!(
            rig.end_drag(),
            ChargerStep::Released {
                at: Point::new(0.5, 3.2),
                connected: false
            }
        );
    }

    #[test]
    fn jitter_at_lock_line_signals_once() {
        let mut rig = rig();
        rig.begin_drag();
        let ys = [3.0, 3.33, 3.31, 3.4, 3.29, 3.32, 3.5];
        let locks = ys
            .iter()
            .filter(|y| matches!(rig.drag_to(Point::new(-0.06, **y)), ChargerStep::Locked(_)))
            .count();
        assert_eq!(locks, 1);
    }

    #[test]
    fn locked_plug_cannot_be_dragged_off_the_socket() {
        let mut rig = rig();
        rig.begin_drag();
        assert!(matches!(
            rig.drag_to(Point::new(-0.06, 3.4)),
            ChargerStep::Locked(_)
        ));
        assert_eq!(
            rig.drag_to(Point::new(0.5, 3.5)),
            ChargerStep::Moved(Point::new(-0.06, 3.32))
        );
        let ChargerStep::Released { at, connected } = rig.end_drag() else {
            panic!("expected release");
        };
        assert!(connected);
        assert!(rig.config().in_valley(at.x));
        assert!(at.y <= rig.config().cap_at(at.x));
        assert_eq!(at, Point::new(-0.06, 3.32));
    }

    #[test]
    fn x_is_clamped() {
        let mut rig = rig();
        rig.begin_drag();
        assert_eq!(rig.drag_to(Point::new(-4.0, 0.0)), ChargerStep::Moved(Point::new(-1.0, 0.0)));
        assert_eq!(rig.drag_to(Point::new(4.0, -9.0)), ChargerStep::Moved(Point::new(1.0, -6.0)));
    }

    #[test]
    fn disabled_rig_ignores_input() {
        let mut rig = ChargerRig::default();
        assert!(!rig.begin_drag());
        assert_eq!(rig.drag_to(Point::new(-0.06, 3.4)), ChargerStep::Ignored);
        assert_eq!(rig.end_drag(), ChargerStep::Ignored);
    }

    #[test]
    fn connected_rig_refuses_new_session() {
        let mut rig = rig();
        rig.begin_drag();
        rig.drag_to(Point::new(-0.06, 4.0));
        rig.end_drag();
        assert!(!rig.begin_drag());
        rig.unplug();
        assert!(!rig.is_connected());
        assert_eq!(rig.plug(), rig.config().rest());
        assert!(rig.begin_drag());
    }

    proptest! {
        #[test]
        fn plug_always_within_region(points in prop::collection::vec((-3.0f64..3.0, -10.0f64..10.0), 1..40)) {
            let mut rig = rig();
            rig.begin_drag();
            let cfg = *rig.config();
            for (x, y) in points {
                rig.drag_to(Point::new(x, y));
                let p = rig.plug();
                prop_assert!(p.x >= cfg.x_min && p.x <= cfg.x_max);
                prop_assert!(p.y >= cfg.min_y && p.y <= cfg.cap_at(p.x));
            }
        }

        #[test]
        fn at_most_one_lock_per_session(ys in prop::collection::vec(3.0f64..3.6, 1..60)) {
            let mut rig = rig();
            rig.begin_drag();
            let locks = ys
                .into_iter()
                .filter(|y| matches!(rig.drag_to(Point::new(-0.05, *y)), ChargerStep::Locked(_)))
                .count();
            prop_assert!(locks <= 1);
        }
    }
}
