#![forbid(unsafe_code)]

//! Pointer input as seen by gesture and hold sessions.
//!
//! Mouse and touch input are normalized into one [`PointerEvent`] stream.
//! Each event carries the instant it was observed, so sessions compute
//! velocities and hold progress from wall-clock time rather than from the
//! number of frames rendered.

use web_time::Instant;

use crate::geometry::Point;

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Button pressed or finger placed.
    Down,
    /// Pointer moved while tracked.
    Move,
    /// Button released or finger lifted.
    Up,
    /// Pointer left the target element.
    Leave,
    /// The platform aborted the interaction.
    Cancel,
}

/// Device that produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
}

/// A single pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: Point,
    pub source: PointerSource,
    pub time: Instant,
    /// Whether the sample landed on the element that owns the session.
    ///
    /// A touch `Up` with `over_target == false` is a document-level touch
    /// end: the finger lifted somewhere else on the page.
    pub over_target: bool,
}

impl PointerEvent {
    /// Create a mouse event over the target.
    #[must_use]
    pub fn new(kind: PointerKind, pos: Point, time: Instant) -> Self {
        Self {
            kind,
            pos,
            source: PointerSource::Mouse,
            time,
            over_target: true,
        }
    }

    #[must_use]
    pub fn down(pos: Point, time: Instant) -> Self {
        Self::new(PointerKind::Down, pos, time)
    }

    #[must_use]
    pub fn moved(pos: Point, time: Instant) -> Self {
        Self::new(PointerKind::Move, pos, time)
    }

    #[must_use]
    pub fn up(pos: Point, time: Instant) -> Self {
        Self::new(PointerKind::Up, pos, time)
    }

    #[must_use]
    pub fn leave(pos: Point, time: Instant) -> Self {
        Self::new(PointerKind::Leave, pos, time)
    }

    #[must_use]
    pub fn cancel(pos: Point, time: Instant) -> Self {
        Self::new(PointerKind::Cancel, pos, time)
    }

    /// Mark the event as coming from a touch screen (builder pattern).
    #[must_use]
    pub fn touch(mut self) -> Self {
        self.source = PointerSource::Touch;
        self
    }

    /// Mark the event as landing outside the owning element (builder pattern).
    #[must_use]
    pub fn outside(mut self) -> Self {
        self.over_target = false;
        self
    }

    /// True for the events that end a press: up, leave and cancel.
    #[inline]
    #[must_use]
    pub fn is_release(&self) -> bool {
        matches!(
            self.kind,
            PointerKind::Up | PointerKind::Leave | PointerKind::Cancel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_flags() {
        let t = Instant::now();
        let ev = PointerEvent::up(Point::new(1.0, 2.0), t).touch().outside();
        assert_eq!(ev.kind, PointerKind::Up);
        assert_eq!(ev.source, PointerSource::Touch);
        assert!(!ev.over_target);
    }

    #[test]
    fn release_kinds() {
        let t = Instant::now();
        let p = Point::ORIGIN;
        assert!(PointerEvent::up(p, t).is_release());
        assert!(PointerEvent::leave(p, t).is_release());
        assert!(PointerEvent::cancel(p, t).is_release());
        assert!(!PointerEvent::down(p, t).is_release());
        assert!(!PointerEvent::moved(p, t).is_release());
    }
}
