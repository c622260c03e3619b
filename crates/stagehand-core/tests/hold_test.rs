//! Hold timer properties and its log output.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use stagehand_core::event::PointerEvent;
use stagehand_core::geometry::Point;
use stagehand_core::hold::{HoldEvent, HoldTimer, ReleaseCause};
use tracing_subscriber::layer::SubscriberExt;
use web_time::Instant;

// ---------------------------------------------------------------------------
// Tracing capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CapturedEvent {
    target: String,
    message: String,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

fn with_captured_events(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn completion_is_logged_once_under_hold_target() {
    let events = with_captured_events(|| {
        let t = Instant::now();
        let mut hold = HoldTimer::default();
        hold.press(t);
        for i in 0..60u64 {
            hold.tick(t + Duration::from_millis(i * 50));
        }
        hold.release(t + Duration::from_secs(4), ReleaseCause::PointerUp);
    });
    let completed: Vec<_> = events
        .iter()
        .filter(|e| e.target == "stagehand.hold" && e.message == "hold completed")
        .collect();
    assert_eq!(completed.len(), 1, "{events:?}");
    assert!(
        events
            .iter()
            .any(|e| e.message == "release ignored while blocked")
    );
}

#[test]
fn touch_end_outside_target_resets() {
    let t = Instant::now();
    let p = Point::new(10.0, 10.0);
    let mut hold = HoldTimer::default();
    hold.handle_pointer(&PointerEvent::down(p, t).touch());
    let events = hold.handle_pointer(
        &PointerEvent::up(Point::new(300.0, 300.0), t + Duration::from_millis(400))
            .touch()
            .outside(),
    );
    assert_eq!(events, vec![HoldEvent::Reset]);
    assert!(!hold.is_holding());
}

proptest! {
    #[test]
    fn progress_never_decreases_while_held(steps in prop::collection::vec(0u64..120, 1..80)) {
        let t = Instant::now();
        let mut hold = HoldTimer::default();
        hold.press(t);
        let mut now = Duration::ZERO;
        let mut last = 0.0;
        let mut completions = 0;
        for step in steps {
            now += Duration::from_millis(step);
            for event in hold.tick(t + now) {
                match event {
                    HoldEvent::Progress { progress, .. } => {
                        prop_assert!(progress >= last);
                        prop_assert!(progress <= 1.0);
                        last = progress;
                    }
                    HoldEvent::Completed => completions += 1,
                    HoldEvent::Reset => prop_assert!(false, "reset while held"),
                }
            }
        }
        prop_assert!(completions <= 1);
    }

    #[test]
    fn no_reset_after_completion(extra_ms in 0u64..10_000) {
        let t = Instant::now();
        let mut hold = HoldTimer::default();
        hold.press(t);
        hold.tick(t + Duration::from_millis(2500));
        let after = t + Duration::from_millis(2500 + extra_ms);
        prop_assert!(hold.release(after, ReleaseCause::PointerUp).is_empty());
        prop_assert!(hold.release(after, ReleaseCause::GlobalTouchEnd).is_empty());
        prop_assert!(!hold.press(after));
    }
}
