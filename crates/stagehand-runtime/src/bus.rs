#![forbid(unsafe_code)]

//! Typed in-process event bus.
//!
//! # Design
//!
//! [`EventBus`] is a cloneable handle over shared `Rc<RefCell<..>>` state.
//! Subscribers register a callback for one [`Topic`] (or for every topic)
//! and receive a [`Subscription`] guard; dropping the guard unsubscribes.
//! The bus itself only keeps `Weak` references, so a component that goes
//! away cannot be called back.
//!
//! # Invariants
//!
//! 1. [`EventBus::emit`] runs every matching live handler synchronously, in
//!    registration order, before it returns.
//! 2. A handler may emit or subscribe re-entrantly. Nested emits run to
//!    completion inside the outer handler (depth first). Subscriptions made
//!    during an emit do not see the event being delivered.
//! 3. Dead subscribers are pruned lazily on the next emit.
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: a guard kept alive forever keeps its handler
//!   registered. Tie guards to the owner's lifetime.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{info_span, trace};

// ---------------------------------------------------------------------------
// Event catalog
// ---------------------------------------------------------------------------

/// Mock apps that talk to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppId {
    Messages,
    Email,
    Safari,
    Notes,
    Snake,
    Projects,
}

impl AppId {
    /// Apps that carry a subtitle script.
    pub const SUBTITLED: [Self; 5] = [
        Self::Messages,
        Self::Email,
        Self::Safari,
        Self::Notes,
        Self::Snake,
    ];

    /// Lower camel case name used as the event prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Email => "email",
            Self::Safari => "safari",
            Self::Notes => "notes",
            Self::Snake => "snake",
            Self::Projects => "projects",
        }
    }
}

/// Everything that travels over the bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    /// The charger plug locked in, or was pulled out.
    ChargerConnected { connected: bool },
    /// Phone screen content should show or hide.
    PhoneScreenVisibility { visible: bool },
    /// Power-hold progress, in seconds held.
    HoldProgress { hold_time: f64 },
    /// Power-hold cancelled before completion.
    HoldReset,
    ResetCameraPosition,
    ChangeCameraPosition,
    /// Battery flash after charging finished; the lock screen may show.
    GreenBatteryComplete,
    /// Request to begin the projects transition.
    ProjectsAppClicked,
    /// Request to reverse the projects transition.
    ResetToInitialView,
    /// Scene-wide app teardown, sent by the director.
    CloseAllApps,
    /// App-side echo of a teardown.
    CloseAllAppsEvent,
    AppContentShown { app: AppId, shown: bool },
    AppClosed { app: AppId, closed: bool },
}

/// Routing key of a [`SceneEvent`], ignoring its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ChargerConnected,
    PhoneScreenVisibility,
    HoldProgress,
    HoldReset,
    ResetCameraPosition,
    ChangeCameraPosition,
    GreenBatteryComplete,
    ProjectsAppClicked,
    ResetToInitialView,
    CloseAllApps,
    CloseAllAppsEvent,
    ContentShown(AppId),
    AppClosed(AppId),
}

impl SceneEvent {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match *self {
            Self::ChargerConnected { .. } => Topic::ChargerConnected,
            Self::PhoneScreenVisibility { .. } => Topic::PhoneScreenVisibility,
            Self::HoldProgress { .. } => Topic::HoldProgress,
            Self::HoldReset => Topic::HoldReset,
            Self::ResetCameraPosition => Topic::ResetCameraPosition,
            Self::ChangeCameraPosition => Topic::ChangeCameraPosition,
            Self::GreenBatteryComplete => Topic::GreenBatteryComplete,
            Self::ProjectsAppClicked => Topic::ProjectsAppClicked,
            Self::ResetToInitialView => Topic::ResetToInitialView,
            Self::CloseAllApps => Topic::CloseAllApps,
            Self::CloseAllAppsEvent => Topic::CloseAllAppsEvent,
            Self::AppContentShown { app, .. } => Topic::ContentShown(app),
            Self::AppClosed { app, .. } => Topic::AppClosed(app),
        }
    }
}

impl fmt::Display for Topic {
    /// Wire name, e.g. `chargerConnected` or `notesAppClosed`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = match self {
            Self::ChargerConnected => "chargerConnected",
            Self::PhoneScreenVisibility => "phoneScreenVisibility",
            Self::HoldProgress => "holdProgress",
            Self::HoldReset => "holdReset",
            Self::ResetCameraPosition => "resetCameraPosition",
            Self::ChangeCameraPosition => "changeCameraPosition",
            Self::GreenBatteryComplete => "greenBatteryComplete",
            Self::ProjectsAppClicked => "projectsAppClicked",
            Self::ResetToInitialView => "resetToInitialView",
            Self::CloseAllApps => "closeAllApps",
            Self::CloseAllAppsEvent => "closeAllAppsEvent",
            Self::ContentShown(app) => return write!(f, "{}ContentShown", app.name()),
            Self::AppClosed(app) => return write!(f, "{}AppClosed", app.name()),
        };
        f.write_str(fixed)
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

type HandlerRc = Rc<dyn Fn(&SceneEvent)>;
type HandlerWeak = Weak<dyn Fn(&SceneEvent)>;

struct Subscriber {
    /// `None` receives every topic.
    topic: Option<Topic>,
    handler: HandlerWeak,
}

struct BusInner {
    subscribers: Vec<Subscriber>,
    emitted: u64,
}

/// Cloneable handle to a shared event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &inner.subscribers.len())
            .field("emitted", &inner.emitted)
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                subscribers: Vec::new(),
                emitted: 0,
            })),
        }
    }

    /// Register `handler` for one topic.
    pub fn subscribe(&self, topic: Topic, handler: impl Fn(&SceneEvent) + 'static) -> Subscription {
        self.register(Some(topic), Rc::new(handler))
    }

    /// Register `handler` for every topic.
    pub fn subscribe_all(&self, handler: impl Fn(&SceneEvent) + 'static) -> Subscription {
        self.register(None, Rc::new(handler))
    }

    fn register(&self, topic: Option<Topic>, strong: HandlerRc) -> Subscription {
        self.inner.borrow_mut().subscribers.push(Subscriber {
            topic,
            handler: Rc::downgrade(&strong),
        });
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `event` to every live handler subscribed to its topic.
    pub fn emit(&self, event: SceneEvent) {
        let topic = event.topic();
        let handlers: Vec<HandlerRc> = {
            let mut inner = self.inner.borrow_mut();
            inner.emitted += 1;
            inner.subscribers.retain(|s| s.handler.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter(|s| s.topic.is_none_or(|t| t == topic))
                .filter_map(|s| s.handler.upgrade())
                .collect()
        };

        let _span = info_span!(
            target: "stagehand.bus",
            "bus.emit",
            topic = %topic,
            subscribers = handlers.len()
        )
        .entered();
        trace!(target: "stagehand.bus", ?event, "emit");
        for handler in &handlers {
            handler(&event);
        }
    }

    /// Live subscribers, not counting dropped guards awaiting pruning.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.handler.strong_count() > 0)
            .count()
    }

    /// Total events emitted over the bus lifetime.
    #[must_use]
    pub fn emitted_count(&self) -> u64 {
        self.inner.borrow().emitted
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a handler registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
