//! The context handed to widgets on every turn.
//!
//! [`Cx`] owns the document, the timer queue and the history, and shares the
//! [`Bus`] and [`Config`] with every widget. Widgets never hold references to
//! each other; everything they do to the outside world goes through here.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::channel::{Bus, Channel};
use crate::config::Config;
use crate::dom::{Document, DomEvent, NodeId};
use crate::history::MemoryHistory;
use crate::timer::{TimerId, TimerQueue};
use crate::types::{LocationChange, NavigationCause, WidgetSignal};

/// Per-page mutable state shared by all widgets.
#[derive(Debug)]
pub struct Cx {
    pub doc: Document,
    pub timers: TimerQueue,
    history: MemoryHistory,
    bus: Rc<Bus>,
    config: Rc<Config>,
    viewport_width: u32,
    queued: VecDeque<DomEvent>,
}

impl Cx {
    /// Creates a context around an empty document.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_document(config, Document::new())
    }

    /// Creates a context around an existing document.
    #[must_use]
    pub fn with_document(config: Config, doc: Document) -> Self {
        Self {
            doc,
            timers: TimerQueue::new(),
            history: MemoryHistory::new(config.location.clone()),
            bus: Rc::new(Bus::new()),
            viewport_width: config.viewport_width,
            config: Rc::new(config),
            queued: VecDeque::new(),
        }
    }

    /// The page's broadcast channels.
    #[must_use]
    pub fn bus(&self) -> Rc<Bus> {
        Rc::clone(&self.bus)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Publishes a message on one of the bus channels.
    pub fn publish<M: 'static>(&mut self, channel: impl Fn(&Bus) -> &Channel<M>, message: &M) {
        let bus = Rc::clone(&self.bus);
        channel(&*bus).publish(self, message);
    }

    /// Publishes a lifecycle or value signal.
    pub fn emit(&mut self, signal: WidgetSignal) {
        self.publish(|bus| &bus.signals, &signal);
    }

    #[must_use]
    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    /// Runs `callback` after `delay`.
    pub fn set_timeout(
        &mut self,
        delay: Duration,
        callback: impl FnOnce(&mut Cx) + 'static,
    ) -> TimerId {
        self.timers
            .schedule(Instant::now() + delay, Box::new(callback))
    }

    /// Cancels a timer started with [`Cx::set_timeout`].
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Declared transition duration of `node`, if any.
    #[must_use]
    pub fn transition_duration(&self, node: NodeId) -> Option<Duration> {
        self.doc.transition(node)
    }

    /// Runs `callback` once `node`'s transition has finished.
    ///
    /// Without a declared transition the callback runs immediately and no
    /// timer is returned. The callback must not borrow the calling widget.
    pub fn after_transition(
        &mut self,
        node: NodeId,
        callback: impl FnOnce(&mut Cx) + 'static,
    ) -> Option<TimerId> {
        match self.doc.transition(node) {
            Some(duration) => Some(self.set_timeout(duration, callback)),
            None => {
                callback(self);
                None
            }
        }
    }

    /// Queues an event to be dispatched after the current one completes.
    pub fn queue_event(&mut self, event: DomEvent) {
        trace!(target_node = %event.target, kind = ?event.kind, "queued event");
        self.queued.push_back(event);
    }

    pub(crate) fn take_queued(&mut self) -> Option<DomEvent> {
        self.queued.pop_front()
    }

    /// Current location path.
    #[must_use]
    pub fn location(&self) -> &str {
        self.history.location()
    }

    #[must_use]
    pub fn history(&self) -> &MemoryHistory {
        &self.history
    }

    /// Enables location-change publishing for programmatic navigation.
    ///
    /// Returns false if it was already enabled.
    pub fn install_location_tracking(&mut self) -> bool {
        self.history.install_tracking()
    }

    /// Adds a history entry.
    pub fn push_state(&mut self, path: impl Into<String>) {
        self.history.push(path);
        if self.history.is_tracking() {
            self.announce_location(NavigationCause::Push);
        }
    }

    /// Replaces the current history entry.
    pub fn replace_state(&mut self, path: impl Into<String>) {
        self.history.replace(path);
        if self.history.is_tracking() {
            self.announce_location(NavigationCause::Replace);
        }
    }

    /// Native back navigation.
    pub fn back(&mut self) -> bool {
        let moved = self.history.back();
        if moved {
            self.announce_location(NavigationCause::Traverse);
        }
        moved
    }

    /// Native forward navigation.
    pub fn forward(&mut self) -> bool {
        let moved = self.history.forward();
        if moved {
            self.announce_location(NavigationCause::Traverse);
        }
        moved
    }

    fn announce_location(&mut self, cause: NavigationCause) {
        let change = LocationChange {
            path: self.history.location().to_string(),
            cause,
        };
        self.publish(|bus| &bus.location, &change);
    }
}
