//! The page: one document with its registry, widgets and timers.
//!
//! [`Page`] is the host-facing facade. A host builds it, inserts markup,
//! calls [`Page::start`], then feeds it input with [`Page::dispatch`] and
//! lets time pass with [`Page::run_due_timers`] (or hands it to
//! [`crate::driver::run`]).
//!
//! Every entry point finishes by settling the page: queued synthetic events
//! are delivered, then newly inserted markup is initialized, until nothing is
//! left to do. Widgets whose root was removed are pruned last.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::channel::Bus;
use crate::config::Config;
use crate::cx::Cx;
use crate::dom::{Document, DomEvent, EventKind, Key, Markup, NodeId, Selector};
use crate::error::{Result, RuntimeError};
use crate::registry::Registry;
use crate::types::{SidebarCommand, ToastRequest};
use crate::watcher::TreeWatcher;
use crate::widgets::{self, select, Countdown, Select, ToastScheduler, Widget, WidgetTable};

/// Elements that take focus when clicked.
const FOCUSABLE: &str = "button, a[href], input, select, textarea, [tabindex]";

pub struct Page {
    cx: Cx,
    registry: Registry,
    widgets: WidgetTable,
    watcher: TreeWatcher,
    toasts: Rc<RefCell<ToastScheduler>>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("registry", &self.registry)
            .field("widgets", &self.widgets)
            .field("watching", &self.watcher.is_running())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates an empty page with every built-in component registered.
    ///
    /// # Errors
    ///
    /// Fails only if a built-in discovery selector does not parse.
    pub fn new(config: Config) -> Result<Self> {
        let cx = Cx::new(config);
        let mut registry = Registry::new();
        let toasts = widgets::register_builtins(&mut registry)?;
        cx.bus().toast.subscribe(&toasts);
        Ok(Self {
            cx,
            registry,
            widgets: WidgetTable::new(),
            watcher: TreeWatcher::new(),
            toasts,
        })
    }

    /// Creates a page whose body holds `markup`, not yet started.
    ///
    /// # Errors
    ///
    /// See [`Page::new`].
    pub fn from_markup<'a>(config: Config, markup: impl IntoIterator<Item = &'a Markup>) -> Result<Self> {
        let mut page = Self::new(config)?;
        let body = page.cx.doc.body();
        for m in markup {
            page.cx.doc.insert(body, m)?;
        }
        Ok(page)
    }

    /// Initializes everything already in the tree and starts watching for
    /// insertions. Returns how many roots were initialized.
    pub fn start(&mut self) -> usize {
        let count = self.registry.initialize_all(&mut self.cx, &mut self.widgets);
        self.watcher.start(&mut self.cx.doc);
        self.settle();
        info!(initialized = count, widgets = self.widgets.len(), "page started");
        count
    }

    /// Stops watching for insertions. Markup inserted afterwards stays
    /// uninitialized until [`Page::start`] or an explicit initialize call.
    pub fn stop(&mut self) {
        self.watcher.stop(&mut self.cx.doc);
    }

    /// Runs `f` against the document, then settles.
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = f(&mut self.cx.doc);
        self.settle();
        result
    }

    /// Inserts markup under `parent` and settles.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is stale or not an element.
    pub fn insert(&mut self, parent: NodeId, markup: &Markup) -> Result<NodeId> {
        let node = self.cx.doc.insert(parent, markup)?;
        self.settle();
        Ok(node)
    }

    /// Delivers an input event and returns it, marked if a handler
    /// prevented its default action.
    pub fn dispatch(&mut self, event: DomEvent) -> DomEvent {
        let event = self.deliver(event);
        self.settle();
        event
    }

    pub fn click(&mut self, target: NodeId) -> DomEvent {
        self.dispatch(DomEvent::click(target))
    }

    pub fn key(&mut self, target: NodeId, key: Key) -> DomEvent {
        self.dispatch(DomEvent::key(target, key))
    }

    /// Sets an input's value and fires an input event on it.
    pub fn type_text(&mut self, target: NodeId, text: &str) -> DomEvent {
        self.cx.doc.set_attr(target, "value", text);
        self.dispatch(DomEvent::new(EventKind::Input, target))
    }

    fn deliver(&mut self, mut event: DomEvent) -> DomEvent {
        self.widgets.prune(&self.cx.doc);
        if !self.cx.doc.is_alive(event.target) {
            debug!(target_node = %event.target, "event target no longer exists");
            return event;
        }
        trace!(target_node = %event.target, kind = ?event.kind, "dispatching");

        if event.kind == EventKind::Click {
            if let Ok(focusable) = Selector::parse(FOCUSABLE) {
                if let Some(node) = self.cx.doc.closest(event.target, &focusable) {
                    self.cx.doc.focus(node);
                }
            }
        }

        for node in self.cx.doc.ancestors_inclusive(event.target) {
            for widget in self.widgets.bound_to(node) {
                if let Ok(mut widget) = widget.try_borrow_mut() {
                    widget.handle_event(&mut self.cx, &mut event);
                }
            }
        }
        for widget in self.widgets.snapshot() {
            if let Ok(mut widget) = widget.try_borrow_mut() {
                widget.handle_document_event(&mut self.cx, &event);
            }
        }

        // Native activation: Enter or Space on a button clicks it.
        if let EventKind::KeyDown(Key::Enter | Key::Space) = event.kind {
            if !event.default_prevented() && self.cx.doc.tag(event.target) == Some("button") {
                self.cx.queue_event(DomEvent::click(event.target));
            }
        }
        event
    }

    fn settle(&mut self) {
        loop {
            if let Some(event) = self.cx.take_queued() {
                self.deliver(event);
                continue;
            }
            let added = self.watcher.drain(&mut self.cx.doc);
            if added.is_empty() {
                break;
            }
            for node in added {
                self.registry
                    .initialize_node(&mut self.cx, &mut self.widgets, node);
            }
        }
        self.widgets.prune(&self.cx.doc);
        self.toasts.borrow_mut().prune(&mut self.cx);
    }

    /// Runs every timer that is due now. Returns how many ran.
    pub fn run_due_timers(&mut self) -> usize {
        let now = Instant::now();
        let mut fired = 0;
        while let Some((id, callback)) = self.cx.timers.pop_due(now) {
            trace!(timer = %id, "timer fired");
            callback(&mut self.cx);
            self.settle();
            fired += 1;
        }
        fired
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cx.timers.next_deadline()
    }

    /// Publishes a notification request.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NoToaster`] (after logging it) when the page
    /// has no toaster; the request is dropped.
    pub fn toast(&mut self, request: ToastRequest) -> Result<()> {
        if self.toasts.borrow().toaster(&self.cx.doc).is_none() {
            error!(title = ?request.title, "cannot create toast: toaster container not found on page");
            return Err(RuntimeError::NoToaster);
        }
        self.cx.publish(|bus| &bus.toast, &request);
        self.settle();
        Ok(())
    }

    /// Remaining auto-dismiss budget of a toast that is still tracked.
    #[must_use]
    pub fn toast_countdown(&self, toast: NodeId) -> Option<Countdown> {
        self.toasts.borrow().timer(toast).map(|t| t.countdown())
    }

    /// True if the toast has a countdown timer pending.
    #[must_use]
    pub fn toast_timer_running(&self, toast: NodeId) -> bool {
        self.toasts
            .borrow()
            .timer(toast)
            .is_some_and(|t| t.is_running())
    }

    /// Broadcasts a sidebar command.
    pub fn sidebar(&mut self, command: SidebarCommand) {
        self.cx.publish(|bus| &bus.sidebar, &command);
        self.settle();
    }

    /// Changes the viewport width seen by widgets from now on.
    pub fn resize(&mut self, width: u32) {
        self.cx.set_viewport_width(width);
    }

    /// Enables location-change publishing for `push_state` and
    /// `replace_state`. Returns false if it was already enabled.
    pub fn install_location_tracking(&mut self) -> bool {
        self.cx.install_location_tracking()
    }

    pub fn push_state(&mut self, path: &str) {
        self.cx.push_state(path);
        self.settle();
    }

    pub fn replace_state(&mut self, path: &str) {
        self.cx.replace_state(path);
        self.settle();
    }

    pub fn back(&mut self) -> bool {
        let moved = self.cx.back();
        self.settle();
        moved
    }

    pub fn forward(&mut self) -> bool {
        let moved = self.cx.forward();
        self.settle();
        moved
    }

    #[must_use]
    pub fn location(&self) -> &str {
        self.cx.location()
    }

    /// Commits the option with `value` in the picker rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::WidgetNotFound`] if no picker is bound to
    /// `root`.
    pub fn select_by_value(&mut self, root: NodeId, value: &str) -> Result<bool> {
        self.with_widget(root, |select: &mut Select, cx| select.select_by_value(cx, value))
            .ok_or(RuntimeError::WidgetNotFound {
                component: select::COMPONENT,
                root,
            })
    }

    /// Runs `f` on the widget of type `T` bound to `root`, then settles.
    ///
    /// Returns `None` if there is no such widget.
    pub fn with_widget<T, R>(&mut self, root: NodeId, f: impl FnOnce(&mut T, &mut Cx) -> R) -> Option<R>
    where
        T: Widget,
    {
        let widget = self
            .widgets
            .bound_to(root)
            .into_iter()
            .find(|w| w.borrow().as_any().is::<T>())?;
        let result = {
            let mut guard = widget.borrow_mut();
            let typed = guard.as_any_mut().downcast_mut::<T>()?;
            f(typed, &mut self.cx)
        };
        self.settle();
        Some(result)
    }

    /// Initializes every uninitialized match. Returns how many.
    pub fn initialize_all(&mut self) -> usize {
        let count = self.registry.initialize_all(&mut self.cx, &mut self.widgets);
        self.settle();
        count
    }

    /// Re-initializes every root of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Registry`] if `name` was never registered.
    pub fn reinitialize(&mut self, name: &str) -> Result<usize> {
        let count = self
            .registry
            .reinitialize(&mut self.cx, &mut self.widgets, name)?;
        self.settle();
        Ok(count)
    }

    pub fn reinitialize_all(&mut self) -> usize {
        let count = self.registry.reinitialize_all(&mut self.cx, &mut self.widgets);
        self.settle();
        count
    }

    /// The registry, for adding component kinds.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    #[must_use]
    pub fn doc(&self) -> &Document {
        &self.cx.doc
    }

    #[must_use]
    pub fn cx(&self) -> &Cx {
        &self.cx
    }

    #[must_use]
    pub fn bus(&self) -> Rc<Bus> {
        self.cx.bus()
    }

    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Number of live widgets of one kind.
    #[must_use]
    pub fn widgets_of(&self, component: &str) -> usize {
        self.widgets.count_of(component)
    }

    /// Element with the given `id` attribute.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<NodeId> {
        self.cx.doc.element_by_id(id)
    }

    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.cx.doc.focused()
    }
}
