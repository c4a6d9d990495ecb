//! Notifications with timed dismissal.
//!
//! Two component kinds share one [`ToastScheduler`]:
//!
//! - `toaster` (`#toaster`): the container. Hovering it pauses every running
//!   countdown; leaving resumes them with whatever time was left. Clicking a
//!   footer control dismisses the toast it belongs to.
//! - `toast` (`.toast`): one notification. Initializing it starts its
//!   countdown, or records it paused if the pointer is over the toaster.
//!
//! Requests published on the toast channel are rendered by the scheduler
//! into the toaster; the tree watcher then initializes them like any other
//! late markup.
//!
//! Dismissal is two-phase: the toast is hidden (`aria-hidden="true"`) and
//! loses focus at once, and is removed from the tree when its exit
//! transition ends.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, trace};
use uuid::Uuid;

use super::{part, Widget, WidgetRef};
use crate::channel::Observer;
use crate::config::Config;
use crate::cx::Cx;
use crate::dom::{Document, DomEvent, EventKind, Markup, NodeId};
use crate::error::{InitError, RuntimeError};
use crate::timer::TimerId;
use crate::types::{ToastCategory, ToastHandler, ToastRequest};

pub const TOASTER: &str = "toaster";
pub const TOAST: &str = "toast";

/// Auto-dismiss budget of one toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// `data-duration="-1"`: the toast stays until dismissed by hand.
    Disabled,
    /// Time left before dismissal.
    Remaining(Duration),
}

/// Timer state of a tracked toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastTimer {
    countdown: Countdown,
    timer: Option<TimerId>,
    started: Option<Instant>,
}

impl ToastTimer {
    #[must_use]
    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    /// True while a countdown timer is pending.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }
}

/// Auto-dismiss budget for a toast element.
///
/// `-1` disables dismissal; a positive `data-duration` is used as is;
/// anything else falls back to the category default.
pub(crate) fn resolve_countdown(doc: &Document, toast: NodeId, config: &Config) -> Countdown {
    let declared = doc
        .attr(toast, "data-duration")
        .and_then(|v| v.trim().parse::<i64>().ok());
    match declared {
        Some(-1) => Countdown::Disabled,
        Some(ms) if ms > 0 => Countdown::Remaining(Duration::from_millis(ms.unsigned_abs())),
        _ if doc.attr(toast, "data-category") == Some(ToastCategory::Error.as_str()) => {
            Countdown::Remaining(config.toast_error_duration)
        }
        _ => Countdown::Remaining(config.toast_duration),
    }
}

/// Shared state of the toaster and its toasts.
pub struct ToastScheduler {
    this: Weak<RefCell<ToastScheduler>>,
    toaster: Option<NodeId>,
    timers: HashMap<NodeId, ToastTimer>,
    paused: bool,
    /// Inline handlers keyed by the footer button that runs them.
    handlers: HashMap<NodeId, ToastHandler>,
}

impl std::fmt::Debug for ToastScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastScheduler")
            .field("toaster", &self.toaster)
            .field("timers", &self.timers)
            .field("paused", &self.paused)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl ToastScheduler {
    #[must_use]
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                this: this.clone(),
                toaster: None,
                timers: HashMap::new(),
                paused: false,
                handlers: HashMap::new(),
            })
        })
    }

    /// The connected toaster, if one was initialized.
    #[must_use]
    pub fn toaster(&self, doc: &Document) -> Option<NodeId> {
        self.toaster.filter(|&t| doc.is_connected(t))
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn timer(&self, toast: NodeId) -> Option<&ToastTimer> {
        self.timers.get(&toast)
    }

    /// Number of toasts that are tracked and not yet dismissed.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    fn start(&self, cx: &mut Cx, toast: NodeId, remaining: Duration) -> (TimerId, Instant) {
        let this = self.this.clone();
        let id = cx.set_timeout(remaining, move |cx| {
            if let Some(scheduler) = this.upgrade() {
                scheduler.borrow_mut().dismiss(cx, toast);
            }
        });
        trace!(toast = %toast, remaining_ms = remaining.as_millis(), "toast countdown started");
        (id, Instant::now())
    }

    /// Starts tracking a toast, running its countdown unless paused.
    pub fn track(&mut self, cx: &mut Cx, toast: NodeId, countdown: Countdown) {
        let mut state = ToastTimer {
            countdown,
            timer: None,
            started: None,
        };
        if let Countdown::Remaining(remaining) = countdown {
            if !self.paused {
                let (id, started) = self.start(cx, toast, remaining);
                state.timer = Some(id);
                state.started = Some(started);
            }
        }
        if let Some(previous) = self.timers.insert(toast, state) {
            if let Some(id) = previous.timer {
                cx.clear_timeout(id);
            }
        }
    }

    fn visible_toasts(&self, doc: &Document) -> Vec<NodeId> {
        self.toaster(doc).map_or_else(Vec::new, |toaster| {
            doc.query_all(toaster, &part(".toast:not([aria-hidden=true])"))
        })
    }

    /// Stops every running countdown, keeping the time that was left.
    pub fn pause_all(&mut self, cx: &mut Cx) {
        if self.paused {
            return;
        }
        self.paused = true;
        let now = Instant::now();
        for toast in self.visible_toasts(&cx.doc) {
            let Some(state) = self.timers.get_mut(&toast) else {
                continue;
            };
            let Some(id) = state.timer.take() else {
                continue;
            };
            cx.clear_timeout(id);
            if let (Countdown::Remaining(remaining), Some(started)) =
                (state.countdown, state.started.take())
            {
                let left = remaining.saturating_sub(now.duration_since(started));
                state.countdown = Countdown::Remaining(left);
            }
        }
        debug!("toast timers paused");
    }

    /// Restarts paused countdowns; a toast with no time left is dismissed
    /// right away.
    pub fn resume_all(&mut self, cx: &mut Cx) {
        if !self.paused {
            return;
        }
        self.paused = false;
        for toast in self.visible_toasts(&cx.doc) {
            let Some(state) = self.timers.get(&toast) else {
                continue;
            };
            let Countdown::Remaining(remaining) = state.countdown else {
                continue;
            };
            if state.timer.is_some() {
                continue;
            }
            if remaining.is_zero() {
                self.dismiss(cx, toast);
                continue;
            }
            let (id, started) = self.start(cx, toast, remaining);
            if let Some(state) = self.timers.get_mut(&toast) {
                state.timer = Some(id);
                state.started = Some(started);
            }
        }
        debug!("toast timers resumed");
    }

    /// Hides a tracked toast and removes it after its exit transition.
    ///
    /// Untracked or already dismissed toasts are ignored.
    pub fn dismiss(&mut self, cx: &mut Cx, toast: NodeId) {
        let Some(state) = self.timers.remove(&toast) else {
            return;
        };
        if let Some(id) = state.timer {
            cx.clear_timeout(id);
        }
        self.handlers.retain(|&button, _| !cx.doc.contains(toast, button));

        if cx.doc.focused().is_some_and(|f| cx.doc.contains(toast, f)) {
            cx.doc.blur();
        }
        cx.doc.set_attr(toast, "aria-hidden", "true");
        cx.after_transition(toast, move |cx| cx.doc.remove(toast));
        debug!(toast = %toast, "toast dismissed");
    }

    /// Forgets toasts and footer controls that left the tree without being
    /// dismissed, cancelling their countdowns. Returns how many toasts were
    /// dropped.
    pub fn prune(&mut self, cx: &mut Cx) -> usize {
        let before = self.timers.len();
        self.timers.retain(|&toast, state| {
            if cx.doc.is_connected(toast) {
                return true;
            }
            if let Some(id) = state.timer {
                cx.timers.cancel(id);
            }
            false
        });
        self.handlers.retain(|&button, _| cx.doc.is_connected(button));
        let dropped = before - self.timers.len();
        if dropped > 0 {
            trace!(dropped, "pruned detached toasts");
        }
        dropped
    }

    fn render(request: &ToastRequest) -> Markup {
        let icon = request
            .icon
            .clone()
            .unwrap_or_else(|| request.category.as_str().to_string());

        let mut section = Markup::new("section");
        if let Some(title) = &request.title {
            section = section.child(Markup::new("h2").text(title));
        }
        if let Some(description) = &request.description {
            section = section.child(Markup::new("p").text(description));
        }

        let mut controls = Vec::new();
        if let Some(action) = &request.action {
            if let Some(href) = &action.href {
                controls.push(
                    Markup::new("a")
                        .attr("href", href)
                        .class("btn")
                        .attr("data-toast-action", "")
                        .text(&action.label),
                );
            } else if action.handler.is_some() {
                controls.push(
                    Markup::new("button")
                        .attr("type", "button")
                        .class("btn")
                        .attr("data-toast-action", "")
                        .text(&action.label),
                );
            }
        }
        if let Some(cancel) = &request.cancel {
            controls.push(
                Markup::new("button")
                    .attr("type", "button")
                    .class("btn-outline")
                    .attr("data-toast-cancel", "")
                    .text(&cancel.label),
            );
        }

        let mut content = Markup::new("div")
            .class("toast-content")
            .child(
                Markup::new("svg")
                    .attr("data-icon", &icon)
                    .attr("aria-hidden", "true"),
            )
            .child(section);
        if !controls.is_empty() {
            content = content.child(Markup::new("footer").children(controls));
        }

        let mut toast = Markup::new("div")
            .id(&format!("toast-{}", Uuid::new_v4()))
            .class("toast")
            .attr("role", request.category.role())
            .attr("aria-atomic", "true")
            .attr("data-category", request.category.as_str());
        if let Some(duration) = request.duration {
            toast = toast.attr("data-duration", &duration.to_string());
        }
        toast.child(content)
    }

    /// Renders a request into the toaster and returns the new toast.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NoToaster`] when no toaster is connected.
    pub fn create(&mut self, cx: &mut Cx, request: &ToastRequest) -> Result<NodeId, RuntimeError> {
        let toaster = self.toaster(&cx.doc).ok_or(RuntimeError::NoToaster)?;
        let toast = cx.doc.insert(toaster, &Self::render(request))?;

        let action = request.action.as_ref().and_then(|a| a.handler.clone());
        if let Some(handler) = action {
            if let Some(button) = cx.doc.query(toast, &part("button[data-toast-action]")) {
                self.handlers.insert(button, handler);
            }
        }
        let cancel = request.cancel.as_ref().and_then(|c| c.handler.clone());
        if let Some(handler) = cancel {
            if let Some(button) = cx.doc.query(toast, &part("button[data-toast-cancel]")) {
                self.handlers.insert(button, handler);
            }
        }
        debug!(toast = %toast, category = %request.category, "toast created");
        Ok(toast)
    }
}

impl Observer<ToastRequest> for ToastScheduler {
    fn observe(&mut self, cx: &mut Cx, request: &ToastRequest) {
        if let Err(e) = self.create(cx, request) {
            error!(error = %e, "dropping toast request");
        }
    }
}

/// The `#toaster` container.
#[derive(Debug)]
pub struct Toaster {
    root: NodeId,
    scheduler: Rc<RefCell<ToastScheduler>>,
}

pub(crate) fn init_toaster(
    _cx: &mut Cx,
    root: NodeId,
    scheduler: &Rc<RefCell<ToastScheduler>>,
) -> Result<Option<WidgetRef>, InitError> {
    scheduler.borrow_mut().toaster = Some(root);
    let widget: WidgetRef = Rc::new(RefCell::new(Toaster {
        root,
        scheduler: Rc::clone(scheduler),
    }));
    Ok(Some(widget))
}

pub(crate) fn init_toast(
    cx: &mut Cx,
    root: NodeId,
    scheduler: &Rc<RefCell<ToastScheduler>>,
) -> Result<Option<WidgetRef>, InitError> {
    let countdown = resolve_countdown(&cx.doc, root, cx.config());
    scheduler.borrow_mut().track(cx, root, countdown);
    Ok(None)
}

impl Toaster {
    fn activate(&self, cx: &mut Cx, control: NodeId, toast: NodeId) {
        let handler = self.scheduler.borrow().handlers.get(&control).cloned();
        if let Some(handler) = handler {
            if let Err(e) = handler(cx, toast) {
                error!(toast = %toast, error = %e, "error executing toast action");
            }
        }
        self.scheduler.borrow_mut().dismiss(cx, toast);
    }
}

impl Widget for Toaster {
    fn component(&self) -> &'static str {
        TOASTER
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&mut self, cx: &mut Cx, event: &mut DomEvent) {
        match event.kind {
            EventKind::PointerEnter if event.target == self.root => {
                self.scheduler.borrow_mut().pause_all(cx);
            }
            EventKind::PointerLeave if event.target == self.root => {
                self.scheduler.borrow_mut().resume_all(cx);
            }
            EventKind::Click => {
                let control = cx
                    .doc
                    .closest(event.target, &part(".toast footer a, .toast footer button"));
                let toast = control.and_then(|c| cx.doc.closest(c, &part(".toast")));
                if let (Some(control), Some(toast)) = (control, toast) {
                    self.activate(cx, control, toast);
                }
            }
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToastAction, ToastCancel};

    fn toast_with(attrs: &[(&str, &str)]) -> (Document, NodeId) {
        let mut doc = Document::new();
        let markup = attrs
            .iter()
            .fold(Markup::new("div").class("toast"), |m, (k, v)| m.attr(k, v));
        let body = doc.body();
        let node = doc.insert(body, &markup).unwrap();
        (doc, node)
    }

    #[test]
    fn countdown_follows_duration_then_category() {
        let config = Config::default();
        let cases: &[(&[(&str, &str)], Countdown)] = &[
            (&[("data-duration", "-1")], Countdown::Disabled),
            (
                &[("data-duration", "1200")],
                Countdown::Remaining(Duration::from_millis(1200)),
            ),
            (
                &[("data-duration", "0"), ("data-category", "error")],
                Countdown::Remaining(Duration::from_millis(5000)),
            ),
            (
                &[("data-duration", "-5")],
                Countdown::Remaining(Duration::from_millis(3000)),
            ),
            (
                &[("data-category", "success")],
                Countdown::Remaining(Duration::from_millis(3000)),
            ),
        ];
        for (attrs, expected) in cases {
            let (doc, node) = toast_with(attrs);
            assert_eq!(resolve_countdown(&doc, node, &config), *expected, "{attrs:?}");
        }
    }

    #[test]
    fn render_builds_footer_controls() {
        let request = ToastRequest::new(ToastCategory::Warning, "Disk almost full")
            .description("2% left")
            .duration(-1)
            .action(ToastAction::link("Manage", "/storage"))
            .cancel(ToastCancel::new("Later"));
        let mut doc = Document::new();
        let body = doc.body();
        let toast = doc.insert(body, &ToastScheduler::render(&request)).unwrap();

        assert_eq!(doc.attr(toast, "role"), Some("status"));
        assert_eq!(doc.attr(toast, "data-duration"), Some("-1"));
        assert!(doc.id_attr(toast).is_some_and(|id| id.starts_with("toast-")));
        let link = doc.query(toast, &part("footer a[data-toast-action]")).unwrap();
        assert_eq!(doc.attr(link, "href"), Some("/storage"));
        assert!(doc.query(toast, &part("footer button[data-toast-cancel]")).is_some());
        let icon = doc.query(toast, &part("svg")).unwrap();
        assert_eq!(doc.attr(icon, "data-icon"), Some("warning"));
    }

    #[test]
    fn create_without_toaster_fails() {
        let mut cx = Cx::new(Config::default());
        let scheduler = ToastScheduler::new();
        let err = scheduler
            .borrow_mut()
            .create(&mut cx, &ToastRequest::new(ToastCategory::Info, "Hi"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NoToaster));
    }

    #[test]
    fn dismiss_is_idempotent() {
        let mut cx = Cx::new(Config::default());
        let scheduler = ToastScheduler::new();
        let body = cx.doc.body();
        let toaster = cx.doc.insert(body, &Markup::new("div").id("toaster")).unwrap();
        init_toaster(&mut cx, toaster, &scheduler).unwrap();

        let toast = scheduler
            .borrow_mut()
            .create(&mut cx, &ToastRequest::new(ToastCategory::Info, "Saved"))
            .unwrap();
        init_toast(&mut cx, toast, &scheduler).unwrap();
        assert_eq!(cx.timers.len(), 1);

        scheduler.borrow_mut().dismiss(&mut cx, toast);
        scheduler.borrow_mut().dismiss(&mut cx, toast);
        assert!(cx.timers.is_empty());
        assert!(!cx.doc.is_alive(toast));
        assert_eq!(scheduler.borrow().active_count(), 0);
    }
}
