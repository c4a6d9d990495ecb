//! Built-in component kinds.
//!
//! Each widget is an explicit struct bound to one root element. The page
//! keeps them in a [`WidgetTable`] keyed by the root's generational id, so a
//! widget whose root was removed is simply pruned; its channel subscriptions
//! are weak and end with it.

pub mod dropdown;
pub mod popover;
pub mod select;
pub mod sidebar;
pub mod tabs;
pub mod toast;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::cx::Cx;
use crate::dom::{Document, DomEvent, NodeId, Selector};
use crate::error::{InitError, RegistryError};
use crate::registry::Registry;

pub use dropdown::DropdownMenu;
pub use popover::Popover;
pub use select::Select;
pub use sidebar::Sidebar;
pub use tabs::Tabs;
pub use toast::{Countdown, ToastScheduler, ToastTimer, Toaster};

/// An initialized component instance.
pub trait Widget: Any {
    /// Registry name of the component kind.
    fn component(&self) -> &'static str;

    /// The element this widget is bound to.
    fn root(&self) -> NodeId;

    /// Called for events whose target is inside the root, innermost widget
    /// first.
    fn handle_event(&mut self, _cx: &mut Cx, _event: &mut DomEvent) {}

    /// Called for every event after local delivery, like a listener on the
    /// document.
    fn handle_document_event(&mut self, _cx: &mut Cx, _event: &DomEvent) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to a widget.
pub type WidgetRef = Rc<RefCell<dyn Widget>>;

/// Initialized widgets in initialization order.
#[derive(Default)]
pub struct WidgetTable {
    entries: Vec<(NodeId, &'static str, WidgetRef)>,
}

impl std::fmt::Debug for WidgetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(root, component, _)| (root, component)))
            .finish()
    }
}

impl WidgetTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a widget, replacing any widget of the same kind on the same
    /// root in place.
    pub fn insert(&mut self, widget: WidgetRef) {
        let (root, component) = {
            let w = widget.borrow();
            (w.root(), w.component())
        };
        match self
            .entries
            .iter_mut()
            .find(|(r, c, _)| *r == root && *c == component)
        {
            Some(entry) => entry.2 = widget,
            None => self.entries.push((root, component, widget)),
        }
    }

    /// Widget of `component` kind bound to `root`.
    #[must_use]
    pub fn get(&self, root: NodeId, component: &str) -> Option<WidgetRef> {
        self.entries
            .iter()
            .find(|(r, c, _)| *r == root && *c == component)
            .map(|(_, _, w)| Rc::clone(w))
    }

    /// Widgets bound to `root`, in initialization order.
    #[must_use]
    pub fn bound_to(&self, root: NodeId) -> Vec<WidgetRef> {
        self.entries
            .iter()
            .filter(|(r, _, _)| *r == root)
            .map(|(_, _, w)| Rc::clone(w))
            .collect()
    }

    /// Every widget, in initialization order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WidgetRef> {
        self.entries.iter().map(|(_, _, w)| Rc::clone(w)).collect()
    }

    /// Drops widgets whose root no longer exists. Returns how many.
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(root, component, _)| {
            let alive = doc.is_alive(*root);
            if !alive {
                debug!(component = *component, root = %root, "dropping widget of removed root");
            }
            alive
        });
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of widgets of the given kind.
    #[must_use]
    pub fn count_of(&self, component: &str) -> usize {
        self.entries.iter().filter(|(_, c, _)| *c == component).count()
    }
}

/// Parses a selector that is known to be valid.
///
/// Widget part selectors are literals; a parse failure is a programming error
/// and matches nothing.
pub(crate) fn part(source: &str) -> Selector {
    Selector::parse(source).unwrap_or_else(|_| Selector::never())
}

/// Builds an [`InitError::MissingParts`] naming every absent part.
pub(crate) fn missing_parts(component: &'static str, parts: &[(&'static str, bool)]) -> InitError {
    InitError::MissingParts {
        component,
        missing: parts
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect(),
    }
}

/// Registers every built-in component kind.
///
/// Returns the toast scheduler shared by the `toaster` and `toast` kinds.
///
/// # Errors
///
/// Propagates registry errors; the built-in selectors are all valid.
pub fn register_builtins(registry: &mut Registry) -> Result<Rc<RefCell<ToastScheduler>>, RegistryError> {
    registry.register("dropdown-menu", ".dropdown-menu", dropdown::init)?;
    registry.register("popover", ".popover", popover::init)?;
    registry.register("select", "div.select", select::init)?;
    registry.register("sidebar", ".sidebar", sidebar::init)?;
    registry.register("tabs", ".tabs", tabs::init)?;

    let scheduler = ToastScheduler::new();
    let for_toaster = Rc::clone(&scheduler);
    registry.register("toaster", "#toaster", move |cx: &mut Cx, root: NodeId| {
        toast::init_toaster(cx, root, &for_toaster)
    })?;
    let for_toast = Rc::clone(&scheduler);
    registry.register("toast", ".toast", move |cx: &mut Cx, root: NodeId| {
        toast::init_toast(cx, root, &for_toast)
    })?;
    Ok(scheduler)
}
