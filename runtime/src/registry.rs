//! Component registry and lifecycle.
//!
//! A component kind is a name, a discovery selector and an initializer. The
//! registry conjoins every discovery selector with "lacks the
//! `data-{name}-initialized` marker", so running discovery twice never
//! initializes an element twice. Reinitializing a kind clears its markers
//! first.
//!
//! Initializer failures are logged per element and never abort the pass.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::cx::Cx;
use crate::dom::{NodeId, Selector};
use crate::error::{InitError, RegistryError};
use crate::types::WidgetSignal;
use crate::widgets::{WidgetRef, WidgetTable};

/// Builds the widget for one root.
///
/// `Ok(None)` marks the root initialized without keeping a widget in the
/// table (used for roots whose state lives elsewhere, such as toasts).
pub type Initializer = Rc<dyn Fn(&mut Cx, NodeId) -> Result<Option<WidgetRef>, InitError>>;

/// A registered component kind.
#[derive(Clone)]
pub struct ComponentDescriptor {
    name: String,
    /// Discovery selector excluding initialized roots.
    selector: Selector,
    /// Matches roots carrying the marker.
    marked: Selector,
    marker: String,
    initializer: Initializer,
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("selector", &self.selector.as_str())
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

impl ComponentDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discovery selector, including the marker exclusion.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Attribute set on every initialized root.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

/// Marker attribute for a component name.
#[must_use]
pub fn marker_for(name: &str) -> String {
    format!("data-{name}-initialized")
}

/// Name-keyed component kinds in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: Vec<ComponentDescriptor>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component kind. Re-registering a name replaces the
    /// previous descriptor and keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSelector`] if `selector` does not
    /// parse.
    pub fn register<F>(&mut self, name: &str, selector: &str, initializer: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut Cx, NodeId) -> Result<Option<WidgetRef>, InitError> + 'static,
    {
        let invalid = |source| RegistryError::InvalidSelector {
            name: name.to_string(),
            source,
        };
        let marker = marker_for(name);
        let base = Selector::parse(selector).map_err(invalid)?;
        let marked = Selector::parse(&format!("[{marker}]")).map_err(invalid)?;

        let descriptor = ComponentDescriptor {
            name: name.to_string(),
            selector: base.without_attr(&marker),
            marked,
            marker,
            initializer: Rc::new(initializer),
        };
        debug!(component = name, selector = %descriptor.selector, "registered component");

        match self.descriptors.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Initializes every uninitialized match of every kind, kinds in
    /// registration order. Returns how many roots were initialized.
    pub fn initialize_all(&self, cx: &mut Cx, widgets: &mut WidgetTable) -> usize {
        let body = cx.doc.body();
        self.descriptors
            .iter()
            .map(|descriptor| {
                let matches = cx.doc.query_all(body, &descriptor.selector);
                initialize_each(cx, widgets, descriptor, matches)
            })
            .sum()
    }

    /// Initializes `node` and its descendants for every kind.
    ///
    /// Within a kind the node itself comes first, then descendants in
    /// document order.
    pub fn initialize_node(&self, cx: &mut Cx, widgets: &mut WidgetTable, node: NodeId) -> usize {
        if !cx.doc.is_element(node) {
            return 0;
        }
        self.descriptors
            .iter()
            .map(|descriptor| {
                let mut matches = Vec::new();
                if descriptor.selector.matches(&cx.doc, node) {
                    matches.push(node);
                }
                matches.extend(cx.doc.query_all(node, &descriptor.selector));
                initialize_each(cx, widgets, descriptor, matches)
            })
            .sum()
    }

    /// Clears the marker of every root initialized as `name` and
    /// initializes all matches again.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownComponent`] (after logging a warning)
    /// if `name` was never registered.
    pub fn reinitialize(
        &self,
        cx: &mut Cx,
        widgets: &mut WidgetTable,
        name: &str,
    ) -> Result<usize, RegistryError> {
        let Some(descriptor) = self.get(name) else {
            warn!(component = name, "component '{name}' not found in registry");
            return Err(RegistryError::UnknownComponent(name.to_string()));
        };
        clear_markers(cx, descriptor);
        let matches = cx.doc.query_all(cx.doc.body(), &descriptor.selector);
        Ok(initialize_each(cx, widgets, descriptor, matches))
    }

    /// Clears every marker and runs [`Registry::initialize_all`].
    pub fn reinitialize_all(&self, cx: &mut Cx, widgets: &mut WidgetTable) -> usize {
        for descriptor in &self.descriptors {
            clear_markers(cx, descriptor);
        }
        self.initialize_all(cx, widgets)
    }
}

fn clear_markers(cx: &mut Cx, descriptor: &ComponentDescriptor) {
    for node in cx.doc.query_all(cx.doc.body(), &descriptor.marked) {
        cx.doc.remove_attr(node, &descriptor.marker);
    }
}

fn initialize_each(
    cx: &mut Cx,
    widgets: &mut WidgetTable,
    descriptor: &ComponentDescriptor,
    nodes: Vec<NodeId>,
) -> usize {
    let mut initialized = 0;
    for node in nodes {
        // An earlier initializer in this pass may have removed or claimed it.
        if !cx.doc.is_alive(node) || !descriptor.selector.matches(&cx.doc, node) {
            continue;
        }
        match (descriptor.initializer)(cx, node) {
            Ok(widget) => {
                cx.doc.set_attr(node, &descriptor.marker, "true");
                if let Some(widget) = widget {
                    widgets.insert(widget);
                }
                debug!(component = %descriptor.name, node = %node, "initialized");
                cx.emit(WidgetSignal::Initialized {
                    component: descriptor.name.clone(),
                    root: node,
                });
                initialized += 1;
            }
            Err(e) => {
                error!(component = %descriptor.name, node = %node, error = %e, "failed to initialize component");
            }
        }
    }
    initialized
}
