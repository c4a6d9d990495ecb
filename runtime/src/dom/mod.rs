//! In-process document tree.
//!
//! The runtime is headless: instead of a browser DOM it operates on an arena
//! of element and text nodes owned by a [`Document`]. Widgets only rely on
//! structure (tags, attributes, classes, text, focus) and on the declared
//! duration of an element's exit/entry transition, never on styling.
//!
//! # Node identity
//!
//! [`NodeId`] is generational. Removing a subtree frees its slots and bumps
//! their generation, so an id held by a side-table never resolves to a node
//! that was created later in the same slot. This is what lets widget and
//! toast state be keyed by node without keeping removed nodes alive.
//!
//! # Mutation records
//!
//! While observation is enabled (see [`crate::watcher::TreeWatcher`]) every
//! insertion into the connected tree is recorded as a [`MutationRecord`].
//! Records are taken in batches with [`Document::take_records`].

pub mod event;
pub mod markup;
pub mod selector;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub use event::{DomEvent, EventKind, Key};
pub use markup::{Markup, MarkupNode};
pub use selector::Selector;

/// Generational handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Errors raised by structural tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node was removed from the document.
    #[error("node {0} no longer exists")]
    StaleNode(NodeId),

    /// The parent is a text node.
    #[error("node {0} cannot have children")]
    NotAContainer(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, DomError>;

/// A batch of nodes inserted into the connected tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Nodes inserted by one structural operation.
    pub added: Vec<NodeId>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    transition: Option<Duration>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

/// Arena-backed document tree with focus tracking and mutation records.
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: NodeId,
    focused: Option<NodeId>,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document containing only a `body` element.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
            observing: false,
            records: Vec::new(),
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// The document's root element.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(data);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                node: Some(data),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.data(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            transition: None,
        }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Returns true while the node has not been removed.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// Returns true if the node is an element (and alive).
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Returns true if the node is attached under the document body.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.body, id)
    }

    /// Parent of a node, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    /// Child nodes in order (empty for stale or text nodes).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map_or(&[], |d| d.children.as_slice())
    }

    /// Element children in order.
    #[must_use]
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    ///
    /// # Errors
    ///
    /// Fails if either node is stale, `parent` is a text node, or `child` is
    /// an ancestor of (or equal to) `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.is_alive(child) {
            return Err(DomError::StaleNode(child));
        }
        if !self.is_element(parent) {
            return if self.is_alive(parent) {
                Err(DomError::NotAContainer(parent))
            } else {
                Err(DomError::StaleNode(parent))
            };
        }
        if self.contains(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        self.detach(child);
        if let Some(data) = self.data_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.data_mut(parent) {
            data.children.push(child);
        }

        if self.observing && self.is_connected(parent) {
            self.records.push(MutationRecord { added: vec![child] });
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(data) = self.data_mut(parent) {
            data.children.retain(|&c| c != id);
        }
        if let Some(data) = self.data_mut(id) {
            data.parent = None;
        }
    }

    /// Removes a node and its whole subtree, invalidating their ids.
    ///
    /// Focus inside the subtree is cleared. Removing the body or a stale node
    /// is a no-op.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.body || !self.is_alive(id) {
            return;
        }
        if self.focused.is_some_and(|f| self.contains(id, f)) {
            self.focused = None;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let slot = &mut self.slots[node.index as usize];
            if let Some(data) = slot.node.take() {
                stack.extend(data.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
    }

    /// Removes every child of a node.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Returns true if `node` is `ancestor` or lies inside it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) {
            return false;
        }
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// The node followed by its ancestors, innermost first.
    #[must_use]
    pub fn ancestors_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.is_alive(id).then_some(id);
        while let Some(n) = current {
            path.push(n);
            current = self.parent(n);
        }
        path
    }

    /// Descendants of `scope` in document order, excluding `scope`.
    #[must_use]
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Lowercase tag name of an element.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    /// Attribute value of an element.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the element carries the attribute.
    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(el) = self.element_mut(id) {
            match el.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value,
                None => el.attributes.push((name.to_string(), value)),
            }
        }
    }

    /// Removes an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attributes.retain(|(k, _)| k != name);
        }
    }

    /// All attributes of an element in insertion order.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map_or(&[], |el| el.attributes.as_slice())
    }

    /// The element's `id` attribute.
    #[must_use]
    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|v| !v.is_empty())
    }

    /// Returns true if the `class` attribute lists `class`.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Adds a class name if missing.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) || !self.is_element(id) {
            return;
        }
        let list = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", list);
    }

    /// Removes a class name if present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(list) = self.attr(id, "class") else {
            return;
        };
        let remaining = list
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", remaining);
    }

    /// Concatenated text of the node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(text)) = self.data(id).map(|d| &d.kind) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.data(node).map(|d| &d.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replaces the children of an element with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if !self.is_element(id) {
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            let _ = self.append_child(id, node);
        }
    }

    /// Declared duration of the element's visual transition, if any.
    #[must_use]
    pub fn transition(&self, id: NodeId) -> Option<Duration> {
        self.element(id)?.transition.filter(|d| !d.is_zero())
    }

    /// Declares (or clears) the duration of the element's visual transition.
    pub fn set_transition(&mut self, id: NodeId, duration: Option<Duration>) {
        if let Some(el) = self.element_mut(id) {
            el.transition = duration;
        }
    }

    /// Returns true if the element matches the selector.
    #[must_use]
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// Nearest inclusive ancestor matching the selector.
    #[must_use]
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors_inclusive(id)
            .into_iter()
            .find(|&n| self.is_element(n) && selector.matches(self, n))
    }

    /// First descendant of `scope` matching the selector.
    #[must_use]
    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.is_element(n) && selector.matches(self, n))
    }

    /// All descendants of `scope` matching the selector, in document order.
    #[must_use]
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.is_element(n) && selector.matches(self, n))
            .collect()
    }

    /// First direct child element matching the selector.
    #[must_use]
    pub fn child_matching(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        self.element_children(id)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// First connected element whose `id` attribute equals `value`.
    #[must_use]
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|&n| self.id_attr(n) == Some(value))
    }

    /// Currently focused element.
    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|&f| self.is_alive(f))
    }

    /// Moves focus to an element.
    pub fn focus(&mut self, id: NodeId) {
        if self.is_element(id) {
            self.focused = Some(id);
        }
    }

    /// Clears focus.
    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// Enables or disables mutation recording. Disabling drops pending records.
    pub fn set_observing(&mut self, observing: bool) {
        self.observing = observing;
        if !observing {
            self.records.clear();
        }
    }

    /// Returns true while mutation records are being collected.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Takes all pending mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Serializes a subtree as indented pseudo-markup, for diagnostics.
    #[must_use]
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self.data(id).map(|d| &d.kind) {
            Some(NodeKind::Text(text)) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(&format!("{indent}{text:?}\n"));
                }
            }
            Some(NodeKind::Element(el)) => {
                out.push_str(&format!("{indent}<{}", el.tag));
                for (k, v) in &el.attributes {
                    out.push_str(&format!(" {k}=\"{v}\""));
                }
                out.push_str(">\n");
                for &child in self.children(id) {
                    self.write_outline(child, depth + 1, out);
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        s.parse().unwrap()
    }

    #[test]
    fn append_and_query() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.add_class(div, "menu");
        let button = doc.create_element("button");
        doc.append_child(doc.body(), div).unwrap();
        doc.append_child(div, button).unwrap();

        assert_eq!(doc.query(doc.body(), &sel(".menu")), Some(div));
        assert_eq!(doc.query_all(div, &sel("button")), vec![button]);
        assert_eq!(doc.closest(button, &sel("div.menu")), Some(div));
        assert!(doc.contains(div, button));
        assert!(doc.is_connected(button));
    }

    #[test]
    fn removed_ids_never_resolve_again() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        doc.append_child(doc.body(), a).unwrap();
        doc.remove(a);
        assert!(!doc.is_alive(a));

        let b = doc.create_element("div");
        assert_ne!(a, b, "slot reuse must bump the generation");
        assert!(!doc.is_alive(a));
        assert!(doc.is_alive(b));
    }

    #[test]
    fn removing_subtree_clears_focus_inside() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(doc.body(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.focus(inner);

        doc.remove(outer);

        assert_eq!(doc.focused(), None);
        assert!(!doc.is_alive(inner));
    }

    #[test]
    fn append_rejects_cycles() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();

        let err = doc.append_child(inner, outer).unwrap_err();
        assert_eq!(
            err,
            DomError::Cycle {
                parent: inner,
                child: outer
            }
        );
    }

    #[test]
    fn class_list_editing() {
        let mut doc = Document::new();
        let el = doc.create_element("li");
        doc.add_class(el, "item");
        doc.add_class(el, "active");
        doc.add_class(el, "active");
        assert_eq!(doc.attr(el, "class"), Some("item active"));

        doc.remove_class(el, "item");
        assert_eq!(doc.attr(el, "class"), Some("active"));
        assert!(doc.has_class(el, "active"));
        assert!(!doc.has_class(el, "item"));
    }

    #[test]
    fn records_only_connected_insertions_while_observing() {
        let mut doc = Document::new();
        let detached_parent = doc.create_element("div");
        let child = doc.create_element("span");

        doc.set_observing(true);
        doc.append_child(detached_parent, child).unwrap();
        assert!(doc.take_records().is_empty());

        doc.append_child(doc.body(), detached_parent).unwrap();
        let records = doc.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added, vec![detached_parent]);

        doc.set_observing(false);
        let other = doc.create_element("p");
        doc.append_child(doc.body(), other).unwrap();
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn text_content_and_set_text() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let t = doc.create_text("Hello ");
        let b = doc.create_element("b");
        doc.append_child(p, t).unwrap();
        doc.append_child(p, b).unwrap();
        doc.set_text(b, "world");
        assert_eq!(doc.text_content(p), "Hello world");

        doc.set_text(p, "replaced");
        assert_eq!(doc.text_content(p), "replaced");
        assert!(!doc.is_alive(b));
    }

    #[test]
    fn zero_transition_counts_as_none() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_transition(el, Some(Duration::ZERO));
        assert_eq!(doc.transition(el), None);
        doc.set_transition(el, Some(Duration::from_millis(150)));
        assert_eq!(doc.transition(el), Some(Duration::from_millis(150)));
    }
}
