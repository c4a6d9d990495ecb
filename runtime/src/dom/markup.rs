//! Declarative element trees.
//!
//! [`Markup`] describes a subtree that can be built into a [`Document`]. It
//! deserializes from JSON, which is how the `trellis` CLI loads pages:
//!
//! ```json
//! { "tag": "div", "attrs": { "class": "popover" }, "children": [
//!     { "tag": "button", "children": ["Open"] },
//!     { "tag": "div", "attrs": { "data-popover": "" }, "transition_ms": 150 }
//! ] }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Document, NodeId, Result};

/// An element with attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    pub tag: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    /// Declared duration of the element's visual transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MarkupNode>,
}

/// A child of a [`Markup`] element: a JSON string is a text node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkupNode {
    Text(String),
    Element(Markup),
}

impl Markup {
    /// Starts an element description.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            transition_ms: None,
            children: Vec::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the `id` attribute.
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Appends a class name.
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let list = match self.attrs.get("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.attrs.insert("class".to_string(), list);
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(MarkupNode::Element(child));
        self
    }

    /// Appends several child elements.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children
            .extend(children.into_iter().map(MarkupNode::Element));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.children.push(MarkupNode::Text(text.to_string()));
        self
    }

    /// Declares a transition duration.
    #[must_use]
    pub fn transition(mut self, duration: Duration) -> Self {
        self.transition_ms = Some(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

impl Document {
    /// Builds a detached subtree from markup and returns its root.
    pub fn build(&mut self, markup: &Markup) -> NodeId {
        let node = self.create_element(&markup.tag);
        for (name, value) in &markup.attrs {
            self.set_attr(node, name, value.as_str());
        }
        if let Some(ms) = markup.transition_ms {
            self.set_transition(node, Some(Duration::from_millis(ms)));
        }
        for child in &markup.children {
            let child_node = match child {
                MarkupNode::Text(text) => self.create_text(text),
                MarkupNode::Element(el) => self.build(el),
            };
            // Freshly created nodes cannot form cycles.
            let _ = self.append_child(node, child_node);
        }
        node
    }

    /// Builds markup and appends it under `parent` as one insertion.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is stale or not an element.
    pub fn insert(&mut self, parent: NodeId, markup: &Markup) -> Result<NodeId> {
        let node = self.build(markup);
        if let Err(e) = self.append_child(parent, node) {
            self.remove(node);
            return Err(e);
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    #[test]
    fn builds_nested_markup_as_a_single_record() {
        let mut doc = Document::new();
        doc.set_observing(true);
        let markup = Markup::new("div")
            .class("popover")
            .child(Markup::new("button").text("Open"))
            .child(
                Markup::new("div")
                    .attr("data-popover", "")
                    .transition(Duration::from_millis(150)),
            );

        let root = doc.insert(doc.body(), &markup).unwrap();

        assert_eq!(doc.take_records().len(), 1);
        let content = doc
            .query(root, &Selector::parse("[data-popover]").unwrap())
            .unwrap();
        assert_eq!(doc.transition(content), Some(Duration::from_millis(150)));
        assert_eq!(doc.text_content(root), "Open");
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "tag": "div",
            "attrs": { "class": "tabs" },
            "children": ["label", { "tag": "span" }]
        }"#;
        let markup: Markup = serde_json::from_str(json).unwrap();
        assert_eq!(markup.tag, "div");
        assert_eq!(markup.children.len(), 2);
        assert!(matches!(&markup.children[0], MarkupNode::Text(t) if t == "label"));
    }
}
