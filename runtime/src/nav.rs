//! Active-item tracking for overlay lists.
//!
//! [`ActiveList`] is the state machine shared by the dropdown menu and the
//! select picker. It holds the enabled items captured when the overlay
//! opened, the subset currently passing a filter, and the active index.
//!
//! `active` is always an index into the full item list, even while a filter
//! restricts navigation to the visible subset. Every move therefore
//! translates from the item index to the visible position and back.

use crate::dom::{Document, NodeId};

/// CSS class marking the active item.
pub const ACTIVE_CLASS: &str = "active";

/// A keyboard navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// One step down, clamped at the last visible item.
    Next,
    /// One step up, clamped at the first visible item.
    Prev,
    First,
    Last,
}

/// Returns true unless the element is `disabled` or `aria-disabled="true"`.
#[must_use]
pub fn is_enabled(doc: &Document, node: NodeId) -> bool {
    !doc.has_attr(node, "disabled") && doc.attr(node, "aria-disabled") != Some("true")
}

/// Ordered items with an optional filter and an active index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveList {
    items: Vec<NodeId>,
    visible: Vec<usize>,
    active: Option<usize>,
}

impl ActiveList {
    /// Creates a list with every item visible and nothing active.
    #[must_use]
    pub fn new(items: Vec<NodeId>) -> Self {
        let visible = (0..items.len()).collect();
        Self {
            items,
            visible,
            active: None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item indices that pass the current filter, in order.
    #[must_use]
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    /// Visible item handles, in order.
    #[must_use]
    pub fn visible_items(&self) -> Vec<NodeId> {
        self.visible.iter().map(|&i| self.items[i]).collect()
    }

    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn active_item(&self) -> Option<NodeId> {
        self.active.map(|i| self.items[i])
    }

    #[must_use]
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.items.iter().position(|&n| n == node)
    }

    #[must_use]
    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    /// Restricts navigation to `indices`. Out-of-range indices are dropped.
    pub fn set_visible(&mut self, indices: impl IntoIterator<Item = usize>) {
        let len = self.items.len();
        self.visible = indices.into_iter().filter(|&i| i < len).collect();
    }

    /// Makes every item visible again.
    pub fn show_all(&mut self) {
        self.visible = (0..self.items.len()).collect();
    }

    /// Item index a move would land on, or `None` when nothing is visible.
    ///
    /// From no active item (or an active item that is filtered out), `Next`
    /// lands on the first visible item and `Prev` on the last.
    #[must_use]
    pub fn target(&self, step: Move) -> Option<usize> {
        let last = self.visible.len().checked_sub(1)?;
        let position = self
            .active
            .and_then(|a| self.visible.iter().position(|&v| v == a));
        let next = match (step, position) {
            (Move::First, _) | (Move::Next, None) => 0,
            (Move::Last, _) | (Move::Prev, None) => last,
            (Move::Next, Some(p)) => (p + 1).min(last),
            (Move::Prev, Some(p)) => p.saturating_sub(1),
        };
        Some(self.visible[next])
    }

    /// Sets the active index and mirrors it into the document.
    ///
    /// The previous item loses the `active` class and the new one gains it.
    /// `owner` gets `aria-activedescendant` pointing at the new item when it
    /// has an id, and loses it otherwise.
    pub fn set_active(&mut self, doc: &mut Document, owner: NodeId, index: Option<usize>) {
        if let Some(previous) = self.active_item() {
            doc.remove_class(previous, ACTIVE_CLASS);
        }
        self.active = index.filter(|&i| i < self.items.len());

        let descendant = self.active_item().and_then(|item| {
            doc.add_class(item, ACTIVE_CLASS);
            doc.id_attr(item).map(str::to_string)
        });
        match descendant {
            Some(id) => doc.set_attr(owner, "aria-activedescendant", id),
            None => doc.remove_attr(owner, "aria-activedescendant"),
        }
    }

    /// Applies `step` and returns true if the active item changed.
    pub fn step(&mut self, doc: &mut Document, owner: NodeId, step: Move) -> bool {
        match self.target(step) {
            Some(index) if Some(index) != self.active => {
                self.set_active(doc, owner, Some(index));
                true
            }
            _ => false,
        }
    }
}
