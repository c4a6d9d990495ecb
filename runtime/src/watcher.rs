//! Tree-mutation watcher.
//!
//! This module turns the document's mutation records into a list of newly
//! inserted elements for the registry to initialize.
//!
//! # Architecture
//!
//! The [`Document`] records insertions into the connected tree only while
//! observation is enabled. [`TreeWatcher::start`] enables it and
//! [`TreeWatcher::stop`] disables it, discarding anything pending, so a
//! later start re-attaches cleanly. The page drains the watcher at the end of
//! every turn:
//!
//! 1. Records are taken in the order they were produced
//! 2. Text nodes are dropped
//! 3. Nodes that were removed or detached again before delivery are dropped
//!
//! The registry then expands each remaining node to node-then-descendants,
//! which matches full-tree discovery order for nested widgets.

use tracing::{debug, trace};

use crate::dom::{Document, NodeId};

/// Feeds newly inserted elements to the registry.
#[derive(Debug, Default)]
pub struct TreeWatcher {
    running: bool,
}

impl TreeWatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts observing insertions. Starting twice is a no-op.
    pub fn start(&mut self, doc: &mut Document) {
        if self.running {
            return;
        }
        self.running = true;
        doc.set_observing(true);
        debug!("tree watcher started");
    }

    /// Stops observing and discards pending records.
    pub fn stop(&mut self, doc: &mut Document) {
        if !self.running {
            return;
        }
        self.running = false;
        doc.set_observing(false);
        debug!("tree watcher stopped");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Takes pending records and returns the inserted elements that are
    /// still connected, in insertion order.
    pub fn drain(&self, doc: &mut Document) -> Vec<NodeId> {
        if !self.running {
            return Vec::new();
        }
        let added: Vec<NodeId> = doc
            .take_records()
            .into_iter()
            .flat_map(|record| record.added)
            .filter(|&node| doc.is_element(node) && doc.is_connected(node))
            .collect();
        if !added.is_empty() {
            trace!(count = added.len(), "inserted elements");
        }
        added
    }
}
