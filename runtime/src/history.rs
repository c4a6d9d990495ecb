//! Session history for the headless page.
//!
//! [`MemoryHistory`] is a plain entry stack. Location-change notifications
//! are published by [`crate::cx::Cx`], which wraps `push_state` and
//! `replace_state` once [`MemoryHistory::install_tracking`] has run.

use tracing::debug;

/// In-memory back/forward stack.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    index: usize,
    tracking: bool,
}

impl MemoryHistory {
    /// Creates a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            index: 0,
            tracking: false,
        }
    }

    /// Current location path.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.entries[self.index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry after the current one, discarding forward entries.
    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(path.into());
        self.index = self.entries.len() - 1;
    }

    /// Overwrites the current entry.
    pub fn replace(&mut self, path: impl Into<String>) {
        self.entries[self.index] = path.into();
    }

    /// Moves one entry back. Returns false at the start of history.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Moves one entry forward. Returns false at the end of history.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Turns on location-change publishing for `push`/`replace`.
    ///
    /// Returns false if tracking was already installed.
    pub fn install_tracking(&mut self) -> bool {
        if self.tracking {
            return false;
        }
        self.tracking = true;
        debug!("location tracking installed");
        true
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_discards_forward_entries() {
        let mut history = MemoryHistory::new("/");
        history.push("/a");
        history.push("/b");
        assert!(history.back());
        assert_eq!(history.location(), "/a");

        history.push("/c");
        assert!(!history.forward());
        assert_eq!(history.location(), "/c");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn back_and_forward_stop_at_the_ends() {
        let mut history = MemoryHistory::new("/");
        assert!(!history.back());
        history.push("/docs");
        assert!(history.back());
        assert!(!history.back());
        assert!(history.forward());
        assert!(!history.forward());
        assert_eq!(history.location(), "/docs");
    }

    #[test]
    fn replace_keeps_length() {
        let mut history = MemoryHistory::new("/");
        history.replace("/home");
        assert_eq!(history.location(), "/home");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn tracking_installs_once() {
        let mut history = MemoryHistory::new("/");
        assert!(history.install_tracking());
        assert!(!history.install_tracking());
        assert!(history.is_tracking());
    }
}
