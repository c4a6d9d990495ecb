//! Input events routed through the document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Keyboard keys the widgets react to.
///
/// Parsed from DOM `KeyboardEvent.key` names (`"ArrowDown"`, `" "`, `"Enter"`...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Enter,
    Space,
    Escape,
    Tab,
    ArrowDown,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Char(char),
}

impl Key {
    /// DOM name of the key.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Enter => "Enter".to_string(),
            Self::Space => " ".to_string(),
            Self::Escape => "Escape".to_string(),
            Self::Tab => "Tab".to_string(),
            Self::ArrowDown => "ArrowDown".to_string(),
            Self::ArrowUp => "ArrowUp".to_string(),
            Self::ArrowLeft => "ArrowLeft".to_string(),
            Self::ArrowRight => "ArrowRight".to_string(),
            Self::Home => "Home".to_string(),
            Self::End => "End".to_string(),
            Self::Char(c) => c.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "Enter" => Self::Enter,
            " " | "Space" | "Spacebar" => Self::Space,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => return Err(format!("unknown key '{other}'")),
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name()
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Primary-button activation.
    Click,
    /// Key pressed while the target had focus.
    KeyDown(Key),
    /// Pointer moved over the target.
    PointerMove,
    /// Pointer entered the target (does not bubble).
    PointerEnter,
    /// Pointer left the target (does not bubble).
    PointerLeave,
    /// The target's `value` changed through user input.
    Input,
}

/// An event aimed at a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    default_prevented: bool,
}

impl DomEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
        }
    }

    /// Creates a click event.
    #[must_use]
    pub fn click(target: NodeId) -> Self {
        Self::new(EventKind::Click, target)
    }

    /// Creates a keydown event.
    #[must_use]
    pub fn key(target: NodeId, key: Key) -> Self {
        Self::new(EventKind::KeyDown(key), target)
    }

    /// Marks the event as handled so hosts skip their default action.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Returns true once a handler called [`DomEvent::prevent_default`].
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}
