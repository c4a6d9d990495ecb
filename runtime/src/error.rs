//! Error types for the Trellis runtime.
//!
//! Every failure in this crate is local to one widget or one request: errors
//! are logged where they are caught and never abort unrelated widgets.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dom::selector::SelectorError;
use crate::dom::{DomError, NodeId};

/// Errors that can occur during runtime operations.
///
/// This is the primary error type for the crate, wrapping the more specific
/// errors below.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Structural tree operation failed.
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// A selector failed to parse.
    #[error("selector error: {0}")]
    Selector(#[from] SelectorError),

    /// Component registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A notification was requested before any toaster was initialized.
    #[error("cannot create toast: toaster container not found on page")]
    NoToaster,

    /// No initialized widget of the expected kind is bound to the node.
    #[error("no {component} widget is bound to node {root}")]
    WidgetNotFound {
        component: &'static str,
        root: NodeId,
    },

    /// A script step named an element that does not exist.
    #[error("no element matches '{0}'")]
    NoMatch(String),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by component initializers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Required sub-elements are absent from the widget root.
    #[error("{component} initialisation failed. Missing element(s): {}", .missing.join(", "))]
    MissingParts {
        component: &'static str,
        missing: Vec<&'static str>,
    },

    /// The initializer could not build its markup.
    #[error("{component} initialisation failed: {source}")]
    Dom {
        component: &'static str,
        #[source]
        source: DomError,
    },
}

/// Errors reported by the component registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A lifecycle call named a component kind that was never registered.
    #[error("component '{0}' not found in registry")]
    UnknownComponent(String),

    /// The discovery selector given at registration did not parse.
    #[error("invalid selector for component '{name}': {source}")]
    InvalidSelector {
        name: String,
        #[source]
        source: SelectorError,
    },
}

/// Error raised by a user-supplied notification action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The handler reported a failure.
    #[error("toast action failed: {0}")]
    Failed(String),
}

impl ActionError {
    /// Convenience constructor for handler failures.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A specialized `Result` type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parts_display_names_every_part() {
        let err = InitError::MissingParts {
            component: "Dropdown menu",
            missing: vec!["trigger", "menu"],
        };
        assert_eq!(
            err.to_string(),
            "Dropdown menu initialisation failed. Missing element(s): trigger, menu"
        );
    }

    #[test]
    fn unknown_component_display() {
        let err = RegistryError::UnknownComponent("carousel".to_string());
        assert_eq!(err.to_string(), "component 'carousel' not found in registry");
    }

    #[test]
    fn no_toaster_display() {
        assert_eq!(
            RuntimeError::NoToaster.to_string(),
            "cannot create toast: toaster container not found on page"
        );
    }

    #[test]
    fn registry_error_converts_into_runtime_error() {
        let err: RuntimeError = RegistryError::UnknownComponent("x".to_string()).into();
        assert!(matches!(err, RuntimeError::Registry(_)));
        assert_eq!(
            err.to_string(),
            "registry error: component 'x' not found in registry"
        );
    }

    #[test]
    fn invalid_selector_keeps_source_chain() {
        use std::error::Error;

        let err = RegistryError::InvalidSelector {
            name: "menu".to_string(),
            source: SelectorError::Empty(String::new()),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn action_error_display() {
        let err = ActionError::failed("network down");
        assert_eq!(err.to_string(), "toast action failed: network down");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "page.json");
        let err: RuntimeError = io_err.into();
        assert!(matches!(err, RuntimeError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
