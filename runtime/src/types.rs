//! Payload types carried on the runtime's broadcast channels.
//!
//! Each channel in [`crate::channel::Bus`] carries exactly one of these
//! message types. The serializable ones ([`SidebarCommand`],
//! [`ToastRequest`]) are also what the `trellis` CLI reads from scripts.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cx::Cx;
use crate::dom::NodeId;
use crate::error::ActionError;

/// Name of the overlay mutual-exclusion channel.
pub const OVERLAY_EVENT: &str = "trellis:popover";

/// Name of the sidebar control channel.
pub const SIDEBAR_EVENT: &str = "trellis:sidebar";

/// Name of the location-change channel.
pub const LOCATION_EVENT: &str = "trellis:locationchange";

/// Name of the notification creation channel.
pub const TOAST_EVENT: &str = "trellis:toast";

/// Name of the widget lifecycle channel.
pub const SIGNAL_EVENT: &str = "trellis:signal";

/// Announcement that an overlay widget is about to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOpening {
    /// Root of the widget that is opening.
    pub source: NodeId,
}

/// What a [`SidebarCommand`] asks the sidebar to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarAction {
    Open,
    Close,
    #[default]
    Toggle,
}

/// Programmatic sidebar control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarCommand {
    /// Only the sidebar with this `id` attribute reacts; `None` addresses all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub action: SidebarAction,
}

impl SidebarCommand {
    /// A command addressed to every sidebar.
    #[must_use]
    pub fn all(action: SidebarAction) -> Self {
        Self { id: None, action }
    }

    /// A command addressed to the sidebar with the given id.
    #[must_use]
    pub fn to(id: impl Into<String>, action: SidebarAction) -> Self {
        Self {
            id: Some(id.into()),
            action,
        }
    }
}

/// How the location changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationCause {
    /// `push_state` was called.
    Push,
    /// `replace_state` was called.
    Replace,
    /// Native back/forward traversal.
    Traverse,
}

/// The current location after a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationChange {
    pub path: String,
    pub cause: NavigationCause,
}

/// Lifecycle and value notifications emitted by widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetSignal {
    /// A root was successfully initialized by a component.
    Initialized { component: String, root: NodeId },
    /// A picker committed a new value.
    Changed { root: NodeId, value: String },
}

/// Notification category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastCategory {
    Success,
    Error,
    #[default]
    Info,
    Warning,
}

impl ToastCategory {
    /// Attribute value used for `data-category`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }

    /// ARIA role of a toast in this category.
    #[must_use]
    pub fn role(self) -> &'static str {
        match self {
            Self::Error => "alert",
            _ => "status",
        }
    }
}

impl fmt::Display for ToastCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run when a toast's action or cancel button is activated.
///
/// Receives the toast's root. The toast is dismissed afterwards either way;
/// an error is logged.
pub type ToastHandler = Rc<dyn Fn(&mut Cx, NodeId) -> Result<(), ActionError>>;

/// Primary control in a toast footer: a link or a button with a handler.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ToastAction {
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(skip)]
    pub handler: Option<ToastHandler>,
}

impl ToastAction {
    /// An action rendered as a link.
    #[must_use]
    pub fn link(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: Some(href.into()),
            handler: None,
        }
    }

    /// An action rendered as a button running `handler`.
    #[must_use]
    pub fn button<F>(label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Cx, NodeId) -> Result<(), ActionError> + 'static,
    {
        Self {
            label: label.into(),
            href: None,
            handler: Some(Rc::new(handler)),
        }
    }
}

impl fmt::Debug for ToastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastAction")
            .field("label", &self.label)
            .field("href", &self.href)
            .field("handler", &self.handler.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Secondary footer control.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ToastCancel {
    pub label: String,

    #[serde(skip)]
    pub handler: Option<ToastHandler>,
}

impl ToastCancel {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            handler: None,
        }
    }

    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Cx, NodeId) -> Result<(), ActionError> + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }
}

impl fmt::Debug for ToastCancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastCancel")
            .field("label", &self.label)
            .field("handler", &self.handler.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Request to render a notification.
///
/// ```json
/// { "category": "error", "title": "Save failed", "duration": 8000 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToastRequest {
    #[serde(default)]
    pub category: ToastCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ToastAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<ToastCancel>,

    /// Milliseconds before auto-dismissal; `-1` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// Icon name overriding the category icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ToastRequest {
    /// A request with the given category and title.
    #[must_use]
    pub fn new(category: ToastCategory, title: impl Into<String>) -> Self {
        Self {
            category,
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn duration(mut self, millis: i64) -> Self {
        self.duration = Some(millis);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ToastAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn cancel(mut self, cancel: ToastCancel) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}
