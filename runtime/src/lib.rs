//! Trellis - headless runtime for accessible UI widgets.
//!
//! This crate discovers widget markup in a document tree, wires keyboard and
//! pointer behavior and ARIA state onto it, and coordinates the widgets
//! through explicit broadcast channels.
//!
//! # Overview
//!
//! A [`Page`] owns an arena [`Document`], a component [`Registry`] and the
//! widgets it created. The host inserts markup, calls [`Page::start`], and
//! then feeds input events and lets time pass. Widgets never reference each
//! other: opening an overlay publishes on the overlay channel and every other
//! open overlay closes itself without stealing focus.
//!
//! ```
//! use trellis_runtime::{Config, Markup, Page};
//!
//! let popover = Markup::new("div")
//!     .class("popover")
//!     .child(Markup::new("button").id("open"))
//!     .child(Markup::new("div").attr("data-popover", ""));
//!
//! let mut page = Page::from_markup(Config::default(), [&popover])?;
//! page.start();
//!
//! let trigger = page.element("open").expect("trigger exists");
//! page.click(trigger);
//! assert_eq!(page.doc().attr(trigger, "aria-expanded"), Some("true"));
//! # Ok::<(), trellis_runtime::RuntimeError>(())
//! ```
//!
//! # Modules
//!
//! - [`dom`]: arena document, selectors, markup and input events
//! - [`registry`]: component kinds and the initialization lifecycle
//! - [`watcher`]: feeds inserted elements to the registry
//! - [`channel`]: publish/observe channels and the page [`Bus`]
//! - [`nav`]: active-item navigation shared by the menu and the picker
//! - [`widgets`]: the built-in component kinds
//! - [`page`]: event dispatch, timer pumping and the settle loop
//! - [`driver`]: async loop driving a page from host input and timers
//! - [`script`]: JSON documents and interaction scripts
//! - [`config`]: configuration from environment variables
//! - [`error`]: error types

pub mod channel;
pub mod config;
pub mod cx;
pub mod dom;
pub mod driver;
pub mod error;
pub mod history;
pub mod nav;
pub mod page;
pub mod registry;
pub mod script;
pub mod timer;
pub mod types;
pub mod watcher;
pub mod widgets;

pub use channel::{Bus, Channel, Observer, Subscription};
pub use config::{Config, ConfigError};
pub use cx::Cx;
pub use dom::{Document, DomEvent, EventKind, Key, Markup, NodeId, Selector};
pub use error::{ActionError, InitError, RegistryError, Result, RuntimeError};
pub use page::Page;
pub use registry::Registry;
pub use types::{
    LocationChange, NavigationCause, OverlayOpening, SidebarAction, SidebarCommand, ToastAction,
    ToastCancel, ToastCategory, ToastRequest, WidgetSignal,
};
pub use widgets::{Countdown, DropdownMenu, Popover, Select, Sidebar, Tabs, Widget};
