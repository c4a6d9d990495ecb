//! Responsive sidebar.
//!
//! The open state is seeded from `data-initial-open` (default open) on wide
//! viewports and `data-initial-mobile-open` (default closed) below the
//! breakpoint, then driven by clicks and [`SidebarCommand`]s. Links whose
//! path equals the current location are marked `aria-current="page"`.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{part, Widget, WidgetRef};
use crate::channel::Observer;
use crate::cx::Cx;
use crate::dom::{DomEvent, EventKind, NodeId};
use crate::error::InitError;
use crate::types::{LocationChange, SidebarAction, SidebarCommand};

pub const COMPONENT: &str = "sidebar";

#[derive(Debug)]
pub struct Sidebar {
    root: NodeId,
    id: Option<String>,
    open: bool,
    breakpoint: i64,
}

pub(crate) fn init(cx: &mut Cx, root: NodeId) -> Result<Option<WidgetRef>, InitError> {
    let doc = &cx.doc;
    let initial_open = doc.attr(root, "data-initial-open") != Some("false");
    let initial_mobile_open = doc.attr(root, "data-initial-mobile-open") == Some("true");
    let breakpoint = doc
        .attr(root, "data-breakpoint")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|&b| b != 0)
        .unwrap_or_else(|| i64::from(cx.config().sidebar_breakpoint));

    let open = if breakpoint > 0 {
        if i64::from(cx.viewport_width()) >= breakpoint {
            initial_open
        } else {
            initial_mobile_open
        }
    } else {
        initial_open
    };

    let sidebar = Sidebar {
        root,
        id: doc.id_attr(root).map(str::to_string),
        open,
        breakpoint,
    };
    sidebar.sync_state(cx);
    update_current_links(cx, root);

    let widget = Rc::new(RefCell::new(sidebar));
    let bus = cx.bus();
    bus.sidebar.subscribe(&widget);
    bus.location.subscribe(&widget);
    let widget: WidgetRef = widget;
    Ok(Some(widget))
}

/// Path component of a link target, resolved against `location`.
fn link_path(href: &str, location: &str) -> String {
    let href = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if let Some((_, rest)) = href.split_once("://") {
        return rest.find('/').map_or_else(|| "/".to_string(), |i| rest[i..].to_string());
    }
    if href.starts_with('/') {
        return href.to_string();
    }
    if href.is_empty() {
        return location.to_string();
    }
    let base = location.rfind('/').map_or("", |i| &location[..=i]);
    format!("{base}{href}")
}

fn trim_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

fn update_current_links(cx: &mut Cx, root: NodeId) {
    let location = cx.location().to_string();
    let current = trim_slash(&location);
    for link in cx.doc.query_all(root, &part("a")) {
        if cx.doc.has_attr(link, "data-ignore-current") {
            continue;
        }
        let href = cx.doc.attr(link, "href").unwrap_or_default();
        let path = link_path(href, &location);
        if trim_slash(&path) == current {
            cx.doc.set_attr(link, "aria-current", "page");
        } else {
            cx.doc.remove_attr(link, "aria-current");
        }
    }
}

impl Sidebar {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn breakpoint(&self) -> i64 {
        self.breakpoint
    }

    /// True when the viewport is narrower than the breakpoint.
    #[must_use]
    pub fn is_mobile(&self, cx: &Cx) -> bool {
        self.breakpoint > 0 && i64::from(cx.viewport_width()) < self.breakpoint
    }

    pub fn set_open(&mut self, cx: &mut Cx, open: bool) {
        self.open = open;
        self.sync_state(cx);
        debug!(root = %self.root, open, "sidebar state changed");
    }

    fn sync_state(&self, cx: &mut Cx) {
        cx.doc
            .set_attr(self.root, "aria-hidden", if self.open { "false" } else { "true" });
        if self.open {
            cx.doc.remove_attr(self.root, "inert");
        } else {
            cx.doc.set_attr(self.root, "inert", "");
        }
    }

    fn dismiss(&mut self, cx: &mut Cx) {
        cx.doc.blur();
        self.set_open(cx, false);
    }
}

impl Widget for Sidebar {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&mut self, cx: &mut Cx, event: &mut DomEvent) {
        if event.kind != EventKind::Click {
            return;
        }
        let target = event.target;
        if self.is_mobile(cx)
            && cx.doc.closest(target, &part("a, button")).is_some()
            && cx
                .doc
                .closest(target, &part("[data-keep-mobile-sidebar-open]"))
                .is_none()
        {
            self.dismiss(cx);
            return;
        }

        let outside_nav = cx
            .doc
            .query(self.root, &part("nav"))
            .is_some_and(|nav| !cx.doc.contains(nav, target));
        if target == self.root || outside_nav {
            self.dismiss(cx);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Observer<SidebarCommand> for Sidebar {
    fn observe(&mut self, cx: &mut Cx, command: &SidebarCommand) {
        if let Some(id) = &command.id {
            if self.id.as_ref() != Some(id) {
                trace!(root = %self.root, target = %id, "sidebar command for another instance");
                return;
            }
        }
        let open = match command.action {
            SidebarAction::Open => true,
            SidebarAction::Close => false,
            SidebarAction::Toggle => !self.open,
        };
        self.set_open(cx, open);
    }
}

impl Observer<LocationChange> for Sidebar {
    fn observe(&mut self, cx: &mut Cx, _change: &LocationChange) {
        update_current_links(cx, self.root);
    }
}
