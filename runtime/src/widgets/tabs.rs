//! Tab group: `.tabs` holding a `[role=tablist]` of `[role=tab]` elements,
//! each naming its panel through `aria-controls`.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::{missing_parts, part, Widget, WidgetRef};
use crate::cx::Cx;
use crate::dom::{DomEvent, EventKind, Key, NodeId};
use crate::error::InitError;

pub const COMPONENT: &str = "tabs";

#[derive(Debug)]
pub struct Tabs {
    root: NodeId,
    tablist: NodeId,
    tabs: Vec<NodeId>,
}

pub(crate) fn init(cx: &mut Cx, root: NodeId) -> Result<Option<WidgetRef>, InitError> {
    let Some(tablist) = cx.doc.query(root, &part("[role=tablist]")) else {
        return Err(missing_parts("Tabs", &[("tablist", false)]));
    };
    let tabs = cx.doc.query_all(tablist, &part("[role=tab]"));
    let widget: WidgetRef = Rc::new(RefCell::new(Tabs {
        root,
        tablist,
        tabs,
    }));
    Ok(Some(widget))
}

impl Tabs {
    /// The tab currently marked selected.
    #[must_use]
    pub fn selected(&self, cx: &Cx) -> Option<NodeId> {
        self.tabs
            .iter()
            .copied()
            .find(|&t| cx.doc.attr(t, "aria-selected") == Some("true"))
    }

    fn panel_of(cx: &Cx, tab: NodeId) -> Option<NodeId> {
        cx.doc
            .attr(tab, "aria-controls")
            .and_then(|id| cx.doc.element_by_id(id))
    }

    /// Marks `tab` selected and reveals its panel; every other panel is
    /// hidden.
    pub fn select(&self, cx: &mut Cx, tab: NodeId) {
        for &other in &self.tabs {
            cx.doc.set_attr(other, "aria-selected", "false");
            cx.doc.set_attr(other, "tabindex", "-1");
            if let Some(panel) = Self::panel_of(cx, other) {
                cx.doc.set_attr(panel, "hidden", "");
            }
        }
        cx.doc.set_attr(tab, "aria-selected", "true");
        cx.doc.set_attr(tab, "tabindex", "0");
        if let Some(panel) = Self::panel_of(cx, tab) {
            cx.doc.remove_attr(panel, "hidden");
        }
        trace!(root = %self.root, tab = %tab, "tab selected");
    }
}

impl Widget for Tabs {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&mut self, cx: &mut Cx, event: &mut DomEvent) {
        if !cx.doc.contains(self.tablist, event.target) {
            return;
        }
        match event.kind {
            EventKind::Click => {
                let tab = cx
                    .doc
                    .closest(event.target, &part("[role=tab]"))
                    .filter(|t| self.tabs.contains(t));
                if let Some(tab) = tab {
                    self.select(cx, tab);
                }
            }
            EventKind::KeyDown(key) => {
                let Some(current) = self.tabs.iter().position(|&t| t == event.target) else {
                    return;
                };
                let count = self.tabs.len();
                let next = match key {
                    Key::ArrowRight => (current + 1) % count,
                    Key::ArrowLeft => (current + count - 1) % count,
                    Key::Home => 0,
                    Key::End => count - 1,
                    _ => return,
                };
                event.prevent_default();
                let tab = self.tabs[next];
                self.select(cx, tab);
                cx.doc.focus(tab);
            }
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::Markup;

    fn tab_group() -> Markup {
        let names = ["one", "two", "three"];
        Markup::new("div")
            .class("tabs")
            .child(Markup::new("nav").attr("role", "tablist").children(
                names.iter().map(|n| {
                    Markup::new("button")
                        .id(&format!("tab-{n}"))
                        .attr("role", "tab")
                        .attr("aria-controls", &format!("panel-{n}"))
                }),
            ))
            .children(
                names
                    .iter()
                    .map(|n| Markup::new("div").id(&format!("panel-{n}")).attr("role", "tabpanel")),
            )
    }

    fn setup() -> (Cx, WidgetRef) {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx.doc.insert(body, &tab_group()).unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        (cx, widget)
    }

    #[test]
    fn arrow_left_wraps_to_last_tab() {
        let (mut cx, widget) = setup();
        let first = cx.doc.element_by_id("tab-one").unwrap();
        let last = cx.doc.element_by_id("tab-three").unwrap();

        let mut key = DomEvent::key(first, Key::ArrowLeft);
        widget.borrow_mut().handle_event(&mut cx, &mut key);

        assert!(key.default_prevented());
        assert_eq!(cx.doc.attr(last, "aria-selected"), Some("true"));
        assert_eq!(cx.doc.attr(last, "tabindex"), Some("0"));
        assert_eq!(cx.doc.attr(first, "tabindex"), Some("-1"));
        assert_eq!(cx.doc.focused(), Some(last));

        let panel_one = cx.doc.element_by_id("panel-one").unwrap();
        let panel_three = cx.doc.element_by_id("panel-three").unwrap();
        assert!(cx.doc.has_attr(panel_one, "hidden"));
        assert!(!cx.doc.has_attr(panel_three, "hidden"));
    }

    #[test]
    fn arrow_right_wraps_to_first_tab() {
        let (mut cx, widget) = setup();
        let first = cx.doc.element_by_id("tab-one").unwrap();
        let last = cx.doc.element_by_id("tab-three").unwrap();

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::key(last, Key::ArrowRight));

        assert_eq!(cx.doc.focused(), Some(first));
    }

    #[test]
    fn click_selects_tab() {
        let (mut cx, widget) = setup();
        let two = cx.doc.element_by_id("tab-two").unwrap();
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(two));

        let tabs = widget.borrow();
        let tabs = tabs.as_any().downcast_ref::<Tabs>().unwrap();
        assert_eq!(tabs.selected(&cx), Some(two));
    }

    #[test]
    fn missing_tablist_is_reported() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx.doc.insert(body, &Markup::new("div").class("tabs")).unwrap();
        let Err(err) = init(&mut cx, root) else {
            panic!("expected missing parts");
        };
        assert_eq!(
            err.to_string(),
            "Tabs initialisation failed. Missing element(s): tablist"
        );
    }
}
