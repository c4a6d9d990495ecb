//! Dropdown menu.
//!
//! Structure:
//!
//! ```text
//! .dropdown-menu
//!   > button                     trigger
//!   > [data-popover]             popover
//!       [role=menu]              menu
//!         [role^=menuitem]...    items
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::{missing_parts, part, Widget, WidgetRef};
use crate::channel::Observer;
use crate::cx::Cx;
use crate::dom::{DomEvent, EventKind, Key, NodeId};
use crate::error::InitError;
use crate::nav::{is_enabled, ActiveList, Move};
use crate::types::OverlayOpening;

pub const COMPONENT: &str = "dropdown-menu";

/// Menu overlay with keyboard and pointer navigation.
#[derive(Debug)]
pub struct DropdownMenu {
    root: NodeId,
    trigger: NodeId,
    popover: NodeId,
    menu: NodeId,
    list: ActiveList,
    open: bool,
}

pub(crate) fn init(cx: &mut Cx, root: NodeId) -> Result<Option<WidgetRef>, InitError> {
    let doc = &cx.doc;
    let trigger = doc.child_matching(root, &part("button"));
    let popover = doc.child_matching(root, &part("[data-popover]"));
    let menu = popover.and_then(|p| doc.query(p, &part("[role=menu]")));

    let (Some(trigger), Some(menu), Some(popover)) = (trigger, menu, popover) else {
        return Err(missing_parts(
            "Dropdown menu",
            &[
                ("trigger", trigger.is_some()),
                ("menu", menu.is_some()),
                ("popover", popover.is_some()),
            ],
        ));
    };

    let open = doc.attr(trigger, "aria-expanded") == Some("true");
    let widget = Rc::new(RefCell::new(DropdownMenu {
        root,
        trigger,
        popover,
        menu,
        list: ActiveList::default(),
        open,
    }));
    cx.bus().overlay.subscribe(&widget);
    let widget: WidgetRef = widget;
    Ok(Some(widget))
}

impl DropdownMenu {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Currently active item, if any.
    #[must_use]
    pub fn active_item(&self) -> Option<NodeId> {
        self.list.active_item()
    }

    /// Announces the opening, shows the menu and captures its enabled items.
    pub fn open(&mut self, cx: &mut Cx, seed: Option<Move>) {
        cx.publish(|bus| &bus.overlay, &OverlayOpening { source: self.root });

        self.open = true;
        cx.doc.set_attr(self.trigger, "aria-expanded", "true");
        cx.doc.set_attr(self.popover, "aria-hidden", "false");

        let items = cx
            .doc
            .query_all(self.menu, &part("[role^=menuitem]"))
            .into_iter()
            .filter(|&item| is_enabled(&cx.doc, item))
            .collect();
        self.list = ActiveList::new(items);

        if let Some(step) = seed.filter(|_| !self.list.is_empty()) {
            self.list.step(&mut cx.doc, self.trigger, step);
        }
        trace!(root = %self.root, items = self.list.len(), "menu opened");
    }

    /// Hides the menu. No-op when already closed.
    pub fn close(&mut self, cx: &mut Cx, focus_trigger: bool) {
        if !self.open {
            return;
        }
        self.open = false;
        cx.doc.set_attr(self.trigger, "aria-expanded", "false");
        cx.doc.remove_attr(self.trigger, "aria-activedescendant");
        cx.doc.set_attr(self.popover, "aria-hidden", "true");
        if focus_trigger {
            cx.doc.focus(self.trigger);
        }
        self.list.set_active(&mut cx.doc, self.trigger, None);
    }

    fn on_key(&mut self, cx: &mut Cx, event: &mut DomEvent, key: Key) {
        if key == Key::Escape {
            self.close(cx, true);
            return;
        }

        if !self.open {
            let seed = match key {
                Key::Enter | Key::Space => None,
                Key::ArrowDown => Some(Move::First),
                Key::ArrowUp => Some(Move::Last),
                _ => return,
            };
            event.prevent_default();
            self.open(cx, seed);
            return;
        }

        if self.list.is_empty() {
            return;
        }

        let step = match key {
            Key::ArrowDown => Move::Next,
            Key::ArrowUp => Move::Prev,
            Key::Home => Move::First,
            Key::End => Move::Last,
            Key::Enter | Key::Space => {
                event.prevent_default();
                if let Some(item) = self.list.active_item() {
                    cx.queue_event(DomEvent::click(item));
                }
                self.close(cx, true);
                return;
            }
            _ => return,
        };
        event.prevent_default();
        self.list.step(&mut cx.doc, self.trigger, step);
    }

    fn item_at(&self, cx: &Cx, target: NodeId) -> Option<NodeId> {
        cx.doc
            .closest(target, &part("[role^=menuitem]"))
            .filter(|&item| cx.doc.contains(self.menu, item))
    }
}

impl Widget for DropdownMenu {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&mut self, cx: &mut Cx, event: &mut DomEvent) {
        let target = event.target;
        match event.kind {
            EventKind::Click if cx.doc.contains(self.trigger, target) => {
                if self.open {
                    self.close(cx, true);
                } else {
                    self.open(cx, None);
                }
            }
            EventKind::Click => {
                if self.item_at(cx, target).is_some() {
                    self.close(cx, true);
                }
            }
            EventKind::KeyDown(key) => self.on_key(cx, event, key),
            EventKind::PointerMove => {
                let index = self
                    .item_at(cx, target)
                    .and_then(|item| self.list.index_of(item));
                if index.is_some() && index != self.list.active() {
                    self.list.set_active(&mut cx.doc, self.trigger, index);
                }
            }
            EventKind::PointerLeave if target == self.menu => {
                self.list.set_active(&mut cx.doc, self.trigger, None);
            }
            _ => {}
        }
    }

    fn handle_document_event(&mut self, cx: &mut Cx, event: &DomEvent) {
        if event.kind == EventKind::Click && !cx.doc.contains(self.root, event.target) {
            self.close(cx, true);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Observer<OverlayOpening> for DropdownMenu {
    fn observe(&mut self, cx: &mut Cx, message: &OverlayOpening) {
        if message.source != self.root {
            self.close(cx, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::Markup;

    fn menu_markup(items: &[(&str, bool)]) -> Markup {
        Markup::new("div").class("dropdown-menu").children([
            Markup::new("button").id("trigger").text("Options"),
            Markup::new("div").attr("data-popover", "").child(
                Markup::new("div").attr("role", "menu").children(items.iter().map(
                    |(id, enabled)| {
                        let item = Markup::new("div").id(id).attr("role", "menuitem");
                        if *enabled {
                            item
                        } else {
                            item.attr("aria-disabled", "true")
                        }
                    },
                )),
            ),
        ])
    }

    fn setup(items: &[(&str, bool)]) -> (Cx, Rc<RefCell<dyn Widget>>) {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx.doc.insert(body, &menu_markup(items)).unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        (cx, widget)
    }

    fn with_menu<R>(widget: &Rc<RefCell<dyn Widget>>, f: impl FnOnce(&mut DropdownMenu) -> R) -> R {
        let mut w = widget.borrow_mut();
        f(w.as_any_mut().downcast_mut::<DropdownMenu>().unwrap())
    }

    #[test]
    fn missing_parts_are_named() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx
            .doc
            .insert(body, &Markup::new("div").class("dropdown-menu"))
            .unwrap();
        let Err(err) = init(&mut cx, root) else {
            panic!("expected missing parts");
        };
        assert_eq!(
            err.to_string(),
            "Dropdown menu initialisation failed. Missing element(s): trigger, menu, popover"
        );
    }

    #[test]
    fn arrow_down_opens_on_first_enabled_item() {
        let (mut cx, widget) = setup(&[("a", false), ("b", true), ("c", true)]);
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        let mut key = DomEvent::key(trigger, Key::ArrowDown);
        widget.borrow_mut().handle_event(&mut cx, &mut key);

        assert!(key.default_prevented());
        with_menu(&widget, |menu| {
            assert!(menu.is_open());
            assert_eq!(menu.list.len(), 2);
        });
        assert_eq!(cx.doc.attr(trigger, "aria-activedescendant"), Some("b"));
        assert_eq!(cx.doc.attr(trigger, "aria-expanded"), Some("true"));
    }

    #[test]
    fn enter_clicks_active_item_and_closes() {
        let (mut cx, widget) = setup(&[("a", true), ("b", true)]);
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        for key in [Key::ArrowUp, Key::Enter] {
            widget
                .borrow_mut()
                .handle_event(&mut cx, &mut DomEvent::key(trigger, key));
        }

        let b = cx.doc.element_by_id("b").unwrap();
        assert_eq!(cx.take_queued(), Some(DomEvent::click(b)));
        with_menu(&widget, |menu| assert!(!menu.is_open()));
        assert_eq!(cx.doc.focused(), Some(trigger));
    }

    #[test]
    fn overlay_from_elsewhere_closes_without_focus() {
        let (mut cx, widget) = setup(&[("a", true)]);
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        with_menu(&widget, |menu| menu.open(&mut cx, None));

        let stranger = cx.doc.create_element("div");
        with_menu(&widget, |menu| {
            menu.observe(&mut cx, &OverlayOpening { source: stranger });
            assert!(!menu.is_open());
        });
        assert_ne!(cx.doc.focused(), Some(trigger));
    }
}
