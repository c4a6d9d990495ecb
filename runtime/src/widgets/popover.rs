//! Popover: a trigger revealing free-form content.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{missing_parts, part, Widget, WidgetRef};
use crate::channel::Observer;
use crate::cx::Cx;
use crate::dom::{DomEvent, EventKind, Key, NodeId};
use crate::error::InitError;
use crate::timer::TimerId;
use crate::types::OverlayOpening;

pub const COMPONENT: &str = "popover";

#[derive(Debug)]
pub struct Popover {
    root: NodeId,
    trigger: NodeId,
    content: NodeId,
    open: bool,
    autofocus: Option<TimerId>,
}

pub(crate) fn init(cx: &mut Cx, root: NodeId) -> Result<Option<WidgetRef>, InitError> {
    let trigger = cx.doc.child_matching(root, &part("button"));
    let content = cx.doc.child_matching(root, &part("[data-popover]"));
    let (Some(trigger), Some(content)) = (trigger, content) else {
        return Err(missing_parts(
            "Popover",
            &[("trigger", trigger.is_some()), ("content", content.is_some())],
        ));
    };

    let widget = Rc::new(RefCell::new(Popover {
        root,
        trigger,
        content,
        open: cx.doc.attr(trigger, "aria-expanded") == Some("true"),
        autofocus: None,
    }));
    cx.bus().overlay.subscribe(&widget);
    let widget: WidgetRef = widget;
    Ok(Some(widget))
}

impl Popover {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Announces the opening and shows the content. An `[autofocus]` element
    /// inside gets focus once the entry transition ends.
    pub fn open(&mut self, cx: &mut Cx) {
        cx.publish(|bus| &bus.overlay, &OverlayOpening { source: self.root });

        self.cancel_autofocus(cx);
        if let Some(autofocus) = cx.doc.query(self.content, &part("[autofocus]")) {
            self.autofocus = cx.after_transition(self.content, move |cx| cx.doc.focus(autofocus));
        }
        self.open = true;
        cx.doc.set_attr(self.trigger, "aria-expanded", "true");
        cx.doc.set_attr(self.content, "aria-hidden", "false");
    }

    pub fn close(&mut self, cx: &mut Cx, focus_trigger: bool) {
        if !self.open {
            return;
        }
        self.open = false;
        self.cancel_autofocus(cx);
        cx.doc.set_attr(self.trigger, "aria-expanded", "false");
        cx.doc.set_attr(self.content, "aria-hidden", "true");
        if focus_trigger {
            cx.doc.focus(self.trigger);
        }
    }
}

impl Popover {
    fn cancel_autofocus(&mut self, cx: &mut Cx) {
        if let Some(id) = self.autofocus.take() {
            cx.clear_timeout(id);
        }
    }
}

impl Widget for Popover {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&mut self, cx: &mut Cx, event: &mut DomEvent) {
        match event.kind {
            EventKind::Click if cx.doc.contains(self.trigger, event.target) => {
                if self.open {
                    self.close(cx, true);
                } else {
                    self.open(cx);
                }
            }
            EventKind::KeyDown(Key::Escape) => self.close(cx, true),
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

impl Observer<OverlayOpening> for Popover {
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
    use std::time::Duration;

    fn popover(transition: Option<Duration>) -> Markup {
        let mut content = Markup::new("div")
            .attr("data-popover", "")
            .child(Markup::new("input").id("name").attr("autofocus", ""));
        if let Some(d) = transition {
            content = content.transition(d);
        }
        Markup::new("div")
            .class("popover")
            .child(Markup::new("button").id("open"))
            .child(content)
    }

    #[test]
    fn autofocus_is_immediate_without_transition() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx.doc.insert(body, &popover(None)).unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        let trigger = cx.doc.element_by_id("open").unwrap();

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));

        assert_eq!(cx.doc.focused(), cx.doc.element_by_id("name"));
        assert_eq!(cx.doc.attr(trigger, "aria-expanded"), Some("true"));
    }

    #[test]
    fn autofocus_waits_for_entry_transition() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx
            .doc
            .insert(body, &popover(Some(Duration::from_millis(150))))
            .unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        let trigger = cx.doc.element_by_id("open").unwrap();

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));

        assert_eq!(cx.doc.focused(), None);
        assert_eq!(cx.timers.len(), 1);
    }

    #[test]
    fn toggling_keeps_at_most_one_pending_autofocus() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx
            .doc
            .insert(body, &popover(Some(Duration::from_millis(200))))
            .unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        let trigger = cx.doc.element_by_id("open").unwrap();

        for _ in 0..3 {
            widget
                .borrow_mut()
                .handle_event(&mut cx, &mut DomEvent::click(trigger));
        }
        assert_eq!(cx.doc.attr(trigger, "aria-expanded"), Some("true"));
        assert_eq!(cx.timers.len(), 1);

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));
        assert!(cx.timers.is_empty());
    }

    #[test]
    fn missing_content_is_reported() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx
            .doc
            .insert(body, &Markup::new("div").class("popover").child(Markup::new("button")))
            .unwrap();
        let Err(err) = init(&mut cx, root) else {
            panic!("expected missing parts");
        };
        assert_eq!(
            err,
            InitError::MissingParts {
                component: "Popover",
                missing: vec!["content"]
            }
        );
    }
}
