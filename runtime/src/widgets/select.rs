//! Single-choice picker with optional live filtering.
//!
//! Structure:
//!
//! ```text
//! div.select
//!   > button                       trigger
//!       > span                     label (optional)
//!   > [data-popover]               popover
//!       header input[type=text]    filter (optional)
//!       [role=listbox]             listbox
//!         [role=option]...         options
//!   > input[type=hidden]           committed value
//! ```
//!
//! The committed option carries `aria-selected="true"`, its `data-value` is
//! copied into the hidden input and its label into the trigger. Committing a
//! different value emits [`WidgetSignal::Changed`]; the initial selection and
//! re-committing the current value do not.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::{missing_parts, part, Widget, WidgetRef};
use crate::channel::Observer;
use crate::cx::Cx;
use crate::dom::{Document, DomEvent, EventKind, Key, NodeId};
use crate::error::InitError;
use crate::nav::{is_enabled, ActiveList, Move};
use crate::timer::TimerId;
use crate::types::{OverlayOpening, WidgetSignal};

pub const COMPONENT: &str = "select";

#[derive(Debug)]
pub struct Select {
    this: Weak<RefCell<Select>>,
    root: NodeId,
    trigger: NodeId,
    label: Option<NodeId>,
    popover: NodeId,
    listbox: NodeId,
    input: NodeId,
    filter: Option<NodeId>,
    list: ActiveList,
    open: bool,
    /// Pending filter reset deferred until the exit transition ends.
    filter_reset: Option<TimerId>,
    filter_focus: Option<TimerId>,
}

pub(crate) fn init(cx: &mut Cx, root: NodeId) -> Result<Option<WidgetRef>, InitError> {
    let doc = &cx.doc;
    let trigger = doc.child_matching(root, &part("button"));
    let popover = doc.child_matching(root, &part("[data-popover]"));
    let listbox = popover.and_then(|p| doc.query(p, &part("[role=listbox]")));
    let input = doc.child_matching(root, &part("input[type=hidden]"));

    let (Some(trigger), Some(popover), Some(listbox), Some(input)) =
        (trigger, popover, listbox, input)
    else {
        return Err(missing_parts(
            "Select component",
            &[
                ("trigger", trigger.is_some()),
                ("popover", popover.is_some()),
                ("listbox", listbox.is_some()),
                ("input", input.is_some()),
            ],
        ));
    };
    let label = doc.child_matching(trigger, &part("span"));
    let filter = doc.query(root, &part("header input[type=text]"));

    let widget = Rc::new_cyclic(|this| {
        RefCell::new(Select {
            this: this.clone(),
            root,
            trigger,
            label,
            popover,
            listbox,
            input,
            filter,
            list: ActiveList::default(),
            open: false,
            filter_reset: None,
            filter_focus: None,
        })
    });

    {
        let mut select = widget.borrow_mut();
        select.refresh_options(&cx.doc);
        let current = cx.doc.attr(input, "value").unwrap_or_default().to_string();
        let options = select.list.items().to_vec();
        let initial = options
            .iter()
            .copied()
            .find(|&o| cx.doc.attr(o, "data-value") == Some(current.as_str()))
            .or_else(|| {
                options
                    .iter()
                    .copied()
                    .find(|&o| cx.doc.has_attr(o, "data-value"))
            })
            .or_else(|| options.first().copied());
        if let Some(option) = initial {
            select.update_value(cx, option, false);
        }
        cx.doc.set_attr(popover, "aria-hidden", "true");
        cx.doc.set_attr(trigger, "aria-expanded", "false");
    }

    cx.bus().overlay.subscribe(&widget);
    let widget: WidgetRef = widget;
    Ok(Some(widget))
}

fn option_label(doc: &Document, option: NodeId) -> String {
    doc.attr(option, "data-label")
        .map_or_else(|| doc.text_content(option), str::to_string)
}

impl Select {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Committed value, as stored in the hidden input.
    #[must_use]
    pub fn value<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        doc.attr(self.input, "value")
    }

    /// Active option, if any.
    #[must_use]
    pub fn active_option(&self) -> Option<NodeId> {
        self.list.active_item()
    }

    /// Options currently passing the filter.
    #[must_use]
    pub fn visible_options(&self) -> Vec<NodeId> {
        self.list.visible_items()
    }

    /// Every `[role=option]`, disabled ones included.
    fn all_options(&self, doc: &Document) -> Vec<NodeId> {
        doc.query_all(self.listbox, &part("[role=option]"))
    }

    /// Recaptures enabled options and reapplies the current filter text.
    fn refresh_options(&mut self, doc: &Document) {
        let options = self
            .all_options(doc)
            .into_iter()
            .filter(|&o| is_enabled(doc, o))
            .collect();
        self.list = ActiveList::new(options);
    }

    fn selected_option(&self, doc: &Document) -> Option<NodeId> {
        doc.query(self.listbox, &part("[role=option][aria-selected=true]"))
    }

    fn selected_index(&self, doc: &Document) -> Option<usize> {
        self.selected_option(doc)
            .and_then(|o| self.list.index_of(o))
    }

    fn update_value(&mut self, cx: &mut Cx, option: NodeId, notify: bool) {
        let value = cx.doc.attr(option, "data-value").unwrap_or_default().to_string();
        if let Some(label) = self.label {
            let text = option_label(&cx.doc, option);
            cx.doc.set_text(label, &text);
        }
        cx.doc.set_attr(self.input, "value", value.as_str());
        if let Some(previous) = self.selected_option(&cx.doc) {
            cx.doc.remove_attr(previous, "aria-selected");
        }
        cx.doc.set_attr(option, "aria-selected", "true");

        if notify {
            debug!(root = %self.root, value = %value, "select value changed");
            cx.emit(WidgetSignal::Changed {
                root: self.root,
                value,
            });
        }
    }

    /// Commits `option` and closes, returning focus to the trigger.
    ///
    /// A change signal is emitted only when the option has a `data-value`
    /// that differs from the committed one.
    pub fn select_option(&mut self, cx: &mut Cx, option: NodeId) {
        let old = cx.doc.attr(self.input, "value").map(str::to_string);
        let new = cx.doc.attr(option, "data-value").map(str::to_string);
        if new.is_some() && new != old {
            self.update_value(cx, option, true);
        }
        self.close(cx, true);
    }

    /// Commits the enabled option whose `data-value` equals `value`.
    ///
    /// Returns false (and does nothing) if there is no such option.
    pub fn select_by_value(&mut self, cx: &mut Cx, value: &str) -> bool {
        self.refresh_options(&cx.doc);
        let found = self
            .list
            .items()
            .iter()
            .copied()
            .find(|&o| cx.doc.attr(o, "data-value") == Some(value));
        match found {
            Some(option) => {
                self.select_option(cx, option);
                true
            }
            None => false,
        }
    }

    pub fn open(&mut self, cx: &mut Cx) {
        cx.publish(|bus| &bus.overlay, &OverlayOpening { source: self.root });

        if let Some(id) = self.filter_reset.take() {
            cx.clear_timeout(id);
            self.reset_filter(cx);
        }
        self.cancel_filter_focus(cx);
        if let Some(filter) = self.filter {
            self.filter_focus = cx.after_transition(self.popover, move |cx| cx.doc.focus(filter));
        }

        self.open = true;
        cx.doc.set_attr(self.popover, "aria-hidden", "false");
        cx.doc.set_attr(self.trigger, "aria-expanded", "true");

        self.refresh_options(&cx.doc);
        self.apply_filter(cx);
        if let Some(index) = self.selected_index(&cx.doc) {
            self.list.set_active(&mut cx.doc, self.trigger, Some(index));
        }
    }

    /// Hides the listbox. No-op when already closed.
    ///
    /// The filter is cleared once the popover's exit transition ends, or
    /// right away when it declares none.
    pub fn close(&mut self, cx: &mut Cx, focus_trigger: bool) {
        if !self.open {
            return;
        }
        self.cancel_filter_focus(cx);
        if self.filter.is_some() {
            if let Some(delay) = cx.transition_duration(self.popover) {
                let this = self.this.clone();
                if let Some(id) = self.filter_reset.take() {
                    cx.clear_timeout(id);
                }
                self.filter_reset = Some(cx.set_timeout(delay, move |cx| {
                    if let Some(select) = this.upgrade() {
                        let mut select = select.borrow_mut();
                        select.filter_reset = None;
                        select.reset_filter(cx);
                    }
                }));
            } else {
                self.reset_filter(cx);
            }
        }

        if focus_trigger {
            cx.doc.focus(self.trigger);
        }
        self.open = false;
        cx.doc.set_attr(self.popover, "aria-hidden", "true");
        cx.doc.set_attr(self.trigger, "aria-expanded", "false");
        self.list.set_active(&mut cx.doc, self.trigger, None);
    }

    fn cancel_filter_focus(&mut self, cx: &mut Cx) {
        if let Some(id) = self.filter_focus.take() {
            cx.clear_timeout(id);
        }
    }

    fn reset_filter(&mut self, cx: &mut Cx) {
        if let Some(filter) = self.filter {
            cx.doc.set_attr(filter, "value", "");
        }
        self.list.show_all();
        for option in self.all_options(&cx.doc) {
            cx.doc.set_attr(option, "aria-hidden", "false");
        }
    }

    /// Narrows the visible options to those whose label contains the filter
    /// text, case-insensitively. Clears the active option.
    fn apply_filter(&mut self, cx: &mut Cx) {
        let Some(filter) = self.filter else {
            return;
        };
        let term = cx
            .doc
            .attr(filter, "value")
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        self.list.set_active(&mut cx.doc, self.trigger, None);

        let mut visible = Vec::new();
        for option in self.all_options(&cx.doc) {
            let text = option_label(&cx.doc, option).trim().to_lowercase();
            let matches = text.contains(&term);
            cx.doc
                .set_attr(option, "aria-hidden", if matches { "false" } else { "true" });
            if matches {
                if let Some(index) = self.list.index_of(option) {
                    visible.push(index);
                }
            }
        }
        trace!(root = %self.root, term = %term, visible = visible.len(), "filtered options");
        self.list.set_visible(visible);
    }

    fn on_key(&mut self, cx: &mut Cx, event: &mut DomEvent, key: Key) {
        let on_trigger = event.target == self.trigger;
        let commit = key == Key::Enter || (on_trigger && key == Key::Space);

        if !self.open {
            let seed = match key {
                Key::ArrowDown | Key::Home => Move::First,
                Key::ArrowUp | Key::End => Move::Last,
                _ => return,
            };
            event.prevent_default();
            self.open(cx);
            if self.list.active().is_none() {
                self.list.step(&mut cx.doc, self.trigger, seed);
            }
            return;
        }

        let step = match key {
            Key::Escape => {
                event.prevent_default();
                self.close(cx, true);
                return;
            }
            _ if commit => {
                event.prevent_default();
                if let Some(option) = self.list.active_item() {
                    self.select_option(cx, option);
                }
                return;
            }
            Key::ArrowDown => Move::Next,
            Key::ArrowUp => Move::Prev,
            Key::Home => Move::First,
            Key::End => Move::Last,
            _ => return,
        };
        event.prevent_default();
        self.list.step(&mut cx.doc, self.trigger, step);
    }

    fn option_at(&self, doc: &Document, target: NodeId) -> Option<NodeId> {
        doc.closest(target, &part("[role=option]"))
            .filter(|&o| doc.contains(self.listbox, o))
    }
}

impl Widget for Select {
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
                    self.open(cx);
                }
            }
            EventKind::Click => {
                let option = self
                    .option_at(&cx.doc, target)
                    .filter(|&o| self.list.index_of(o).is_some());
                if let Some(option) = option {
                    self.select_option(cx, option);
                }
            }
            EventKind::KeyDown(key) if target == self.trigger || Some(target) == self.filter => {
                self.on_key(cx, event, key);
            }
            EventKind::Input if Some(target) == self.filter => self.apply_filter(cx),
            EventKind::PointerMove => {
                let index = self
                    .option_at(&cx.doc, target)
                    .and_then(|o| self.list.index_of(o))
                    .filter(|&i| self.list.is_visible(i));
                if index.is_some() && index != self.list.active() {
                    self.list.set_active(&mut cx.doc, self.trigger, index);
                }
            }
            EventKind::PointerLeave if target == self.listbox => {
                let committed = self.selected_index(&cx.doc);
                self.list.set_active(&mut cx.doc, self.trigger, committed);
            }
            _ => {}
        }
    }

    fn handle_document_event(&mut self, cx: &mut Cx, event: &DomEvent) {
        if event.kind == EventKind::Click && !cx.doc.contains(self.root, event.target) {
            self.close(cx, false);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Observer<OverlayOpening> for Select {
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

    fn fruit_select(value: &str, with_filter: bool) -> Markup {
        let options = ["Apple", "Banana", "Cherry"].iter().map(|name| {
            Markup::new("div")
                .id(&name.to_lowercase())
                .attr("role", "option")
                .attr("data-value", &name.to_lowercase())
                .text(name)
        });
        let mut popover = Markup::new("div").attr("data-popover", "");
        if with_filter {
            popover = popover.child(
                Markup::new("header").child(Markup::new("input").id("filter").attr("type", "text")),
            );
        }
        Markup::new("div").class("select").children([
            Markup::new("button")
                .id("trigger")
                .child(Markup::new("span").id("label")),
            popover.child(Markup::new("div").attr("role", "listbox").children(options)),
            Markup::new("input")
                .attr("type", "hidden")
                .attr("value", value),
        ])
    }

    fn setup(value: &str, with_filter: bool) -> (Cx, WidgetRef) {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx.doc.insert(body, &fruit_select(value, with_filter)).unwrap();
        let widget = init(&mut cx, root).unwrap().unwrap();
        (cx, widget)
    }

    fn with_select<R>(widget: &WidgetRef, f: impl FnOnce(&mut Select) -> R) -> R {
        let mut w = widget.borrow_mut();
        f(w.as_any_mut().downcast_mut::<Select>().unwrap())
    }

    #[test]
    fn initial_value_matches_hidden_input() {
        let (cx, widget) = setup("banana", false);
        let label = cx.doc.element_by_id("label").unwrap();
        assert_eq!(cx.doc.text_content(label), "Banana");
        with_select(&widget, |s| assert_eq!(s.value(&cx.doc), Some("banana")));
        let banana = cx.doc.element_by_id("banana").unwrap();
        assert_eq!(cx.doc.attr(banana, "aria-selected"), Some("true"));
    }

    #[test]
    fn initial_value_falls_back_to_first_valued_option() {
        let (cx, widget) = setup("durian", false);
        with_select(&widget, |s| assert_eq!(s.value(&cx.doc), Some("apple")));
    }

    #[test]
    fn open_seeds_active_from_committed_option() {
        let (mut cx, widget) = setup("cherry", false);
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::key(trigger, Key::ArrowDown));

        let cherry = cx.doc.element_by_id("cherry").unwrap();
        with_select(&widget, |s| {
            assert!(s.is_open());
            assert_eq!(s.active_option(), Some(cherry));
        });
        assert_eq!(cx.doc.attr(trigger, "aria-activedescendant"), Some("cherry"));
    }

    #[test]
    fn missing_listbox_is_reported() {
        let mut cx = Cx::new(Config::default());
        let body = cx.doc.body();
        let root = cx
            .doc
            .insert(
                body,
                &Markup::new("div")
                    .class("select")
                    .child(Markup::new("button"))
                    .child(Markup::new("div").attr("data-popover", "")),
            )
            .unwrap();
        let Err(err) = init(&mut cx, root) else {
            panic!("expected missing parts");
        };
        assert_eq!(
            err.to_string(),
            "Select component initialisation failed. Missing element(s): listbox, input"
        );
    }

    #[test]
    fn filter_hides_non_matching_options() {
        let (mut cx, widget) = setup("apple", true);
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        let filter = cx.doc.element_by_id("filter").unwrap();
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));
        assert_eq!(cx.doc.focused(), Some(filter));

        cx.doc.set_attr(filter, "value", "  AN ");
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::new(EventKind::Input, filter));

        let banana = cx.doc.element_by_id("banana").unwrap();
        let apple = cx.doc.element_by_id("apple").unwrap();
        with_select(&widget, |s| {
            assert_eq!(s.visible_options(), vec![banana]);
            assert_eq!(s.active_option(), None);
        });
        assert_eq!(cx.doc.attr(apple, "aria-hidden"), Some("true"));

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::key(filter, Key::Escape));
        assert_eq!(cx.doc.attr(filter, "value"), Some(""));
        assert_eq!(cx.doc.attr(apple, "aria-hidden"), Some("false"));
        assert_eq!(cx.doc.focused(), Some(trigger));
    }

    #[test]
    fn reopening_during_exit_transition_resets_filter() {
        let (mut cx, widget) = setup("apple", true);
        let body = cx.doc.body();
        let popover = cx.doc.query(body, &part("[data-popover]")).unwrap();
        cx.doc.set_transition(popover, Some(std::time::Duration::from_millis(150)));
        let trigger = cx.doc.element_by_id("trigger").unwrap();
        let filter = cx.doc.element_by_id("filter").unwrap();

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));
        assert_eq!(cx.timers.len(), 1);
        cx.doc.set_attr(filter, "value", "ban");
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::new(EventKind::Input, filter));

        // Closing drops the pending focus and defers the reset.
        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::key(filter, Key::Escape));
        assert_eq!(cx.timers.len(), 1);
        assert_eq!(cx.doc.attr(filter, "value"), Some("ban"));

        widget
            .borrow_mut()
            .handle_event(&mut cx, &mut DomEvent::click(trigger));
        assert_eq!(cx.doc.attr(filter, "value"), Some(""));
        with_select(&widget, |s| {
            assert!(s.is_open());
            assert_eq!(s.visible_options().len(), 3);
        });
        assert_eq!(cx.timers.len(), 1);
    }
}
