//! Integration tests for notifications and the timed-dismissal scheduler.
//!
//! Time is paused (`start_paused = true`) so the countdown arithmetic can be
//! checked to the millisecond.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio_test::assert_ok;
use trellis_runtime::driver::run_for;
use trellis_runtime::{
    ActionError, Config, Countdown, DomEvent, EventKind, Markup, NodeId, Page, RuntimeError,
    Selector, ToastAction, ToastCancel, ToastCategory, ToastRequest,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn page_with_toaster() -> Page {
    let toaster = Markup::new("section").id("toaster");
    let mut page = Page::from_markup(Config::default(), [&toaster]).unwrap();
    page.start();
    page
}

fn toaster(page: &Page) -> NodeId {
    page.element("toaster").unwrap()
}

fn toasts(page: &Page) -> Vec<NodeId> {
    page.doc()
        .query_all(toaster(page), &Selector::parse(".toast").unwrap())
}

fn only_toast(page: &Page) -> NodeId {
    let all = toasts(page);
    assert_eq!(all.len(), 1, "expected exactly one toast");
    all[0]
}

fn hover(page: &mut Page) {
    let root = toaster(page);
    page.dispatch(DomEvent::new(EventKind::PointerEnter, root));
}

fn unhover(page: &mut Page) {
    let root = toaster(page);
    page.dispatch(DomEvent::new(EventKind::PointerLeave, root));
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// =============================================================================
// Timer arithmetic
// =============================================================================

#[tokio::test(start_paused = true)]
async fn pause_keeps_remaining_time_and_resume_runs_it_out() {
    let mut page = page_with_toaster();
    assert_ok!(page.toast(ToastRequest::new(ToastCategory::Info, "Saved")));
    let toast = only_toast(&page);
    assert_eq!(page.toast_countdown(toast), Some(Countdown::Remaining(ms(3000))));

    run_for(&mut page, ms(1000)).await;
    hover(&mut page);
    assert_eq!(page.toast_countdown(toast), Some(Countdown::Remaining(ms(2000))));
    assert!(!page.toast_timer_running(toast));

    // Time spent paused does not count.
    run_for(&mut page, ms(10_000)).await;
    assert!(page.doc().is_alive(toast));

    unhover(&mut page);
    run_for(&mut page, ms(1999)).await;
    assert!(page.doc().is_alive(toast));
    run_for(&mut page, ms(1)).await;
    assert!(!page.doc().is_alive(toast));
    assert_eq!(page.toast_countdown(toast), None);
}

#[tokio::test(start_paused = true)]
async fn resume_with_nothing_left_dismisses_immediately() {
    let mut page = page_with_toaster();
    assert_ok!(page.toast(ToastRequest::new(ToastCategory::Success, "Done")));
    let toast = only_toast(&page);

    // Let the deadline pass without running the timer.
    tokio::time::advance(ms(3500)).await;
    hover(&mut page);
    assert_eq!(page.toast_countdown(toast), Some(Countdown::Remaining(Duration::ZERO)));

    unhover(&mut page);
    assert!(!page.doc().is_alive(toast));
    assert!(page.next_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn toast_created_while_paused_waits_for_resume() {
    let mut page = page_with_toaster();
    hover(&mut page);
    assert_ok!(page.toast(ToastRequest::new(ToastCategory::Info, "Queued").duration(800)));
    let toast = only_toast(&page);

    assert!(!page.toast_timer_running(toast));
    run_for(&mut page, ms(5000)).await;
    assert!(page.doc().is_alive(toast));

    unhover(&mut page);
    run_for(&mut page, ms(800)).await;
    assert!(!page.doc().is_alive(toast));
}

#[tokio::test(start_paused = true)]
async fn disabled_countdown_never_fires() {
    let mut page = page_with_toaster();
    assert_ok!(page.toast(ToastRequest::new(ToastCategory::Warning, "Sticky").duration(-1)));
    let toast = only_toast(&page);

    assert_eq!(page.toast_countdown(toast), Some(Countdown::Disabled));
    hover(&mut page);
    unhover(&mut page);
    run_for(&mut page, ms(60_000)).await;
    assert!(page.doc().is_alive(toast));
}

#[tokio::test(start_paused = true)]
async fn dismissal_waits_for_exit_transition() {
    let mut page = page_with_toaster();
    let root = toaster(&page);
    let toast = page
        .insert(
            root,
            &Markup::new("div")
                .class("toast")
                .attr("data-duration", "100")
                .transition(ms(200)),
        )
        .unwrap();

    run_for(&mut page, ms(100)).await;
    assert!(page.doc().is_alive(toast));
    assert_eq!(page.doc().attr(toast, "aria-hidden"), Some("true"));

    run_for(&mut page, ms(200)).await;
    assert!(!page.doc().is_alive(toast));
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn error_toast_is_an_alert_with_the_longer_default() {
    let mut page = page_with_toaster();
    let request: ToastRequest =
        serde_json::from_str(r#"{ "category": "error", "title": "Save failed" }"#).unwrap();
    assert_ok!(page.toast(request));

    let toast = only_toast(&page);
    let doc = page.doc();
    assert_eq!(doc.attr(toast, "role"), Some("alert"));
    assert_eq!(doc.attr(toast, "aria-atomic"), Some("true"));
    assert_eq!(doc.attr(toast, "data-category"), Some("error"));
    assert_eq!(doc.attr(toast, "data-toast-initialized"), Some("true"));
    let title = doc.query(toast, &Selector::parse("section h2").unwrap()).unwrap();
    assert_eq!(doc.text_content(title), "Save failed");
    assert_eq!(page.toast_countdown(toast), Some(Countdown::Remaining(ms(5000))));

    run_for(&mut page, ms(4999)).await;
    assert!(page.doc().is_alive(toast));
    run_for(&mut page, ms(1)).await;
    assert!(toasts(&page).is_empty());
}

#[test]
fn missing_toaster_drops_the_request() {
    let mut page = Page::new(Config::default()).unwrap();
    page.start();

    let err = page
        .toast(ToastRequest::new(ToastCategory::Info, "Lost"))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::NoToaster));

    let body = page.doc().body();
    assert!(page
        .doc()
        .query(body, &Selector::parse(".toast").unwrap())
        .is_none());
}

// =============================================================================
// Footer controls
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failing_action_is_logged_and_still_dismisses() {
    let mut page = page_with_toaster();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let request = ToastRequest::new(ToastCategory::Error, "Upload failed")
        .duration(-1)
        .action(ToastAction::button("Retry", move |_, _| {
            counter.set(counter.get() + 1);
            Err(ActionError::failed("still offline"))
        }));
    assert_ok!(page.toast(request));
    let toast = only_toast(&page);

    let retry = page
        .doc()
        .query(toast, &Selector::parse("button[data-toast-action]").unwrap())
        .unwrap();
    page.click(retry);
    assert_eq!(calls.get(), 1);
    assert!(!page.doc().is_alive(toast));
    assert_eq!(page.toast_countdown(toast), None);
}

#[tokio::test(start_paused = true)]
async fn cancel_handler_runs_before_dismissal() {
    let mut page = page_with_toaster();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let request = ToastRequest::new(ToastCategory::Info, "Draft kept")
        .duration(-1)
        .cancel(ToastCancel::new("Dismiss").with_handler(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        }));
    assert_ok!(page.toast(request));
    let toast = only_toast(&page);

    let cancel = page
        .doc()
        .query(toast, &Selector::parse("button[data-toast-cancel]").unwrap())
        .unwrap();
    page.click(cancel);
    assert_eq!(calls.get(), 1);
    assert!(!page.doc().is_alive(toast));
}

#[tokio::test(start_paused = true)]
async fn toasts_removed_from_the_tree_are_forgotten() {
    let mut page = page_with_toaster();
    for i in 0..5 {
        let request = ToastRequest::new(ToastCategory::Info, format!("Sticky {i}")).duration(-1);
        assert_ok!(page.toast(request));
    }
    assert_ok!(page.toast(ToastRequest::new(ToastCategory::Info, "Timed")));
    let all = toasts(&page);
    assert_eq!(all.len(), 6);

    page.mutate(|doc| {
        for &toast in &all {
            doc.remove(toast);
        }
    });
    for &toast in &all {
        assert_eq!(page.toast_countdown(toast), None);
    }
    assert!(page.next_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn handlers_may_raise_new_toasts() {
    let mut page = page_with_toaster();
    let request = ToastRequest::new(ToastCategory::Info, "Archived")
        .duration(-1)
        .action(ToastAction::button("Undo", |cx, _| {
            cx.publish(
                |bus| &bus.toast,
                &ToastRequest::new(ToastCategory::Success, "Restored"),
            );
            Ok(())
        }));
    assert_ok!(page.toast(request));
    let first = only_toast(&page);

    let undo = page
        .doc()
        .query(first, &Selector::parse("footer button").unwrap())
        .unwrap();
    page.click(undo);

    let remaining = only_toast(&page);
    assert_ne!(remaining, first);
    assert_eq!(page.toast_countdown(remaining), Some(Countdown::Remaining(ms(3000))));
}

#[tokio::test(start_paused = true)]
async fn clicking_a_link_action_dismisses_and_blurs() {
    let mut page = page_with_toaster();
    assert_ok!(page.toast(
        ToastRequest::new(ToastCategory::Info, "New version")
            .duration(-1)
            .action(ToastAction::link("Reload", "/reload"))
    ));
    let toast = only_toast(&page);
    let link = page
        .doc()
        .query(toast, &Selector::parse("footer a").unwrap())
        .unwrap();

    page.click(link);
    assert!(!page.doc().is_alive(toast));
    assert_eq!(page.focused(), None);
}
