//! Async driver for a [`Page`].
//!
//! The page itself never sleeps. The driver waits on two things at once:
//! host input arriving on a channel, and the earliest pending timer
//! deadline. Whichever comes first is applied to the page. Everything runs
//! on the calling task, so the page (which is `!Send`) stays on one thread.
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use trellis_runtime::{driver::{self, HostEvent}, Config, Page};
//!
//! # async fn example() -> trellis_runtime::Result<()> {
//! let mut page = Page::new(Config::default())?;
//! page.start();
//!
//! let (tx, rx) = mpsc::channel(16);
//! tx.send(HostEvent::Resize(600)).await.ok();
//! drop(tx);
//! driver::run(&mut page, rx).await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::dom::DomEvent;
use crate::page::Page;
use crate::types::{SidebarCommand, ToastRequest};

/// Input from the host environment.
#[derive(Debug)]
pub enum HostEvent {
    /// A user input event.
    Input(DomEvent),
    /// A notification request.
    Toast(ToastRequest),
    /// A sidebar command.
    Sidebar(SidebarCommand),
    /// Programmatic navigation (`push_state`).
    Navigate(String),
    /// Native back navigation.
    Back,
    /// Native forward navigation.
    Forward,
    /// New viewport width.
    Resize(u32),
}

/// Applies one host event to the page.
pub fn apply(page: &mut Page, event: HostEvent) {
    trace!(event = ?event, "host event");
    match event {
        HostEvent::Input(event) => {
            page.dispatch(event);
        }
        HostEvent::Toast(request) => {
            if let Err(e) = page.toast(request) {
                warn!(error = %e, "toast request dropped");
            }
        }
        HostEvent::Sidebar(command) => page.sidebar(command),
        HostEvent::Navigate(path) => page.push_state(&path),
        HostEvent::Back => {
            page.back();
        }
        HostEvent::Forward => {
            page.forward();
        }
        HostEvent::Resize(width) => page.resize(width),
    }
}

/// Drives the page until the host channel closes.
///
/// Timers still pending at that point are left in the page.
pub async fn run(page: &mut Page, mut events: mpsc::Receiver<HostEvent>) {
    debug!("page driver started");

    loop {
        let next_deadline = page.next_deadline();

        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => apply(page, event),
                    None => {
                        debug!("host channel closed");
                        break;
                    }
                }
            }

            () = async {
                match next_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                page.run_due_timers();
            }
        }
    }

    debug!("page driver stopped");
}

/// Lets `duration` pass, running timers as they fall due. Returns how many
/// ran.
pub async fn run_for(page: &mut Page, duration: Duration) -> usize {
    let end = Instant::now() + duration;
    let mut fired = 0;
    loop {
        match page.next_deadline() {
            Some(deadline) if deadline <= end => {
                tokio::time::sleep_until(deadline).await;
                fired += page.run_due_timers();
            }
            _ => {
                tokio::time::sleep_until(end).await;
                fired += page.run_due_timers();
                return fired;
            }
        }
    }
}
