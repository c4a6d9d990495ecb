//! Fire-once deferred callbacks.
//!
//! The queue keeps pending callbacks keyed by [`TimerId`], each with a
//! deadline on the tokio clock. Nothing here sleeps: the page (or the
//! [`crate::driver`]) asks for the next deadline, waits for it, and pops due
//! entries one at a time so a callback can still cancel a later one that is
//! due in the same instant.

use std::collections::HashMap;
use std::fmt;

use tokio::time::Instant;
use tracing::trace;

use crate::cx::Cx;

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce(&mut Cx)>;

struct PendingTimer {
    /// When the callback becomes due.
    deadline: Instant,
    callback: TimerCallback,
}

/// Cancelable fire-once timers.
#[derive(Default)]
pub struct TimerQueue {
    next_id: u64,
    pending: HashMap<TimerId, PendingTimer>,
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to run at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, PendingTimer { deadline, callback });
        trace!(timer = %id, "scheduled");
        id
    }

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.pending.remove(&id).is_some();
        if removed {
            trace!(timer = %id, "cancelled");
        }
        removed
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Removes and returns the earliest timer due at `now`.
    ///
    /// Ties are broken by scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerCallback)> {
        let id = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(id, p)| (p.deadline, **id))
            .map(|(id, _)| *id)?;
        self.pending.remove(&id).map(|p| (id, p.callback))
    }
}
