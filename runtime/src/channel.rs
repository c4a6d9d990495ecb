//! Publish/observe channels for cross-widget coordination.
//!
//! A [`Channel`] holds weak references to its observers, so a widget's
//! subscription ends when the widget itself is dropped; there is no explicit
//! unsubscribe. Delivery is synchronous: [`Channel::publish`] returns after
//! every live observer ran.
//!
//! Observers are `RefCell`s. An observer that is already mutably borrowed when
//! a message is published (typically the widget that is publishing) is
//! skipped for that message.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::cx::Cx;
use crate::types::{
    LocationChange, OverlayOpening, SidebarCommand, ToastRequest, WidgetSignal, LOCATION_EVENT,
    OVERLAY_EVENT, SIDEBAR_EVENT, SIGNAL_EVENT, TOAST_EVENT,
};

/// Receives messages published on a [`Channel`].
pub trait Observer<M> {
    fn observe(&mut self, cx: &mut Cx, message: &M);
}

impl<M, F> Observer<M> for F
where
    F: FnMut(&mut Cx, &M),
{
    fn observe(&mut self, cx: &mut Cx, message: &M) {
        self(cx, message);
    }
}

type ObserverRef<M> = Rc<RefCell<dyn Observer<M>>>;

/// Keeps a closure subscription alive. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription<M> {
    _observer: ObserverRef<M>,
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A named broadcast channel.
pub struct Channel<M> {
    name: &'static str,
    observers: RefCell<Vec<Weak<RefCell<dyn Observer<M>>>>>,
}

impl<M: 'static> fmt::Debug for Channel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<M: 'static> Channel<M> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            observers: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Subscribes a shared observer without keeping it alive.
    pub fn subscribe<O>(&self, observer: &Rc<RefCell<O>>)
    where
        O: Observer<M> + 'static,
    {
        let observer: ObserverRef<M> = observer.clone();
        self.observers.borrow_mut().push(Rc::downgrade(&observer));
    }

    /// Subscribes a closure. The returned handle keeps it alive.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription<M>
    where
        F: FnMut(&mut Cx, &M) + 'static,
    {
        let observer: ObserverRef<M> = Rc::new(RefCell::new(f));
        self.observers.borrow_mut().push(Rc::downgrade(&observer));
        Subscription {
            _observer: observer,
        }
    }

    /// Number of observers that are still alive.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Delivers `message` to every live observer in subscription order and
    /// returns how many received it.
    ///
    /// Observers subscribed while the message is being delivered only see
    /// later messages.
    pub fn publish(&self, cx: &mut Cx, message: &M) -> usize {
        let live: Vec<ObserverRef<M>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|w| w.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        let mut delivered = 0;
        for observer in live {
            let Ok(mut observer) = observer.try_borrow_mut() else {
                continue;
            };
            observer.observe(cx, message);
            delivered += 1;
        }
        trace!(channel = self.name, delivered, "published");
        delivered
    }
}

/// The process-wide channels shared by every widget of a page.
#[derive(Debug)]
pub struct Bus {
    pub overlay: Channel<OverlayOpening>,
    pub sidebar: Channel<SidebarCommand>,
    pub location: Channel<LocationChange>,
    pub toast: Channel<ToastRequest>,
    pub signals: Channel<WidgetSignal>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            overlay: Channel::new(OVERLAY_EVENT),
            sidebar: Channel::new(SIDEBAR_EVENT),
            location: Channel::new(LOCATION_EVENT),
            toast: Channel::new(TOAST_EVENT),
            signals: Channel::new(SIGNAL_EVENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    struct Counter {
        seen: Vec<u32>,
    }

    impl Observer<u32> for Counter {
        fn observe(&mut self, _cx: &mut Cx, message: &u32) {
            self.seen.push(*message);
        }
    }

    #[test]
    fn dropped_observers_stop_receiving() {
        let mut cx = Cx::new(Config::default());
        let channel: Channel<u32> = Channel::new("test");
        let counter = Rc::new(RefCell::new(Counter { seen: Vec::new() }));
        channel.subscribe(&counter);

        assert_eq!(channel.publish(&mut cx, &1), 1);
        assert_eq!(counter.borrow().seen, vec![1]);

        drop(counter);
        assert_eq!(channel.observer_count(), 0);
        assert_eq!(channel.publish(&mut cx, &2), 0);
    }

    #[test]
    fn busy_observer_is_skipped() {
        let mut cx = Cx::new(Config::default());
        let channel: Channel<u32> = Channel::new("test");
        let counter = Rc::new(RefCell::new(Counter { seen: Vec::new() }));
        channel.subscribe(&counter);

        let guard = counter.borrow_mut();
        assert_eq!(channel.publish(&mut cx, &7), 0);
        drop(guard);
        assert!(counter.borrow().seen.is_empty());
    }

    #[test]
    fn closure_subscription_lives_as_long_as_handle() {
        let mut cx = Cx::new(Config::default());
        let channel: Channel<u32> = Channel::new("test");
        let total = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&total);
        let sub = channel.subscribe_fn(move |_cx, n: &u32| *sink.borrow_mut() += n);

        channel.publish(&mut cx, &3);
        channel.publish(&mut cx, &4);
        assert_eq!(*total.borrow(), 7);

        drop(sub);
        channel.publish(&mut cx, &100);
        assert_eq!(*total.borrow(), 7);
    }

    #[test]
    fn bus_channels_carry_their_event_names() {
        let bus = Bus::new();
        assert_eq!(bus.overlay.name(), "trellis:popover");
        assert_eq!(bus.sidebar.name(), "trellis:sidebar");
        assert_eq!(bus.location.name(), "trellis:locationchange");
        assert_eq!(bus.toast.name(), "trellis:toast");
    }
}
