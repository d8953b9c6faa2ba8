//! Subscription management for push streams.
//!
//! This module provides the observer trait, subscription tokens and a manager
//! for tracking the observers registered on a stream.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::Cell;

/// Unique identifier for a subscription within one stream.
pub type SubscriptionId = u64;

/// Receives the values pushed by a stream.
pub trait Observer<T> {
    /// Called once per value, in production order.
    fn on_next(&self, value: &T);

    /// Called once when the stream completes.
    fn on_complete(&self) {}
}

/// An observer built from a closure; completion is ignored.
pub(crate) struct NextFn<F>(pub(crate) F);

impl<T, F: Fn(&T)> Observer<T> for NextFn<F> {
    fn on_next(&self, value: &T) {
        (self.0)(value)
    }
}

/// An observer registered with a stream.
pub struct Subscriber<T> {
    id: SubscriptionId,
    observer: Box<dyn Observer<T>>,
    active: Rc<Cell<bool>>,
}

impl<T> Subscriber<T> {
    /// Creates a new active subscriber.
    pub fn new(id: SubscriptionId, observer: Box<dyn Observer<T>>) -> Self {
        Self {
            id,
            observer,
            active: Rc::new(Cell::new(true)),
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this subscriber still receives values.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stops delivery to this subscriber.
    #[inline]
    pub fn deactivate(&self) {
        self.active.set(false);
    }

    /// Delivers a value if still active.
    pub fn notify(&self, value: &T) {
        if self.is_active() {
            self.observer.on_next(value);
        }
    }

    /// Delivers completion if still active, then deactivates.
    pub fn complete(&self) {
        if self.is_active() {
            self.deactivate();
            self.observer.on_complete();
        }
    }
}

/// Manages the subscribers of one stream.
///
/// Subscribers are notified in subscription order.
pub struct SubscriptionManager<T> {
    subscribers: BTreeMap<SubscriptionId, Rc<Subscriber<T>>>,
    next_id: SubscriptionId,
}

impl<T> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionManager<T> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscribers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers an observer.
    ///
    /// Returns the subscription ID and the shared activity flag of the new
    /// subscriber.
    pub fn subscribe(&mut self, observer: Box<dyn Observer<T>>) -> (SubscriptionId, Rc<Cell<bool>>) {
        let id = self.next_id;
        self.next_id += 1;

        let subscriber = Subscriber::new(id, observer);
        let active = subscriber.active.clone();
        self.subscribers.insert(id, Rc::new(subscriber));

        (id, active)
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscribers.remove(&id) {
            Some(subscriber) => {
                subscriber.deactivate();
                true
            }
            None => false,
        }
    }

    /// Returns the current subscribers, so that delivery can proceed without
    /// holding a borrow of the manager.
    pub fn snapshot(&self) -> Vec<Rc<Subscriber<T>>> {
        self.subscribers.values().cloned().collect()
    }

    /// Removes every subscriber and returns them.
    pub fn drain(&mut self) -> Vec<Rc<Subscriber<T>>> {
        core::mem::take(&mut self.subscribers).into_values().collect()
    }

    /// Returns the number of subscribers.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns true if there are no subscribers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Returns all subscription IDs.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscribers.keys().copied().collect()
    }

    /// Deactivates and removes all subscribers.
    pub fn clear(&mut self) {
        for subscriber in self.drain() {
            subscriber.deactivate();
        }
    }
}

/// Something a subscription can be detached from.
pub(crate) trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
}

/// An explicit handle to a registered observer.
///
/// Dropping a `Subscription` does not unsubscribe; call
/// [`Subscription::unsubscribe`].
pub struct Subscription {
    id: SubscriptionId,
    active: Rc<Cell<bool>>,
    source: Weak<dyn Detach>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, active: Rc<Cell<bool>>, source: Weak<dyn Detach>) -> Self {
        Self { id, active, source }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether the observer still receives values.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stops delivery immediately, including for the rest of a delivery that
    /// is in progress. Returns true if the subscription was active.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.replace(false) {
            return false;
        }
        if let Some(source) = self.source.upgrade() {
            source.detach(self.id);
        }
        true
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
