//! Synchronous push streams.
//!
//! A `Subject` is a broadcast point: every value passed to `next` is delivered
//! to each active observer, in subscription order, before the outermost
//! `next` returns.

use crate::subscription::{Detach, NextFn, Observer, Subscription, SubscriptionId, SubscriptionManager};
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

struct SubjectState<T> {
    subscribers: SubscriptionManager<T>,
    completed: bool,
    /// Set while a `next` call is running its delivery loop.
    delivering: bool,
    /// Values pushed from inside a callback, waiting for the current one.
    pending: VecDeque<T>,
}

impl<T> Detach for RefCell<SubjectState<T>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        self.borrow_mut().subscribers.unsubscribe(id)
    }
}

/// Ends a delivery loop, also when an observer panics.
struct Delivering<'a, T>(&'a RefCell<SubjectState<T>>);

impl<T> Drop for Delivering<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.delivering = false;
            state.pending.clear();
        }
    }
}

/// A cloneable handle to a synchronous, ordered push stream.
///
/// Observers may subscribe or unsubscribe from inside a callback. An observer
/// unsubscribed during a delivery receives nothing further, even from that
/// delivery. A value pushed from inside a callback is queued and delivered
/// once the current value has reached every observer, so all observers see
/// values in the order they were pushed.
pub struct Subject<T> {
    state: Rc<RefCell<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Subject<T> {
    /// Creates a new subject with no observers.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                subscribers: SubscriptionManager::new(),
                completed: false,
                delivering: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Subscribes a closure to the values of this stream.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_with(NextFn(callback))
    }

    /// Subscribes an observer to values and completion.
    ///
    /// Subscribing to a completed stream delivers the completion immediately
    /// and returns an inactive subscription.
    pub fn subscribe_with<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T> + 'static,
    {
        if self.is_completed() {
            observer.on_complete();
            let source: Weak<dyn Detach> = Rc::downgrade(&self.state) as Weak<dyn Detach>;
            return Subscription::new(0, Rc::new(Cell::new(false)), source);
        }
        let (id, active) = self.state.borrow_mut().subscribers.subscribe(Box::new(observer));
        let source: Weak<dyn Detach> = Rc::downgrade(&self.state) as Weak<dyn Detach>;
        Subscription::new(id, active, source)
    }

    /// Pushes a value to every active observer. Ignored after completion.
    ///
    /// Called from inside a callback of this subject, the value is queued
    /// behind the one being delivered.
    pub fn next(&self, value: T) {
        {
            let mut state = self.state.borrow_mut();
            if state.completed {
                log::warn!("value pushed to a completed stream was dropped");
                return;
            }
            if state.delivering {
                state.pending.push_back(value);
                return;
            }
            state.delivering = true;
        }

        let guard = Delivering(&self.state);
        let mut value = value;
        loop {
            let targets = self.state.borrow().subscribers.snapshot();
            for subscriber in targets {
                subscriber.notify(&value);
            }
            let mut state = self.state.borrow_mut();
            match state.pending.pop_front() {
                Some(queued) => value = queued,
                None => break,
            }
        }
        drop(guard);

        // A `complete` issued during delivery waits for the queue to drain.
        let targets = {
            let mut state = self.state.borrow_mut();
            if !state.completed || state.subscribers.is_empty() {
                return;
            }
            state.subscribers.drain()
        };
        for subscriber in targets {
            subscriber.complete();
        }
    }

    /// Completes the stream: observers get `on_complete` once and are
    /// released. Later calls are ignored.
    ///
    /// Called during a delivery, values already queued are delivered first.
    pub fn complete(&self) {
        let targets = {
            let mut state = self.state.borrow_mut();
            if state.completed {
                return;
            }
            state.completed = true;
            if state.delivering {
                return;
            }
            state.subscribers.drain()
        };
        for subscriber in targets {
            subscriber.complete();
        }
    }

    /// Returns true once `complete` has been called.
    pub fn is_completed(&self) -> bool {
        self.state.borrow().completed
    }

    /// Returns the number of active observers.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use keyflow_incremental::{ApplyMode, Diff, MaterializedView};

    fn recorder<T: Clone + 'static>(subject: &Subject<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = subject.subscribe(move |v: &T| seen_clone.borrow_mut().push(v.clone()));
        (seen, sub)
    }

    struct CompletionFlag(Rc<Cell<bool>>);

    impl Observer<u32> for CompletionFlag {
        fn on_next(&self, _: &u32) {}

        fn on_complete(&self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_delivery_in_order() {
        let subject = Subject::new();
        let (seen, _sub) = recorder(&subject);
        subject.next(1u32);
        subject.next(2);
        subject.next(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_every_observer_receives() {
        let subject = Subject::new();
        let (a, _) = recorder(&subject);
        let (b, _) = recorder(&subject);
        subject.next(7u32);
        assert_eq!(*a.borrow(), vec![7]);
        assert_eq!(*b.borrow(), vec![7]);
        assert_eq!(subject.observer_count(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let subject = Subject::new();
        let (seen, sub) = recorder(&subject);
        subject.next(1u32);
        assert!(sub.unsubscribe());
        assert!(!sub.is_active());
        subject.next(2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(subject.observer_count(), 0);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_unsubscribe_during_delivery() {
        let subject: Subject<u32> = Subject::new();
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let later_clone = later.clone();
        let _first = subject.subscribe(move |_| {
            if let Some(sub) = later_clone.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        let (seen, second) = recorder(&subject);
        *later.borrow_mut() = Some(second);

        subject.next(1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_subscribe_during_delivery() {
        let subject: Subject<u32> = Subject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (subject_clone, seen_clone) = (subject.clone(), seen.clone());
        let _sub = subject.subscribe(move |v| {
            if *v == 1 {
                let seen_inner = seen_clone.clone();
                subject_clone.subscribe(move |w: &u32| seen_inner.borrow_mut().push(*w));
            }
        });

        subject.next(1);
        subject.next(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_nested_push_queued_behind_current() {
        let subject: Subject<u32> = Subject::new();
        let subject_clone = subject.clone();
        let _echo = subject.subscribe(move |v| {
            if *v < 3 {
                subject_clone.next(v + 1);
            }
        });
        let (seen, _) = recorder(&subject);

        subject.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_nested_diff_keeps_strict_view_consistent() {
        let subject: Subject<Diff<u32, u32>> = Subject::new();
        let subject_clone = subject.clone();
        let _react = subject.subscribe(move |diff: &Diff<u32, u32>| {
            if diff.insertions.iter().any(|(k, _)| *k == 1) {
                let mut follow_up = Diff::new();
                follow_up.update(1, 2);
                subject_clone.next(follow_up);
            }
        });
        let view = Rc::new(RefCell::new(MaterializedView::with_mode(ApplyMode::Strict)));
        let sink = view.clone();
        let _apply = subject.subscribe(move |diff: &Diff<u32, u32>| sink.borrow_mut().apply(diff));

        let mut insert = Diff::new();
        insert.add(1, 1);
        subject.next(insert);

        assert_eq!(view.borrow().get(&1), Some(&2));
    }

    #[test]
    fn test_complete_during_delivery_flushes_queue() {
        let subject: Subject<u32> = Subject::new();
        let subject_clone = subject.clone();
        let _closer = subject.subscribe(move |v| {
            if *v == 1 {
                subject_clone.next(2);
                subject_clone.complete();
                subject_clone.next(3);
            }
        });
        let done = Rc::new(Cell::new(false));
        let _flag = subject.subscribe_with(CompletionFlag(done.clone()));
        let (seen, _) = recorder(&subject);

        subject.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(done.get());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_delivery_recovers_after_panicking_observer() {
        let subject: Subject<u32> = Subject::new();
        let _bomb = subject.subscribe(|v| {
            if *v == 1 {
                panic!("observer failed");
            }
        });
        let (seen, _) = recorder(&subject);

        let pushed = subject.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || pushed.next(1)));
        assert!(result.is_err());

        subject.next(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_complete() {
        let subject: Subject<u32> = Subject::new();
        let done = Rc::new(Cell::new(false));
        let sub = subject.subscribe_with(CompletionFlag(done.clone()));
        let (seen, _) = recorder(&subject);

        subject.complete();
        assert!(done.get());
        assert!(!sub.is_active());
        assert!(subject.is_completed());
        assert_eq!(subject.observer_count(), 0);

        subject.next(5);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_subscribe_after_complete() {
        let subject: Subject<u32> = Subject::new();
        subject.complete();
        let done = Rc::new(Cell::new(false));
        let sub = subject.subscribe_with(CompletionFlag(done.clone()));
        assert!(done.get());
        assert!(!sub.is_active());
    }
}
