//! Switching between inner diff streams.
//!
//! `switch_diffs` follows the most recent inner stream of a stream of
//! streams. Each inner stream emits successive states that carry their own
//! diff against the previous state of the same stream. When a new inner
//! stream takes over, its first state is diffed against the last state seen
//! from the previous stream, so downstream views move across the switch with
//! a real transition diff instead of a reset.

use crate::subject::Subject;
use crate::subscription::{Observer, Subscription};
use alloc::rc::Rc;
use core::cell::RefCell;
use hashbrown::HashMap;
use keyflow_incremental::{Diff, Differ};

struct SwitchState<A> {
    /// Bumped on every switch; values from older inner streams are ignored.
    generation: u64,
    first: bool,
    last: Option<A>,
    outer_done: bool,
    inner_done: bool,
}

struct Core<A, K, V, FD, FX, D> {
    data_of: FD,
    diff_of: FX,
    differ: D,
    output: Subject<(A, Diff<K, V>)>,
    state: RefCell<SwitchState<A>>,
    inner: Rc<RefCell<Option<Subscription>>>,
}

impl<A, K, V, FD, FX, D> Core<A, K, V, FD, FX, D>
where
    A: Clone + 'static,
    K: Clone + 'static,
    V: Clone + 'static,
    FD: Fn(&A) -> &HashMap<K, V>,
    FX: Fn(&A) -> &Diff<K, V>,
    D: Differ<K, V>,
{
    fn transition(&self, value: &A) -> Diff<K, V> {
        let mut state = self.state.borrow_mut();
        let diff = if state.first {
            state.first = false;
            match &state.last {
                Some(prev) => self.differ.diff((self.data_of)(prev), (self.data_of)(value)),
                None => self.differ.diff(&HashMap::new(), (self.data_of)(value)),
            }
        } else {
            (self.diff_of)(value).clone()
        };
        state.last = Some(value.clone());
        diff
    }

    fn complete_if_done(&self) {
        let done = {
            let state = self.state.borrow();
            state.outer_done && (state.generation == 0 || state.inner_done)
        };
        if done {
            self.output.complete();
        }
    }
}

struct InnerObserver<A, K, V, FD, FX, D> {
    core: Rc<Core<A, K, V, FD, FX, D>>,
    generation: u64,
}

impl<A, K, V, FD, FX, D> InnerObserver<A, K, V, FD, FX, D> {
    fn is_current(&self) -> bool {
        self.core.state.borrow().generation == self.generation
    }
}

impl<A, K, V, FD, FX, D> Observer<A> for InnerObserver<A, K, V, FD, FX, D>
where
    A: Clone + 'static,
    K: Clone + 'static,
    V: Clone + 'static,
    FD: Fn(&A) -> &HashMap<K, V>,
    FX: Fn(&A) -> &Diff<K, V>,
    D: Differ<K, V>,
{
    fn on_next(&self, value: &A) {
        if !self.is_current() {
            return;
        }
        let diff = self.core.transition(value);
        log::trace!("switch forwarding {} changes", diff.len());
        self.core.output.next((value.clone(), diff));
    }

    fn on_complete(&self) {
        if !self.is_current() {
            return;
        }
        self.core.state.borrow_mut().inner_done = true;
        self.core.complete_if_done();
    }
}

struct OuterObserver<A, K, V, FD, FX, D> {
    core: Rc<Core<A, K, V, FD, FX, D>>,
}

impl<A, K, V, FD, FX, D> Observer<Subject<A>> for OuterObserver<A, K, V, FD, FX, D>
where
    A: Clone + 'static,
    K: Clone + 'static,
    V: Clone + 'static,
    FD: Fn(&A) -> &HashMap<K, V> + 'static,
    FX: Fn(&A) -> &Diff<K, V> + 'static,
    D: Differ<K, V> + 'static,
{
    fn on_next(&self, stream: &Subject<A>) {
        let generation = {
            let mut state = self.core.state.borrow_mut();
            state.generation += 1;
            state.first = true;
            state.inner_done = false;
            state.generation
        };
        let previous = self.core.inner.borrow_mut().take();
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
        log::debug!("switched to inner stream #{}", generation);

        let subscription = stream.subscribe_with(InnerObserver {
            core: self.core.clone(),
            generation,
        });
        if self.core.state.borrow().generation == generation {
            *self.core.inner.borrow_mut() = Some(subscription);
        } else {
            subscription.unsubscribe();
        }
    }

    fn on_complete(&self) {
        self.core.state.borrow_mut().outer_done = true;
        self.core.complete_if_done();
    }
}

/// The output of [`switch_diffs`] together with the means to cancel it.
pub struct SwitchHandle<A, K, V> {
    output: Subject<(A, Diff<K, V>)>,
    outer: Subscription,
    inner: Rc<RefCell<Option<Subscription>>>,
}

impl<A: 'static, K: 'static, V: 'static> SwitchHandle<A, K, V> {
    /// The switched stream of `(state, diff)` pairs.
    pub fn output(&self) -> &Subject<(A, Diff<K, V>)> {
        &self.output
    }

    /// Returns true while an inner stream is being followed.
    pub fn has_inner(&self) -> bool {
        self.inner
            .borrow()
            .as_ref()
            .map_or(false, Subscription::is_active)
    }

    /// Stops following the outer stream and the active inner stream.
    pub fn cancel(&self) {
        self.outer.unsubscribe();
        let inner = self.inner.borrow_mut().take();
        if let Some(inner) = inner {
            inner.unsubscribe();
        }
    }
}

/// Follows the latest inner stream of `outer`.
///
/// The first state of every inner stream is diffed with `differ` against the
/// last state forwarded before the switch (or against an empty collection for
/// the very first state). Later states of the same inner stream are
/// forwarded with the diff `diff_of` extracts from them, unmodified.
///
/// The output completes once `outer` has completed and the inner stream being
/// followed, if any, has completed too.
pub fn switch_diffs<A, K, V, FD, FX, D>(
    outer: &Subject<Subject<A>>,
    data_of: FD,
    diff_of: FX,
    differ: D,
) -> SwitchHandle<A, K, V>
where
    A: Clone + 'static,
    K: Clone + 'static,
    V: Clone + 'static,
    FD: Fn(&A) -> &HashMap<K, V> + 'static,
    FX: Fn(&A) -> &Diff<K, V> + 'static,
    D: Differ<K, V> + 'static,
{
    let output = Subject::new();
    let inner = Rc::new(RefCell::new(None));
    let core = Rc::new(Core {
        data_of,
        diff_of,
        differ,
        output: output.clone(),
        state: RefCell::new(SwitchState {
            generation: 0,
            first: true,
            last: None,
            outer_done: false,
            inner_done: false,
        }),
        inner: inner.clone(),
    });
    let outer = outer.subscribe_with(OuterObserver { core });
    SwitchHandle { output, outer, inner }
}
