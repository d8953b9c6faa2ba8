//! Stream operators wiring the incremental components into push streams.
//!
//! Each operator subscribes to a source stream and returns the derived
//! stream together with the subscription to the source. Completion of the
//! source completes the derived stream. Empty diffs are not forwarded.
//!
//! Stateful components are passed as `Rc<RefCell<_>>` so that callers keep
//! read access to their state between ticks.
//!
//! Operators over fallible components come in two forms. The plain form logs
//! a rejected tick and drops it. The `try_` form forwards every outcome as a
//! `Result`, so a rejected tick reaches downstream as an `Err` item. Either
//! way the component is left as it was before the rejected tick.

use crate::subject::Subject;
use crate::subscription::{Observer, Subscription};
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::Debug;
use core::hash::Hash;
use core::ops::Range;
use hashbrown::HashMap;
use keyflow_incremental::{
    Diff, Differ, GroupedDiff, GroupingIndex, RefcountedProjection, Result, ValueFilter, VirtualArray, WindowSlicer,
};

struct Forward<F, Out> {
    transform: F,
    sink: Subject<Out>,
}

impl<In, Out, F> Observer<In> for Forward<F, Out>
where
    Out: 'static,
    F: Fn(&In) -> Option<Out>,
{
    fn on_next(&self, value: &In) {
        if let Some(out) = (self.transform)(value) {
            self.sink.next(out);
        }
    }

    fn on_complete(&self) {
        self.sink.complete();
    }
}

fn forward<In, Out, F>(source: &Subject<In>, transform: F) -> (Subject<Out>, Subscription)
where
    In: 'static,
    Out: 'static,
    F: Fn(&In) -> Option<Out> + 'static,
{
    let sink = Subject::new();
    let subscription = source.subscribe_with(Forward {
        transform,
        sink: sink.clone(),
    });
    (sink, subscription)
}

fn non_empty<K, V>(diff: Diff<K, V>) -> Option<Diff<K, V>> {
    (!diff.is_empty()).then_some(diff)
}

fn non_empty_ok<K, V, E>(outcome: core::result::Result<Diff<K, V>, E>) -> Option<core::result::Result<Diff<K, V>, E>> {
    match outcome {
        Ok(diff) => non_empty(diff).map(Ok),
        Err(err) => Some(Err(err)),
    }
}

/// Turns a stream of full snapshots into a diff stream, diffing each
/// snapshot against the previous one (the first against an empty map).
pub fn diff_snapshots<K, V, D>(source: &Subject<HashMap<K, V>>, differ: D) -> (Subject<Diff<K, V>>, Subscription)
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
    D: Differ<K, V> + 'static,
{
    let prev = RefCell::new(HashMap::new());
    forward(source, move |snapshot: &HashMap<K, V>| {
        let mut prev = prev.borrow_mut();
        let diff = differ.diff(&prev, snapshot);
        *prev = snapshot.clone();
        non_empty(diff)
    })
}

/// Re-keys and transforms every diff of the source.
pub fn map_diffs<K, V, K2, V2, FV, FK>(
    source: &Subject<Diff<K, V>>,
    value_fn: FV,
    key_fn: FK,
) -> (Subject<Diff<K2, V2>>, Subscription)
where
    K: Clone + 'static,
    V: Clone + 'static,
    K2: 'static,
    V2: 'static,
    FV: Fn(V) -> V2 + 'static,
    FK: Fn(K) -> K2 + 'static,
{
    forward(source, move |diff: &Diff<K, V>| non_empty(diff.clone().map(&value_fn, &key_fn)))
}

/// Filters the source through a stateful value filter.
pub fn filter_diffs<K, V>(source: &Subject<Diff<K, V>>, filter: ValueFilter<K, V>) -> (Subject<Diff<K, V>>, Subscription)
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    let filter = RefCell::new(filter);
    forward(source, move |diff: &Diff<K, V>| non_empty(filter.borrow_mut().process(diff)))
}

/// Groups the source's items, emitting a diff of groups per tick.
pub fn group_diffs<K, V, G, F>(
    source: &Subject<Diff<K, V>>,
    index: Rc<RefCell<GroupingIndex<K, V, G>>>,
    selector: F,
) -> (Subject<GroupedDiff<G, K, V>>, Subscription)
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
    G: Eq + Hash + Clone + Debug + 'static,
    F: Fn(&V) -> G + 'static,
{
    forward(source, move |diff: &Diff<K, V>| {
        non_empty(index.borrow_mut().process(diff, &selector))
    })
}

/// Groups the source's items with a fallible selector.
///
/// A tick whose selector fails is forwarded as `Err` and leaves the index
/// untouched.
pub fn try_group_diffs<K, V, G, E, F>(
    source: &Subject<Diff<K, V>>,
    index: Rc<RefCell<GroupingIndex<K, V, G>>>,
    selector: F,
) -> (Subject<core::result::Result<GroupedDiff<G, K, V>, E>>, Subscription)
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
    G: Eq + Hash + Clone + Debug + 'static,
    E: 'static,
    F: Fn(&V) -> core::result::Result<G, E> + 'static,
{
    forward(source, move |diff: &Diff<K, V>| {
        non_empty_ok(index.borrow_mut().try_process(diff, &selector))
    })
}

/// Projects the source's records onto their referenced keys.
///
/// A tick rejected by the projection is logged and dropped; the projection
/// state is unchanged by it.
pub fn project_diffs<K, R, P, PV, const N: usize>(
    source: &Subject<Diff<K, R>>,
    projection: Rc<RefCell<RefcountedProjection<K, R, P, PV, N>>>,
) -> (Subject<Diff<P, PV>>, Subscription)
where
    K: Eq + Hash + Clone + Debug + 'static,
    R: 'static,
    P: Eq + Hash + Clone + Debug + 'static,
    PV: Clone + 'static,
{
    forward(source, move |diff: &Diff<K, R>| match projection.borrow_mut().process(diff) {
        Ok(out) => non_empty(out),
        Err(err) => {
            log::error!("projection tick dropped: {}", err);
            None
        }
    })
}

/// Like [`project_diffs`], forwarding rejected ticks as `Err`.
pub fn try_project_diffs<K, R, P, PV, const N: usize>(
    source: &Subject<Diff<K, R>>,
    projection: Rc<RefCell<RefcountedProjection<K, R, P, PV, N>>>,
) -> (Subject<Result<Diff<P, PV>>>, Subscription)
where
    K: Eq + Hash + Clone + Debug + 'static,
    R: 'static,
    P: Eq + Hash + Clone + Debug + 'static,
    PV: Clone + 'static,
{
    forward(source, move |diff: &Diff<K, R>| {
        non_empty_ok(projection.borrow_mut().process(diff))
    })
}

/// Moves a window for every requested range and emits the slice diffs.
///
/// Rejected ranges are logged and dropped.
pub fn slice_windows<A>(
    source: &Subject<Range<usize>>,
    slicer: Rc<RefCell<WindowSlicer<A>>>,
) -> (Subject<Diff<A::Key, A::Value>>, Subscription)
where
    A: VirtualArray + 'static,
    A::Key: 'static,
    A::Value: 'static,
{
    forward(source, move |range: &Range<usize>| {
        match slicer.borrow_mut().slide(range.start, range.end) {
            Ok(diff) => non_empty(diff),
            Err(err) => {
                log::error!("window request dropped: {}", err);
                None
            }
        }
    })
}

/// Like [`slice_windows`], forwarding rejected ranges as `Err`.
pub fn try_slice_windows<A>(
    source: &Subject<Range<usize>>,
    slicer: Rc<RefCell<WindowSlicer<A>>>,
) -> (Subject<Result<Diff<A::Key, A::Value>>>, Subscription)
where
    A: VirtualArray + 'static,
    A::Key: 'static,
    A::Value: 'static,
{
    forward(source, move |range: &Range<usize>| {
        non_empty_ok(slicer.borrow_mut().slide(range.start, range.end))
    })
}
