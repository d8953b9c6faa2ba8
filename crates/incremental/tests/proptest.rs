//! Property-based tests for keyflow-incremental using proptest.

use hashbrown::{HashMap, HashSet};
use keyflow_incremental::{
    diff_all, diff_changed, ApplyMode, Diff, GroupingIndex, MaterializedView, RefcountedProjection,
    WindowSlicer,
};
use proptest::prelude::*;

fn snapshot() -> impl Strategy<Value = HashMap<u8, u8>> {
    prop::collection::vec((any::<u8>(), 0u8..4), 0..40).prop_map(|v| v.into_iter().collect())
}

fn window() -> impl Strategy<Value = (usize, usize)> {
    (0usize..60, 0usize..60).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

/// One item operation: insert/update with a value, or delete.
#[derive(Clone, Debug)]
enum ItemOp {
    Upsert(u8, u8),
    Delete(u8),
}

fn item_ops() -> impl Strategy<Value = Vec<Vec<ItemOp>>> {
    let op = prop_oneof![
        (0u8..24, 0u8..6).prop_map(|(k, v)| ItemOp::Upsert(k, v)),
        (0u8..24).prop_map(ItemOp::Delete),
    ];
    prop::collection::vec(prop::collection::vec(op, 0..12), 1..12)
}

/// Builds a well-formed tick (each key at most once) from raw operations
/// against the current set of live keys.
fn tick_from_ops(live: &mut HashMap<u8, u8>, ops: &[ItemOp]) -> Diff<u8, u8> {
    let mut touched = HashSet::new();
    let mut tick = Diff::new();
    for op in ops {
        match *op {
            ItemOp::Upsert(k, v) => {
                if !touched.insert(k) {
                    continue;
                }
                if live.contains_key(&k) {
                    tick.update(k, v);
                } else {
                    tick.add(k, v);
                }
                live.insert(k, v);
            }
            ItemOp::Delete(k) => {
                if !live.contains_key(&k) || !touched.insert(k) {
                    continue;
                }
                tick.remove(k);
                live.remove(&k);
            }
        }
    }
    tick
}

proptest! {
    /// Applying either differ's output to `prev` yields exactly `cur`.
    #[test]
    fn differs_round_trip(prev in snapshot(), cur in snapshot()) {
        for diff in [diff_all(&prev, &cur), diff_changed(&prev, &cur)] {
            let mut view = MaterializedView::from_map(prev.clone(), ApplyMode::Strict);
            prop_assert!(view.try_apply(&diff).is_ok());
            prop_assert_eq!(view.snapshot(), &cur);
        }
    }

    /// `diff_changed` never updates an unchanged value; `diff_all` always
    /// updates keys present in both snapshots.
    #[test]
    fn differ_update_policies(prev in snapshot(), cur in snapshot()) {
        let changed = diff_changed(&prev, &cur);
        for (k, v) in &changed.updates {
            prop_assert_ne!(prev.get(k), Some(v));
        }
        let all = diff_all(&prev, &cur);
        let shared = cur.keys().filter(|k| prev.contains_key(*k)).count();
        prop_assert_eq!(all.updates.len(), shared);
    }

    /// Moving W1 -> W2 -> W3 materializes the same slice as W1 -> W3.
    #[test]
    fn window_composition_law(len in 0usize..50, w1 in window(), w2 in window(), w3 in window()) {
        let rows: Vec<(usize, usize)> = (0..len).map(|i| (i, i * 7)).collect();

        let mut two_steps = WindowSlicer::new(rows.clone());
        let mut view_a = MaterializedView::with_mode(ApplyMode::Strict);
        for (b, e) in [w1, w2, w3] {
            view_a.try_apply(&two_steps.slide(b, e).unwrap()).unwrap();
        }

        let mut one_step = WindowSlicer::new(rows.clone());
        let mut view_b = MaterializedView::with_mode(ApplyMode::Strict);
        for (b, e) in [w1, w3] {
            view_b.try_apply(&one_step.slide(b, e).unwrap()).unwrap();
        }

        prop_assert_eq!(view_a.snapshot(), view_b.snapshot());
        let expected: HashMap<usize, usize> = rows
            .iter()
            .copied()
            .skip(w3.0)
            .take(w3.1.saturating_sub(w3.0))
            .collect();
        prop_assert_eq!(view_b.snapshot(), &expected);
    }

    /// Requesting the same window twice yields an empty diff the second time.
    #[test]
    fn window_no_op_move(len in 0usize..50, w1 in window(), w2 in window()) {
        let rows: Vec<(usize, usize)> = (0..len).map(|i| (i, i)).collect();
        let mut slicer = WindowSlicer::new(rows);
        slicer.slide(w1.0, w1.1).unwrap();
        slicer.slide(w2.0, w2.1).unwrap();
        prop_assert!(slicer.slide(w2.0, w2.1).unwrap().is_empty());
    }

    /// The union of all groups' members is exactly the set of live items,
    /// with no item in two groups, and the outer diff keeps a folded view of
    /// the groups in sync.
    #[test]
    fn grouping_partitions_live_items(ticks in item_ops()) {
        let mut index: GroupingIndex<u8, u8, u8> = GroupingIndex::with_mode(ApplyMode::Strict);
        let mut live = HashMap::new();
        let mut folded: HashMap<u8, MaterializedView<u8, u8>> = HashMap::new();

        for ops in &ticks {
            let tick = tick_from_ops(&mut live, ops);
            let out = index.process(&tick, |v| v % 3);

            for (g, inner) in &out.insertions {
                prop_assert!(!folded.contains_key(g));
                let mut view = MaterializedView::with_mode(ApplyMode::Strict);
                prop_assert!(view.try_apply(inner).is_ok());
                folded.insert(*g, view);
            }
            for (g, inner) in &out.updates {
                let view = folded.get_mut(g);
                prop_assert!(view.is_some());
                prop_assert!(view.unwrap().try_apply(inner).is_ok());
            }
            for g in &out.deletions {
                prop_assert!(folded.remove(g).is_some());
            }

            let mut seen = HashSet::new();
            for (g, members) in index.groups() {
                prop_assert!(!members.is_empty());
                for (k, v) in members.iter() {
                    prop_assert!(seen.insert(*k), "item {} in two groups", k);
                    prop_assert_eq!(v % 3, *g);
                    prop_assert_eq!(folded.get(g).and_then(|f| f.get(k)), Some(v));
                }
            }
            let live_keys: HashSet<u8> = live.keys().copied().collect();
            prop_assert_eq!(seen, live_keys);
            prop_assert_eq!(folded.len(), index.group_count());
        }
    }

    /// A projection key is present iff its refcount is positive, and the
    /// emitted diffs keep a folded view equal to the live key set.
    #[test]
    fn projection_presence_matches_refcount(ticks in item_ops()) {
        let mut proj: RefcountedProjection<u8, u8, u8, u8, 2> =
            RefcountedProjection::new(|v: &u8| [(v % 5, *v), (v / 5, *v)]);
        let mut live = HashMap::new();
        let mut folded = MaterializedView::with_mode(ApplyMode::Strict);

        for ops in &ticks {
            let tick = tick_from_ops(&mut live, ops);
            let out = proj.process(&tick).unwrap();
            prop_assert!(folded.try_apply(&out).is_ok());

            let mut expected: HashMap<u8, usize> = HashMap::new();
            for v in live.values() {
                *expected.entry(v % 5).or_default() += 1;
                *expected.entry(v / 5).or_default() += 1;
            }
            for p in 0u8..10 {
                let count = expected.get(&p).copied().unwrap_or(0);
                prop_assert_eq!(proj.refcount(&p), count);
                prop_assert_eq!(proj.contains(&p), count > 0);
                prop_assert_eq!(folded.contains_key(&p), count > 0);
            }
        }
    }

    /// `compose` has the same effect as applying both operands in sequence.
    #[test]
    fn compose_matches_sequential_application(
        base in snapshot(),
        first in snapshot(),
        second in snapshot(),
    ) {
        let d1 = diff_changed(&base, &first);
        let d2 = diff_changed(&first, &second);

        let mut composed_view = MaterializedView::from_map(base.clone(), ApplyMode::Strict);
        prop_assert!(composed_view.try_apply(&d1.compose(d2)).is_ok());
        prop_assert_eq!(composed_view.snapshot(), &second);
    }
}
