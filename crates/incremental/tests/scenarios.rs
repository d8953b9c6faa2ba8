//! End-to-end scenarios combining several operators.

use keyflow_incremental::{
    ApplyMode, Diff, FnArray, GroupingIndex, MaterializedView, RefcountedProjection, WindowSlicer,
};

#[test]
fn dynamic_slice_disjoint_move() {
    let mut slicer = WindowSlicer::new(FnArray::new(100, |i: usize| (i, i)));
    let mut view = MaterializedView::with_mode(ApplyMode::Strict);

    let first = slicer.slide(0, 5).unwrap();
    assert_eq!(first.insertions, (0..5).map(|i| (i, i)).collect::<Vec<_>>());
    view.try_apply(&first).unwrap();

    let moved = slicer.slide(5, 10).unwrap();
    assert_eq!(moved.deletions, vec![0, 1, 2, 3, 4]);
    assert_eq!(moved.insertions, (5..10).map(|i| (i, i)).collect::<Vec<_>>());
    assert!(moved.updates.is_empty());

    view.try_apply(&moved).unwrap();
    let mut keys: Vec<usize> = view.keys().copied().collect();
    keys.sort();
    assert_eq!(keys, vec![5, 6, 7, 8, 9]);
}

#[test]
fn grouping_by_first_tuple_element() {
    let mut index: GroupingIndex<String, (u32, char), String> = GroupingIndex::with_mode(ApplyMode::Strict);
    let selector = |v: &(u32, char)| v.0.to_string();

    let mut first = Diff::new();
    first.add("0".to_string(), (0, 'a'));
    let out = index.process(&first, selector);
    let mut expected_inner = Diff::new();
    expected_inner.add("0".to_string(), (0, 'a'));
    assert_eq!(out.insertions, vec![("0".to_string(), expected_inner)]);
    assert!(out.updates.is_empty() && out.deletions.is_empty());

    let mut second = Diff::new();
    second.add("1".to_string(), (0, 'b'));
    let out = index.process(&second, selector);
    let mut expected_inner = Diff::new();
    expected_inner.add("1".to_string(), (0, 'b'));
    assert!(out.insertions.is_empty());
    assert_eq!(out.updates, vec![("0".to_string(), expected_inner)]);
}

/// Records reference two participants; participants are re-keyed by name
/// and grouped by name length.
#[test]
fn records_to_participants_to_groups() {
    #[derive(Clone, Debug)]
    struct Record {
        from: String,
        to: String,
    }

    let mut participants: RefcountedProjection<u32, Record, String, usize, 2> =
        RefcountedProjection::new(|r: &Record| [(r.from.clone(), r.from.len()), (r.to.clone(), r.to.len())]);
    let mut by_length: GroupingIndex<String, usize, usize> = GroupingIndex::with_mode(ApplyMode::Strict);
    let mut groups: MaterializedView<usize, MaterializedView<String, usize>> =
        MaterializedView::with_mode(ApplyMode::Strict);

    let mut records = Diff::new();
    records
        .add(1, Record { from: "ann".into(), to: "bo".into() })
        .add(2, Record { from: "bo".into(), to: "cy".into() });

    let people = participants.process(&records).unwrap();
    assert_eq!(people.insertions.len(), 3);

    let grouped = by_length.process(&people, |len| *len);
    for (g, inner) in &grouped.insertions {
        let mut members = MaterializedView::with_mode(ApplyMode::Strict);
        members.try_apply(inner).unwrap();
        let mut outer = Diff::new();
        outer.add(*g, members);
        groups.try_apply(&outer).unwrap();
    }
    assert_eq!(groups.len(), 2);
    assert_eq!(groups.get(&2).map(|m| m.len()), Some(2));
    assert_eq!(groups.get(&3).map(|m| m.len()), Some(1));

    let mut records = Diff::new();
    records.remove(1);
    let people = participants.process(&records).unwrap();
    assert_eq!(people.deletions, vec!["ann".to_string()]);

    let grouped = by_length.process(&people, |len| *len);
    assert_eq!(grouped.deletions, vec![3]);
    assert_eq!(by_length.item_count(), 2);
}
