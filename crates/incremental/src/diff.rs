//! Diff type for keyed collections.
//!
//! A `Diff` describes a set of changes against a keyed collection as three
//! lists: insertions, updates and deletions. Applying a diff processes the
//! lists in that order.

use crate::materialize::MaterializedView;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::HashMap;

/// A set of changes to a keyed collection.
///
/// Within one diff a key appears in at most one of the three lists. The
/// builder methods do not enforce this; checked consumers such as
/// `MaterializedView::try_apply` report violations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<K, V> {
    /// Entries whose key must be absent from the target.
    pub insertions: Vec<(K, V)>,
    /// Entries whose key must be present in the target.
    pub updates: Vec<(K, V)>,
    /// Keys that must be present in the target.
    pub deletions: Vec<K>,
}

impl<K, V> Default for Diff<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A single keyed operation, used while composing diffs.
enum Op<V> {
    Insert(V),
    Update(V),
    Delete,
}

impl<K, V> Diff<K, V> {
    /// Creates an empty diff.
    #[inline]
    pub fn new() -> Self {
        Self {
            insertions: Vec::new(),
            updates: Vec::new(),
            deletions: Vec::new(),
        }
    }

    /// Creates an empty diff with room for `n` entries in each list.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            insertions: Vec::with_capacity(n),
            updates: Vec::with_capacity(n),
            deletions: Vec::with_capacity(n),
        }
    }

    /// Creates a diff inserting every entry of a snapshot.
    pub fn from_snapshot(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            insertions: entries.into_iter().collect(),
            updates: Vec::new(),
            deletions: Vec::new(),
        }
    }

    /// Appends an insertion.
    #[inline]
    pub fn add(&mut self, key: K, value: V) -> &mut Self {
        self.insertions.push((key, value));
        self
    }

    /// Appends an update.
    #[inline]
    pub fn update(&mut self, key: K, value: V) -> &mut Self {
        self.updates.push((key, value));
        self
    }

    /// Appends a deletion.
    #[inline]
    pub fn remove(&mut self, key: K) -> &mut Self {
        self.deletions.push(key);
        self
    }

    /// Returns true if all three lists are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }

    /// Returns the total number of entries across the three lists.
    #[inline]
    pub fn len(&self) -> usize {
        self.insertions.len() + self.updates.len() + self.deletions.len()
    }

    /// Iterates over every key touched by this diff, in application order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.insertions
            .iter()
            .map(|(k, _)| k)
            .chain(self.updates.iter().map(|(k, _)| k))
            .chain(self.deletions.iter())
    }

    /// Transforms every value and every key, preserving list membership.
    ///
    /// Keys that collapse onto the same target key are kept as separate
    /// entries; resolving such collisions is up to the consumer.
    pub fn map<K2, V2, FV, FK>(self, mut value_fn: FV, mut key_fn: FK) -> Diff<K2, V2>
    where
        FV: FnMut(V) -> V2,
        FK: FnMut(K) -> K2,
    {
        Diff {
            insertions: self
                .insertions
                .into_iter()
                .map(|(k, v)| (key_fn(k), value_fn(v)))
                .collect(),
            updates: self
                .updates
                .into_iter()
                .map(|(k, v)| (key_fn(k), value_fn(v)))
                .collect(),
            deletions: self.deletions.into_iter().map(key_fn).collect(),
        }
    }

    /// Transforms every value, keeping keys unchanged.
    pub fn map_values<V2, F>(self, value_fn: F) -> Diff<K, V2>
    where
        F: FnMut(V) -> V2,
    {
        self.map(value_fn, |k| k)
    }

    /// Keeps only entries whose key satisfies the predicate, in all three lists.
    pub fn retain_keys<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.insertions.retain(|(k, _)| predicate(k));
        self.updates.retain(|(k, _)| predicate(k));
        self.deletions.retain(|k| predicate(k));
    }

    /// Concatenates the lists of `other` after the lists of `self`.
    ///
    /// Entries for the same key are neither merged nor deduplicated. Use
    /// [`Diff::compose`] when the operands may touch the same keys.
    pub fn and_then(mut self, other: Diff<K, V>) -> Self {
        self.insertions.extend(other.insertions);
        self.updates.extend(other.updates);
        self.deletions.extend(other.deletions);
        self
    }

    fn into_ops(self) -> impl Iterator<Item = (K, Op<V>)> {
        self.insertions
            .into_iter()
            .map(|(k, v)| (k, Op::Insert(v)))
            .chain(self.updates.into_iter().map(|(k, v)| (k, Op::Update(v))))
            .chain(self.deletions.into_iter().map(|k| (k, Op::Delete)))
    }

    /// Applies this diff to a materialized view.
    pub fn apply(&self, view: &mut MaterializedView<K, V>)
    where
        K: Eq + Hash + Clone + Debug,
        V: Clone,
    {
        view.apply(self);
    }
}

impl<K, V> Diff<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Sequential composition: the result has the same effect as applying
    /// `self` and then `other`, with at most one entry per key.
    ///
    /// Pairs that are ill-formed on their own (insert after insert, update
    /// after delete, ...) resolve to the later value.
    pub fn compose(self, other: Diff<K, V>) -> Self {
        let mut composer = Composer::default();
        for (key, op) in self.into_ops().chain(other.into_ops()) {
            composer.push(key, op);
        }
        composer.finish()
    }

    /// Merges entries that share a key into their net effect.
    pub fn consolidate(self) -> Self {
        Diff::new().compose(self)
    }
}

struct Composer<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Option<Op<V>>)>,
}

impl<K, V> Default for Composer<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Composer<K, V> {
    fn push(&mut self, key: K, op: Op<V>) {
        match self.index.get(&key) {
            Some(&pos) => {
                let slot = &mut self.entries[pos].1;
                *slot = combine(slot.take(), op);
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, Some(op)));
            }
        }
    }

    fn finish(self) -> Diff<K, V> {
        let mut diff = Diff::new();
        for (key, op) in self.entries {
            match op {
                Some(Op::Insert(v)) => diff.add(key, v),
                Some(Op::Update(v)) => diff.update(key, v),
                Some(Op::Delete) => diff.remove(key),
                None => continue,
            };
        }
        diff
    }
}

/// Net effect of `prev` followed by `next` on one key. `None` means the key
/// was absent before and is absent after.
fn combine<V>(prev: Option<Op<V>>, next: Op<V>) -> Option<Op<V>> {
    match (prev, next) {
        (None, Op::Insert(v)) | (None, Op::Update(v)) => Some(Op::Insert(v)),
        (None, Op::Delete) => None,
        (Some(Op::Insert(_)), Op::Insert(v)) | (Some(Op::Insert(_)), Op::Update(v)) => {
            Some(Op::Insert(v))
        }
        (Some(Op::Insert(_)), Op::Delete) => None,
        (Some(Op::Update(_)), Op::Insert(v))
        | (Some(Op::Update(_)), Op::Update(v))
        | (Some(Op::Delete), Op::Insert(v))
        | (Some(Op::Delete), Op::Update(v)) => Some(Op::Update(v)),
        (Some(Op::Update(_)), Op::Delete) | (Some(Op::Delete), Op::Delete) => Some(Op::Delete),
    }
}
