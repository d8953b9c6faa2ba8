//! Full-snapshot differs.
//!
//! Both differs compare two complete snapshots of a keyed collection in a
//! single pass over each key set and produce the diff that turns `prev` into
//! `cur`.

use crate::diff::Diff;
use core::hash::Hash;
use hashbrown::HashMap;

/// Diffs two snapshots, emitting an update for every key present in both.
///
/// Use this when values cannot be compared meaningfully and downstream must
/// re-render every surviving entry.
pub fn diff_all<K, V>(prev: &HashMap<K, V>, cur: &HashMap<K, V>) -> Diff<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut diff = Diff::new();
    for (key, value) in cur {
        if prev.contains_key(key) {
            diff.update(key.clone(), value.clone());
        } else {
            diff.add(key.clone(), value.clone());
        }
    }
    push_deletions(&mut diff, prev, cur);
    diff
}

/// Diffs two snapshots, emitting an update only when the value changed.
pub fn diff_changed<K, V>(prev: &HashMap<K, V>, cur: &HashMap<K, V>) -> Diff<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    let mut diff = Diff::new();
    for (key, value) in cur {
        match prev.get(key) {
            Some(old) if old == value => {}
            Some(_) => {
                diff.update(key.clone(), value.clone());
            }
            None => {
                diff.add(key.clone(), value.clone());
            }
        }
    }
    push_deletions(&mut diff, prev, cur);
    diff
}

fn push_deletions<K, V>(diff: &mut Diff<K, V>, prev: &HashMap<K, V>, cur: &HashMap<K, V>)
where
    K: Eq + Hash + Clone,
{
    for key in prev.keys() {
        if !cur.contains_key(key) {
            diff.remove(key.clone());
        }
    }
}

/// A full-collection differ, for components that take the differ as a
/// parameter.
pub trait Differ<K, V> {
    fn diff(&self, prev: &HashMap<K, V>, cur: &HashMap<K, V>) -> Diff<K, V>;
}

/// [`diff_all`] as a [`Differ`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Conservative;

/// [`diff_changed`] as a [`Differ`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueAware;

impl<K, V> Differ<K, V> for Conservative
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn diff(&self, prev: &HashMap<K, V>, cur: &HashMap<K, V>) -> Diff<K, V> {
        diff_all(prev, cur)
    }
}

impl<K, V> Differ<K, V> for ValueAware
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    fn diff(&self, prev: &HashMap<K, V>, cur: &HashMap<K, V>) -> Diff<K, V> {
        diff_changed(prev, cur)
    }
}
