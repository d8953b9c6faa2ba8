//! Incremental value filter.

use crate::diff::Diff;
use alloc::boxed::Box;
use core::hash::Hash;
use hashbrown::HashSet;

/// Filters a diff stream by a value predicate.
///
/// The filter remembers which keys currently pass, so an update that moves a
/// value into the predicate becomes an insertion, one that moves it out
/// becomes a deletion, and deletions are forwarded only for passing keys.
///
/// # Example
///
/// ```ignore
/// let mut adults = ValueFilter::new(|_id: &u32, age: &u32| *age >= 18);
/// let mut diff = Diff::new();
/// diff.add(1, 30).add(2, 12);
/// let out = adults.process(&diff);
/// // out.insertions == [(1, 30)]
/// ```
pub struct ValueFilter<K, V> {
    predicate: Box<dyn Fn(&K, &V) -> bool>,
    passing: HashSet<K>,
}

impl<K, V> ValueFilter<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&K, &V) -> bool + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            passing: HashSet::new(),
        }
    }

    /// Number of keys currently passing the predicate.
    #[inline]
    pub fn len(&self) -> usize {
        self.passing.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passing.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.passing.contains(key)
    }

    /// Filters one tick.
    pub fn process(&mut self, diff: &Diff<K, V>) -> Diff<K, V> {
        let mut out = Diff::new();
        for (key, value) in &diff.insertions {
            if (self.predicate)(key, value) {
                self.passing.insert(key.clone());
                out.add(key.clone(), value.clone());
            }
        }
        for (key, value) in &diff.updates {
            let was = self.passing.contains(key);
            let is = (self.predicate)(key, value);
            match (was, is) {
                (true, true) => {
                    out.update(key.clone(), value.clone());
                }
                (false, true) => {
                    self.passing.insert(key.clone());
                    out.add(key.clone(), value.clone());
                }
                (true, false) => {
                    self.passing.remove(key);
                    out.remove(key.clone());
                }
                (false, false) => {}
            }
        }
        for key in &diff.deletions {
            if self.passing.remove(key) {
                out.remove(key.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn adults() -> ValueFilter<u32, u32> {
        ValueFilter::new(|_, age: &u32| *age >= 18)
    }

    #[test]
    fn test_filter_insertions() {
        let mut filter = adults();
        let mut diff = Diff::new();
        diff.add(1, 30).add(2, 12).add(3, 18);
        let out = filter.process(&diff);
        assert_eq!(out.insertions, vec![(1, 30), (3, 18)]);
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_updates_cross_the_predicate() {
        let mut filter = adults();
        let mut diff = Diff::new();
        diff.add(1, 30).add(2, 12);
        filter.process(&diff);

        let mut diff = Diff::new();
        diff.update(1, 10).update(2, 20);
        let out = filter.process(&diff);
        assert_eq!(out.insertions, vec![(2, 20)]);
        assert_eq!(out.deletions, vec![1]);
        assert!(out.updates.is_empty());

        let mut diff = Diff::new();
        diff.update(2, 21).update(1, 11);
        let out = filter.process(&diff);
        assert_eq!(out.updates, vec![(2, 21)]);
        assert!(out.insertions.is_empty() && out.deletions.is_empty());
    }

    #[test]
    fn test_deletions_only_for_passing_keys() {
        let mut filter = adults();
        let mut diff = Diff::new();
        diff.add(1, 30).add(2, 12);
        filter.process(&diff);

        let mut diff = Diff::new();
        diff.remove(1).remove(2);
        let out = filter.process(&diff);
        assert_eq!(out.deletions, vec![1]);
        assert!(filter.is_empty());
    }
}
