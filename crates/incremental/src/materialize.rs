//! Materialized views over keyed collections.
//!
//! A `MaterializedView` is the accumulation target of a diff stream: it owns a
//! keyed map and folds each diff into it in place.

use crate::diff::Diff;
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::{HashMap, HashSet};
use keyflow_core::{ApplyMode, Error, Result};

/// A keyed collection kept up to date by applying diffs.
///
/// The view has a single writer. Readers either observe the emitted diffs or
/// borrow the current snapshot between ticks.
#[derive(Clone, Debug)]
pub struct MaterializedView<K, V> {
    data: HashMap<K, V>,
    mode: ApplyMode,
}

impl<K, V> Default for MaterializedView<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MaterializedView<K, V> {
    /// Creates an empty view with the default apply mode.
    pub fn new() -> Self {
        Self::with_mode(ApplyMode::default())
    }

    /// Creates an empty view with the given apply mode.
    pub fn with_mode(mode: ApplyMode) -> Self {
        Self {
            data: HashMap::new(),
            mode,
        }
    }

    /// Creates a view holding the given map.
    pub fn from_map(data: HashMap<K, V>, mode: ApplyMode) -> Self {
        Self { data, mode }
    }

    /// Returns the apply mode.
    #[inline]
    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Returns the current contents.
    #[inline]
    pub fn snapshot(&self) -> &HashMap<K, V> {
        &self.data
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the view has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over the entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data.iter()
    }

    /// Iterates over the keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.data.keys()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Consumes the view, returning the underlying map.
    pub fn into_inner(self) -> HashMap<K, V> {
        self.data
    }
}

impl<K, V> MaterializedView<K, V>
where
    K: Eq + Hash,
{
    /// Returns the value for a key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Returns true if the key is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    pub(crate) fn put(&mut self, key: K, value: V) -> Option<V> {
        self.data.insert(key, value)
    }

    pub(crate) fn take(&mut self, key: &K) -> Option<V> {
        self.data.remove(key)
    }
}

impl<K, V> MaterializedView<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Folds a diff into the view: insertions, then updates, then deletions.
    ///
    /// A violated precondition panics under `ApplyMode::Strict`. Under
    /// `ApplyMode::Overwrite` the entry is written anyway (or the deletion
    /// skipped) and a warning is logged.
    pub fn apply(&mut self, diff: &Diff<K, V>) {
        log::trace!(
            "applying diff: {} insertions, {} updates, {} deletions",
            diff.insertions.len(),
            diff.updates.len(),
            diff.deletions.len()
        );
        for (key, value) in &diff.insertions {
            if self.data.insert(key.clone(), value.clone()).is_some() {
                self.violation(Error::key_exists(key));
            }
        }
        for (key, value) in &diff.updates {
            match self.data.get_mut(key) {
                Some(slot) => *slot = value.clone(),
                None => {
                    self.violation(Error::key_missing(key));
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
        for key in &diff.deletions {
            if self.data.remove(key).is_none() {
                self.violation(Error::key_missing(key));
            }
        }
    }

    /// Validates every precondition of the diff, then applies it.
    ///
    /// On error the view is left unchanged.
    pub fn try_apply(&mut self, diff: &Diff<K, V>) -> Result<()> {
        self.validate(diff)?;
        for (key, value) in &diff.insertions {
            self.data.insert(key.clone(), value.clone());
        }
        for (key, value) in &diff.updates {
            self.data.insert(key.clone(), value.clone());
        }
        for key in &diff.deletions {
            self.data.remove(key);
        }
        Ok(())
    }

    /// Checks that the diff touches each key once and that insertions target
    /// absent keys while updates and deletions target present ones.
    pub fn validate(&self, diff: &Diff<K, V>) -> Result<()> {
        let mut seen: HashSet<&K> = HashSet::with_capacity(diff.len());
        for (key, _) in &diff.insertions {
            if !seen.insert(key) {
                return Err(Error::duplicate_key(key));
            }
            if self.data.contains_key(key) {
                return Err(Error::key_exists(key));
            }
        }
        for key in diff.updates.iter().map(|(k, _)| k).chain(diff.deletions.iter()) {
            if !seen.insert(key) {
                return Err(Error::duplicate_key(key));
            }
            if !self.data.contains_key(key) {
                return Err(Error::key_missing(key));
            }
        }
        Ok(())
    }

    fn violation(&self, err: Error) {
        match self.mode {
            ApplyMode::Strict => panic!("diff precondition violated: {}", err),
            ApplyMode::Overwrite => log::warn!("diff precondition violated, overwriting: {}", err),
        }
    }
}

/// Builder for creating materialized views.
pub struct MaterializedViewBuilder<K, V> {
    mode: ApplyMode,
    initial: HashMap<K, V>,
}

impl<K, V> Default for MaterializedViewBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MaterializedViewBuilder<K, V> {
    pub fn new() -> Self {
        Self {
            mode: ApplyMode::default(),
            initial: HashMap::new(),
        }
    }

    pub fn mode(mut self, mode: ApplyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn initial(mut self, initial: HashMap<K, V>) -> Self {
        self.initial = initial;
        self
    }

    pub fn build(self) -> MaterializedView<K, V> {
        MaterializedView::from_map(self.initial, self.mode)
    }
}
