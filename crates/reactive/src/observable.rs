//! Observable materialized view.
//!
//! This module provides `ObservableView`, which folds a diff stream into a
//! materialized view and republishes every applied diff to its subscribers.
//! Rendering collaborators bootstrap from `snapshot()` (or `initial()`) and
//! then follow the diffs.

use crate::subject::Subject;
use crate::subscription::Subscription;
use core::cell::{Ref, RefCell};
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::HashMap;
use keyflow_core::{ApplyMode, Result};
use keyflow_incremental::{Diff, MaterializedView};

/// A materialized view that notifies subscribers of every applied diff.
///
/// # Example
///
/// ```ignore
/// let people = ObservableView::new();
/// let sub = people.subscribe(|diff| render(diff));
///
/// let mut diff = Diff::new();
/// diff.add(1, "alice");
/// people.push(diff);
/// assert_eq!(people.len(), 1);
/// ```
pub struct ObservableView<K, V> {
    view: RefCell<MaterializedView<K, V>>,
    changes: Subject<Diff<K, V>>,
}

impl<K, V> Default for ObservableView<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ObservableView<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + 'static,
{
    /// Creates an empty view with the default apply mode.
    pub fn new() -> Self {
        Self::with_mode(ApplyMode::default())
    }

    pub fn with_mode(mode: ApplyMode) -> Self {
        Self {
            view: RefCell::new(MaterializedView::with_mode(mode)),
            changes: Subject::new(),
        }
    }

    /// Returns the current contents. The borrow must end before the next
    /// `push`.
    pub fn snapshot(&self) -> Ref<'_, HashMap<K, V>> {
        Ref::map(self.view.borrow(), |v| v.snapshot())
    }

    /// Returns the current contents as an insert-everything diff.
    pub fn initial(&self) -> Diff<K, V> {
        Diff::from_snapshot(self.view.borrow().iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    pub fn len(&self) -> usize {
        self.view.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.borrow().is_empty()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.view.borrow().get(key).cloned()
    }

    /// Applies a diff, then notifies subscribers. Empty diffs are applied but
    /// not published.
    pub fn push(&self, diff: Diff<K, V>) {
        self.view.borrow_mut().apply(&diff);
        if !diff.is_empty() {
            self.changes.next(diff);
        }
    }

    /// Like [`ObservableView::push`], but validates the diff first; on error
    /// nothing is applied or published.
    pub fn try_push(&self, diff: Diff<K, V>) -> Result<()> {
        self.view.borrow_mut().try_apply(&diff)?;
        if !diff.is_empty() {
            self.changes.next(diff);
        }
        Ok(())
    }

    /// Subscribes to the diffs applied after this call.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Diff<K, V>) + 'static,
    {
        self.changes.subscribe(callback)
    }

    /// Returns the stream of applied diffs.
    pub fn changes(&self) -> Subject<Diff<K, V>> {
        self.changes.clone()
    }

    /// Returns the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.changes.observer_count()
    }
}
