//! Incremental window over a virtual ordered array.
//!
//! `WindowSlicer` keeps track of the last requested index window and turns
//! each new request into the smallest diff that moves the materialized slice
//! from the old window's contents to the new one's.

use crate::diff::Diff;
use crate::differ::{Conservative, Differ};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::hash::Hash;
use core::ops::Range;
use hashbrown::HashMap;
use keyflow_core::{Error, InvertedRange, Result};

/// An ordered sequence addressable by index.
///
/// An array is immutable for its lifetime; a changed sequence is a new array
/// handed to [`WindowSlicer::replace_array`].
pub trait VirtualArray {
    type Key;
    type Value;

    fn len(&self) -> usize;

    /// Returns the entry at `index`. Only called with `index < len()`.
    fn item_at(&self, index: usize) -> (Self::Key, Self::Value);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Clone, V: Clone> VirtualArray for [(K, V)] {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        <[(K, V)]>::len(self)
    }

    fn item_at(&self, index: usize) -> (K, V) {
        self[index].clone()
    }
}

impl<K: Clone, V: Clone> VirtualArray for Vec<(K, V)> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item_at(&self, index: usize) -> (K, V) {
        self[index].clone()
    }
}

impl<A: VirtualArray + ?Sized> VirtualArray for Rc<A> {
    type Key = A::Key;
    type Value = A::Value;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn item_at(&self, index: usize) -> (A::Key, A::Value) {
        (**self).item_at(index)
    }
}

/// A virtual array computed on demand from an index function.
pub struct FnArray<F> {
    len: usize,
    item_fn: F,
}

impl<F> FnArray<F> {
    pub fn new(len: usize, item_fn: F) -> Self {
        Self { len, item_fn }
    }
}

impl<K, V, F> VirtualArray for FnArray<F>
where
    F: Fn(usize) -> (K, V),
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        self.len
    }

    fn item_at(&self, index: usize) -> (K, V) {
        (self.item_fn)(index)
    }
}

/// Maintains a half-open index window `[begin, end)` over a virtual array
/// and emits one diff per window move.
pub struct WindowSlicer<A> {
    array: A,
    window: Option<Range<usize>>,
    inverted: InvertedRange,
}

impl<A: VirtualArray> WindowSlicer<A> {
    /// Creates a slicer with no previous window.
    pub fn new(array: A) -> Self {
        Self {
            array,
            window: None,
            inverted: InvertedRange::default(),
        }
    }

    /// Sets the policy for `begin > end` requests.
    pub fn with_inverted(mut self, inverted: InvertedRange) -> Self {
        self.inverted = inverted;
        self
    }

    /// Returns the current array.
    #[inline]
    pub fn array(&self) -> &A {
        &self.array
    }

    /// Returns the current window, clamped to the array bounds.
    #[inline]
    pub fn window(&self) -> Option<Range<usize>> {
        self.window.clone()
    }

    /// Forgets the previous window; the next `slide` inserts the whole window.
    pub fn reset(&mut self) {
        self.window = None;
    }

    /// Returns the entries currently covered by the window, in index order.
    pub fn slice(&self) -> Vec<(A::Key, A::Value)> {
        match &self.window {
            Some(range) => range.clone().map(|i| self.array.item_at(i)).collect(),
            None => Vec::new(),
        }
    }

    fn clamp(&self, len: usize, begin: usize, end: usize) -> Result<Range<usize>> {
        let end = if begin > end {
            match self.inverted {
                InvertedRange::Reject => return Err(Error::inverted_window(begin, end)),
                InvertedRange::Empty => begin,
            }
        } else {
            end
        };
        Ok(begin.min(len)..end.min(len))
    }

    /// Moves the window to `[begin, end)` and returns the diff from the old
    /// slice to the new one.
    pub fn slide(&mut self, begin: usize, end: usize) -> Result<Diff<A::Key, A::Value>> {
        let cur = self.clamp(self.array.len(), begin, end)?;
        let mut diff = Diff::new();
        match self.window.take() {
            None => self.push_added(&mut diff, cur.clone()),
            Some(prev) if cur.start <= prev.end && prev.start <= cur.end => {
                if cur.start < prev.start {
                    self.push_added(&mut diff, cur.start..prev.start);
                } else {
                    self.push_removed(&mut diff, prev.start..cur.start);
                }
                if cur.end > prev.end {
                    self.push_added(&mut diff, prev.end..cur.end);
                } else {
                    self.push_removed(&mut diff, cur.end..prev.end);
                }
            }
            Some(prev) => {
                self.push_removed(&mut diff, prev);
                self.push_added(&mut diff, cur.clone());
            }
        }
        log::trace!("window moved to {:?}: {} changes", cur, diff.len());
        self.window = Some(cur);
        Ok(diff)
    }

    fn push_added(&self, diff: &mut Diff<A::Key, A::Value>, range: Range<usize>) {
        for i in range {
            let (key, value) = self.array.item_at(i);
            diff.add(key, value);
        }
    }

    fn push_removed(&self, diff: &mut Diff<A::Key, A::Value>, range: Range<usize>) {
        for i in range {
            diff.remove(self.array.item_at(i).0);
        }
    }
}

impl<A> WindowSlicer<A>
where
    A: VirtualArray,
    A::Key: Eq + Hash + Clone,
    A::Value: Clone,
{
    /// Swaps in a new version of the array and positions the window at
    /// `[begin, end)` on it.
    ///
    /// Indices do not identify entries across versions, so the diff compares
    /// the old materialized slice with the new one using [`Conservative`].
    pub fn replace_array(&mut self, array: A, begin: usize, end: usize) -> Result<Diff<A::Key, A::Value>> {
        self.replace_array_with(array, begin, end, &Conservative)
    }

    /// Like [`WindowSlicer::replace_array`] with a caller-chosen differ.
    pub fn replace_array_with<D>(
        &mut self,
        array: A,
        begin: usize,
        end: usize,
        differ: &D,
    ) -> Result<Diff<A::Key, A::Value>>
    where
        D: Differ<A::Key, A::Value>,
    {
        let cur = self.clamp(array.len(), begin, end)?;
        let old: HashMap<A::Key, A::Value> = self.slice().into_iter().collect();
        let new: HashMap<A::Key, A::Value> = cur.clone().map(|i| array.item_at(i)).collect();
        let diff = differ.diff(&old, &new);
        log::debug!(
            "window reseeded on new array (len {}) at {:?}: {} changes",
            array.len(),
            cur,
            diff.len()
        );
        self.array = array;
        self.window = Some(cur);
        Ok(diff)
    }
}
