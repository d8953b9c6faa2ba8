//! Refcounted projection of a primary collection onto referenced keys.
//!
//! Each primary record references a fixed number of projection keys (for
//! example the two endpoints of a message). A projection entry exists while
//! at least one live record references it.
//!
//! Value propagation is governed by [`ValuePropagation`]. With the default
//! `SameKeyUpdate`, a plain refcount increment on a key that is already live
//! does not change its value: only a record update that keeps the same key in
//! a reference slot pushes that slot's value. A value carried by a second
//! record referencing the same key is therefore not observed until one of the
//! same-key update paths runs. `EveryTouch` re-derives the value on every
//! reference that touches a live key.

use crate::diff::Diff;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::{HashMap, HashSet};
use keyflow_core::{Error, Result, ValuePropagation};

/// Extracts the `N` projection references of a record.
pub type RefsFn<R, P, PV, const N: usize> = Box<dyn Fn(&R) -> [(P, PV); N]>;

/// Derives a projection collection from a primary one using per-key
/// reference counts.
pub struct RefcountedProjection<K, R, P, PV, const N: usize> {
    refs: RefsFn<R, P, PV, N>,
    /// Reference targets of every live record, per slot.
    records: HashMap<K, [P; N]>,
    /// Entry exists iff the count is positive.
    refcounts: HashMap<P, usize>,
    values: HashMap<P, PV>,
    propagation: ValuePropagation,
}

impl<K, R, P, PV, const N: usize> RefcountedProjection<K, R, P, PV, N>
where
    K: Eq + Hash + Clone + Debug,
    P: Eq + Hash + Clone + Debug,
    PV: Clone,
{
    pub fn new<F>(refs: F) -> Self
    where
        F: Fn(&R) -> [(P, PV); N] + 'static,
    {
        Self {
            refs: Box::new(refs),
            records: HashMap::new(),
            refcounts: HashMap::new(),
            values: HashMap::new(),
            propagation: ValuePropagation::default(),
        }
    }

    pub fn with_propagation(mut self, propagation: ValuePropagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Number of live projection entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.refcounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.refcounts.is_empty()
    }

    /// Returns the reference count of a projection key (zero if absent).
    pub fn refcount(&self, key: &P) -> usize {
        self.refcounts.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &P) -> bool {
        self.refcounts.contains_key(key)
    }

    /// Returns the last propagated value of a projection key.
    pub fn value(&self, key: &P) -> Option<&PV> {
        self.values.get(key)
    }

    /// Returns the materialized projection.
    pub fn snapshot(&self) -> &HashMap<P, PV> {
        &self.values
    }

    /// Processes one tick of the primary collection and returns the diff of
    /// the projection.
    ///
    /// Record preconditions are checked before any state is touched; on
    /// error the projection is unchanged.
    pub fn process(&mut self, diff: &Diff<K, R>) -> Result<Diff<P, PV>> {
        self.validate(diff)?;

        let mut tick = Tick::default();
        for (key, record) in &diff.insertions {
            let refs = (self.refs)(record);
            for (target, value) in refs.iter().cloned() {
                self.retain(target, value, &mut tick);
            }
            self.records.insert(key.clone(), refs.map(|(p, _)| p));
        }
        for (key, record) in &diff.updates {
            let refs = (self.refs)(record);
            let old = self.records.get(key).cloned().ok_or_else(|| Error::unknown_record(key))?;
            for (slot, (target, value)) in refs.iter().cloned().enumerate() {
                if old[slot] == target {
                    tick.touch(&self.refcounts, &target).changed = true;
                    self.values.insert(target, value);
                } else {
                    self.release(&old[slot], &mut tick)?;
                    self.retain(target, value, &mut tick);
                }
            }
            self.records.insert(key.clone(), refs.map(|(p, _)| p));
        }
        for key in &diff.deletions {
            let old = self.records.remove(key).ok_or_else(|| Error::unknown_record(key))?;
            for target in &old {
                self.release(target, &mut tick)?;
            }
        }
        Ok(self.finish(tick))
    }

    fn validate(&self, diff: &Diff<K, R>) -> Result<()> {
        let mut seen: HashSet<&K> = HashSet::with_capacity(diff.len());
        for (key, _) in &diff.insertions {
            if !seen.insert(key) {
                return Err(Error::duplicate_key(key));
            }
            if self.records.contains_key(key) {
                return Err(Error::key_exists(key));
            }
        }
        for key in diff.updates.iter().map(|(k, _)| k).chain(diff.deletions.iter()) {
            if !seen.insert(key) {
                return Err(Error::duplicate_key(key));
            }
            if !self.records.contains_key(key) {
                return Err(Error::unknown_record(key));
            }
        }
        Ok(())
    }

    fn retain(&mut self, target: P, value: PV, tick: &mut Tick<P>) {
        let entry = tick.touch(&self.refcounts, &target);
        let count = self.refcounts.entry(target.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.values.insert(target, value);
        } else if self.propagation == ValuePropagation::EveryTouch {
            entry.changed = true;
            self.values.insert(target, value);
        }
    }

    fn release(&mut self, target: &P, tick: &mut Tick<P>) -> Result<()> {
        let entry = tick.touch(&self.refcounts, target);
        let count = self
            .refcounts
            .get_mut(target)
            .ok_or_else(|| Error::refcount_underflow(target))?;
        *count -= 1;
        if *count == 0 {
            self.refcounts.remove(target);
            self.values.remove(target);
            entry.vanished = true;
        }
        Ok(())
    }

    fn finish(&self, tick: Tick<P>) -> Diff<P, PV> {
        let mut out = Diff::new();
        for target in tick.order {
            let Some(entry) = tick.entries.get(&target) else {
                continue;
            };
            let live = self.values.get(&target);
            match (entry.existed, live) {
                (false, Some(value)) => {
                    log::debug!("projection entry {:?} appeared", target);
                    out.add(target, value.clone());
                }
                (true, None) => {
                    log::debug!("projection entry {:?} disappeared", target);
                    out.remove(target);
                }
                (true, Some(value)) if entry.changed || entry.vanished => {
                    out.update(target, value.clone());
                }
                _ => {}
            }
        }
        out
    }
}

#[derive(Default)]
struct TickEntry {
    existed: bool,
    changed: bool,
    vanished: bool,
}

struct Tick<P> {
    order: Vec<P>,
    entries: HashMap<P, TickEntry>,
}

impl<P> Default for Tick<P> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<P: Eq + Hash + Clone> Tick<P> {
    fn touch(&mut self, refcounts: &HashMap<P, usize>, target: &P) -> &mut TickEntry {
        let order = &mut self.order;
        self.entries.entry(target.clone()).or_insert_with(|| {
            order.push(target.clone());
            TickEntry {
                existed: refcounts.contains_key(target),
                ..TickEntry::default()
            }
        })
    }
}
