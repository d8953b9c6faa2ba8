//! Incremental grouping of a flat item diff stream.
//!
//! `GroupingIndex` turns item-level diffs into a diff of groups, where every
//! outer entry carries the inner diff of that group's membership.

use crate::diff::Diff;
use crate::materialize::MaterializedView;
use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::HashMap;
use keyflow_core::{ApplyMode, Error};

/// A diff over groups whose values are diffs over the group's items.
pub type GroupedDiff<G, K, V> = Diff<G, Diff<K, V>>;

/// Maintains item-to-group membership and the contents of every group.
///
/// A group exists while it has at least one member.
pub struct GroupingIndex<K, V, G> {
    membership: HashMap<K, G>,
    groups: HashMap<G, MaterializedView<K, V>>,
    mode: ApplyMode,
}

impl<K, V, G> Default for GroupingIndex<K, V, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G> GroupingIndex<K, V, G> {
    pub fn new() -> Self {
        Self::with_mode(ApplyMode::default())
    }

    /// Creates an index whose item-level precondition violations follow
    /// `mode`: `Strict` panics, `Overwrite` treats a repeated insertion as
    /// an update, an update of an unknown item as an insertion, and ignores
    /// deletions of unknown items.
    pub fn with_mode(mode: ApplyMode) -> Self {
        Self {
            membership: HashMap::new(),
            groups: HashMap::new(),
            mode,
        }
    }

    /// Number of live groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of live items across all groups.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.membership.len()
    }

    /// Iterates over the live groups.
    pub fn groups(&self) -> impl Iterator<Item = (&G, &MaterializedView<K, V>)> {
        self.groups.iter()
    }
}

impl<K, V, G> GroupingIndex<K, V, G>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    G: Eq + Hash + Clone + Debug,
{
    /// Returns the contents of a group.
    pub fn group(&self, group: &G) -> Option<&MaterializedView<K, V>> {
        self.groups.get(group)
    }

    /// Returns the group an item belongs to.
    pub fn group_of(&self, key: &K) -> Option<&G> {
        self.membership.get(key)
    }

    /// Processes one tick with a total selector.
    pub fn process<F>(&mut self, diff: &Diff<K, V>, selector: F) -> GroupedDiff<G, K, V>
    where
        F: Fn(&V) -> G,
    {
        match self.try_process(diff, |v| Ok::<G, Infallible>(selector(v))) {
            Ok(grouped) => grouped,
            Err(never) => match never {},
        }
    }

    /// Processes one tick with a fallible selector.
    ///
    /// Every selector call happens before any state is touched, so a failing
    /// selector leaves the index as it was.
    pub fn try_process<E, F>(&mut self, diff: &Diff<K, V>, selector: F) -> Result<GroupedDiff<G, K, V>, E>
    where
        F: Fn(&V) -> Result<G, E>,
    {
        let inserted: Vec<G> = diff
            .insertions
            .iter()
            .map(|(_, v)| selector(v))
            .collect::<Result<_, E>>()?;
        let updated: Vec<G> = diff
            .updates
            .iter()
            .map(|(_, v)| selector(v))
            .collect::<Result<_, E>>()?;

        let mut tick = Tick::default();
        for ((key, value), group) in diff.insertions.iter().zip(inserted) {
            if self.membership.contains_key(key) {
                self.violation(Error::key_exists(key));
                self.leave(key, &mut tick);
            }
            self.join(key, value, group, &mut tick);
        }
        for ((key, value), group) in diff.updates.iter().zip(updated) {
            match self.membership.get(key) {
                Some(current) if *current == group => {
                    tick.inner(&self.groups, &group).update(key.clone(), value.clone());
                    if let Some(members) = self.groups.get_mut(&group) {
                        members.put(key.clone(), value.clone());
                    }
                }
                Some(_) => {
                    self.leave(key, &mut tick);
                    self.join(key, value, group, &mut tick);
                }
                None => {
                    self.violation(Error::key_missing(key));
                    self.join(key, value, group, &mut tick);
                }
            }
        }
        for key in &diff.deletions {
            if !self.leave(key, &mut tick) {
                self.violation(Error::key_missing(key));
            }
        }
        Ok(self.finish(tick))
    }

    fn join(&mut self, key: &K, value: &V, group: G, tick: &mut Tick<G, K, V>) {
        tick.inner(&self.groups, &group).add(key.clone(), value.clone());
        let mode = self.mode;
        let members = self.groups.entry(group.clone()).or_insert_with(|| {
            log::debug!("group {:?} created", group);
            MaterializedView::with_mode(mode)
        });
        members.put(key.clone(), value.clone());
        self.membership.insert(key.clone(), group);
    }

    /// Removes an item from its group, destroying the group if it empties.
    /// Returns false if the item had no group.
    fn leave(&mut self, key: &K, tick: &mut Tick<G, K, V>) -> bool {
        let Some(group) = self.membership.remove(key) else {
            return false;
        };
        tick.inner(&self.groups, &group).remove(key.clone());
        if let Some(members) = self.groups.get_mut(&group) {
            members.take(key);
            if members.is_empty() {
                self.groups.remove(&group);
                log::debug!("group {:?} destroyed", group);
            }
        }
        true
    }

    fn finish(&self, tick: Tick<G, K, V>) -> GroupedDiff<G, K, V> {
        let Tick { order, mut entries } = tick;
        let mut out = Diff::new();
        for group in order {
            let Some(entry) = entries.remove(&group) else {
                continue;
            };
            let inner = entry.inner.consolidate();
            match (entry.existed, self.groups.contains_key(&group)) {
                (false, true) => {
                    out.add(group, inner);
                }
                (true, false) => {
                    out.remove(group);
                }
                (true, true) if !inner.is_empty() => {
                    out.update(group, inner);
                }
                _ => {}
            }
        }
        log::trace!(
            "grouping tick: {} groups created, {} updated, {} destroyed",
            out.insertions.len(),
            out.updates.len(),
            out.deletions.len()
        );
        out
    }

    fn violation(&self, err: Error) {
        match self.mode {
            ApplyMode::Strict => panic!("item diff precondition violated: {}", err),
            ApplyMode::Overwrite => log::warn!("item diff precondition violated, overwriting: {}", err),
        }
    }
}

/// Per-tick accumulator: the inner diff of every touched group, and whether
/// the group existed when the tick started.
struct Tick<G, K, V> {
    order: Vec<G>,
    entries: HashMap<G, TickEntry<K, V>>,
}

struct TickEntry<K, V> {
    existed: bool,
    inner: Diff<K, V>,
}

impl<G, K, V> Default for Tick<G, K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<G: Eq + Hash + Clone, K, V> Tick<G, K, V> {
    /// Returns the inner diff for a group. Must be called before the group's
    /// membership is changed so that `existed` reflects the start of the tick.
    fn inner(&mut self, groups: &HashMap<G, MaterializedView<K, V>>, group: &G) -> &mut Diff<K, V> {
        let order = &mut self.order;
        &mut self
            .entries
            .entry(group.clone())
            .or_insert_with(|| {
                order.push(group.clone());
                TickEntry {
                    existed: groups.contains_key(group),
                    inner: Diff::new(),
                }
            })
            .inner
    }
}
