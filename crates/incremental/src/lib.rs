//! Keyflow Incremental - incrementally maintained views over keyed collections.
//!
//! Producers describe changes to a keyed collection as a `Diff` (insertions,
//! updates, deletions). The operators in this crate transform those diffs into
//! diffs of derived collections without recomputing the derived collection
//! from scratch.
//!
//! # Core Concepts
//!
//! - `Diff<K, V>`: insertions, updates and deletions against a keyed collection
//! - `MaterializedView<K, V>`: a keyed map that diffs are folded into
//! - `diff_all` / `diff_changed`: diffs between two full snapshots
//!
//! # Incremental Operators
//!
//! - `WindowSlicer`: an index window over a virtual ordered array
//! - `GroupingIndex`: a diff of groups derived from an item diff
//! - `RefcountedProjection`: entries referenced by at least one record
//! - `ValueFilter`: a value predicate applied to a diff stream
//!
//! # Example
//!
//! ```
//! use keyflow_incremental::{Diff, MaterializedView, WindowSlicer};
//!
//! let rows: Vec<(u32, &str)> = vec![(10, "a"), (11, "b"), (12, "c"), (13, "d")];
//! let mut slicer = WindowSlicer::new(rows);
//! let mut view = MaterializedView::new();
//!
//! slicer.slide(0, 2).unwrap().apply(&mut view);
//! slicer.slide(1, 3).unwrap().apply(&mut view);
//!
//! assert_eq!(view.len(), 2);
//! assert_eq!(view.get(&12), Some(&"c"));
//! assert!(!view.contains_key(&10));
//! ```

#![no_std]

extern crate alloc;

pub mod diff;
pub mod differ;
pub mod materialize;
pub mod operators;

pub use diff::Diff;
pub use differ::{diff_all, diff_changed, Conservative, Differ, ValueAware};
pub use materialize::{MaterializedView, MaterializedViewBuilder};
pub use operators::{
    FnArray, GroupedDiff, GroupingIndex, RefcountedProjection, RefsFn, ValueFilter, VirtualArray,
    WindowSlicer,
};

pub use keyflow_core::{ApplyMode, Error, InvertedRange, Result, ValuePropagation};
