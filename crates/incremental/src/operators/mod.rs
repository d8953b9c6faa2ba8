//! Incremental operators over diff streams.
//!
//! - Window: a sliding index window over a virtual ordered array
//! - Group: a diff of groups, each carrying the diff of its members
//! - Projection: a refcounted projection onto referenced keys
//! - Filter: a stateful value filter

mod filter;
mod group;
mod projection;
mod window;

pub use filter::ValueFilter;
pub use group::{GroupedDiff, GroupingIndex};
pub use projection::{RefcountedProjection, RefsFn};
pub use window::{FnArray, VirtualArray, WindowSlicer};
