//! keyflow Reactive - push-based diff streams.
//!
//! This crate connects the incremental components of `keyflow-incremental`
//! to synchronous push streams. Producers call `next` and every subscribed
//! consumer has fully processed the value before `next` returns, so diffs are
//! seen by all consumers in the order they were produced.
//!
//! # Core Concepts
//!
//! - `Subject`: a broadcast stream with explicit completion
//! - `Subscription`: an explicit unsubscribe token
//! - `ObservableView`: a materialized view that republishes applied diffs
//! - Operators: `diff_snapshots`, `map_diffs`, `filter_diffs`, `group_diffs`,
//!   `project_diffs` and `slice_windows`, plus `try_` forms that forward
//!   rejected ticks as `Err` items
//! - `switch_diffs`: follows the latest of several inner diff streams
//!
//! # Example
//!
//! ```
//! use keyflow_reactive::{diff_snapshots, ObservableView, Subject};
//! use keyflow_incremental::ValueAware;
//! use hashbrown::HashMap;
//!
//! let snapshots: Subject<HashMap<u32, &str>> = Subject::new();
//! let (diffs, _upstream) = diff_snapshots(&snapshots, ValueAware);
//!
//! let view = std::rc::Rc::new(ObservableView::new());
//! let sink = view.clone();
//! diffs.subscribe(move |diff| sink.push(diff.clone()));
//!
//! snapshots.next([(1, "a"), (2, "b")].into_iter().collect());
//! snapshots.next([(1, "a")].into_iter().collect());
//! assert_eq!(view.len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod observable;
pub mod operators;
pub mod subject;
pub mod subscription;
pub mod switch;

pub use observable::ObservableView;
pub use operators::{
    diff_snapshots, filter_diffs, group_diffs, map_diffs, project_diffs, slice_windows, try_group_diffs,
    try_project_diffs, try_slice_windows,
};
pub use subject::Subject;
pub use subscription::{Observer, Subscriber, Subscription, SubscriptionId, SubscriptionManager};
pub use switch::{switch_diffs, SwitchHandle};

// Re-export commonly used types from dependencies
pub use keyflow_incremental::{Diff, MaterializedView};
