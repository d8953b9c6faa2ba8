//! Keyflow Core - Error and configuration types shared by the keyflow crates.
//!
//! - `Error` / `Result`: failures reported by checked operations
//! - `ApplyMode`: how a materialized view handles violated diff preconditions
//! - `InvertedRange`: what a window slicer does with `begin > end`
//! - `ValuePropagation`: when a refcounted projection re-derives values

#![no_std]

extern crate alloc;

mod config;
mod error;

pub use config::{ApplyMode, InvertedRange, ValuePropagation};
pub use error::{Error, Result};
