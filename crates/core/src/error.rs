//! Error types for keyflow.

use alloc::format;
use alloc::string::String;
use core::fmt::Debug;
use thiserror::Error;

/// Result type alias for keyflow operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by checked keyflow operations.
///
/// Keys are carried in their `Debug` rendering so that the error type stays
/// independent of the key type of the collection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An insertion targeted a key that is already present.
    #[error("key already present: {key}")]
    KeyExists { key: String },
    /// An update or deletion targeted a key that is absent.
    #[error("key not present: {key}")]
    KeyMissing { key: String },
    /// A key appears more than once within a single diff.
    #[error("key appears more than once in one diff: {key}")]
    DuplicateKey { key: String },
    /// A window was requested with `begin > end`.
    #[error("inverted window: [{begin}, {end})")]
    InvertedWindow { begin: usize, end: usize },
    /// A reference count would have dropped below zero.
    #[error("refcount underflow for key: {key}")]
    RefcountUnderflow { key: String },
    /// An update or deletion referenced a record that was never inserted.
    #[error("unknown record: {key}")]
    UnknownRecord { key: String },
}

impl Error {
    /// Creates a key exists error.
    pub fn key_exists(key: &impl Debug) -> Self {
        Error::KeyExists {
            key: format!("{:?}", key),
        }
    }

    /// Creates a key missing error.
    pub fn key_missing(key: &impl Debug) -> Self {
        Error::KeyMissing {
            key: format!("{:?}", key),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(key: &impl Debug) -> Self {
        Error::DuplicateKey {
            key: format!("{:?}", key),
        }
    }

    /// Creates an inverted window error.
    pub fn inverted_window(begin: usize, end: usize) -> Self {
        Error::InvertedWindow { begin, end }
    }

    /// Creates a refcount underflow error.
    pub fn refcount_underflow(key: &impl Debug) -> Self {
        Error::RefcountUnderflow {
            key: format!("{:?}", key),
        }
    }

    /// Creates an unknown record error.
    pub fn unknown_record(key: &impl Debug) -> Self {
        Error::UnknownRecord {
            key: format!("{:?}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::key_exists(&"alice");
        assert_eq!(err.to_string(), "key already present: \"alice\"");

        let err = Error::key_missing(&42);
        assert!(err.to_string().contains("42"));

        let err = Error::inverted_window(7, 3);
        assert_eq!(err.to_string(), "inverted window: [7, 3)");
    }

    #[test]
    fn test_error_constructors() {
        match Error::refcount_underflow(&"bob") {
            Error::RefcountUnderflow { key } => assert_eq!(key, "\"bob\""),
            _ => panic!("Wrong error type"),
        }
        match Error::unknown_record(&3u32) {
            Error::UnknownRecord { key } => assert_eq!(key, "3"),
            _ => panic!("Wrong error type"),
        }
    }
}
