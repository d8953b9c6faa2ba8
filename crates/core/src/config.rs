//! Construction-time configuration shared by the keyflow components.

/// How a materialized view reacts to a diff whose preconditions do not hold
/// (insert of a present key, update or delete of an absent key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Panic on the first violated precondition.
    Strict,
    /// Insert over present keys, upsert missing updates, ignore missing
    /// deletes. Every violation is logged as a warning.
    Overwrite,
}

impl Default for ApplyMode {
    /// `Strict` in debug builds, `Overwrite` in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ApplyMode::Strict
        } else {
            ApplyMode::Overwrite
        }
    }
}

/// Policy for window requests with `begin > end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvertedRange {
    /// Return `Error::InvertedWindow` and leave the window untouched.
    #[default]
    Reject,
    /// Treat the request as an empty window positioned at `begin`.
    Empty,
}

/// When a refcounted projection propagates the value carried by a reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValuePropagation {
    /// Only a record update whose reference slot keeps the same target key
    /// emits an update for that key. Plain refcount increments on a key that
    /// is already live leave its value untouched.
    #[default]
    SameKeyUpdate,
    /// Every reference that touches a live key (insert, update or retarget)
    /// re-derives its value and emits an update.
    EveryTouch,
}
