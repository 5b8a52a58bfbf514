//! Sort keys for ordered dependent lists
//!
//! Events and child links are displayed in sort-key order (typically a date
//! serial). The merger in `stemma-session` relies on this total order and on
//! nothing else about the key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Totally ordered position of a dependent row within its list.
///
/// The raw value is whatever the surrounding application derives it from
/// (a date serial for events, a birth order for children). Equal keys are
/// legal; insertion among equals is stable with respect to prior order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SortKey(pub i64);

impl SortKey {
    /// Create a sort key from its raw ordering value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw ordering value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort-{}", self.0)
    }
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<SortKey> for i64 {
    fn from(key: SortKey) -> Self {
        key.0
    }
}
