//! Type-safe identifiers for dispensers and usage records.
//!
//! Both are newtypes around the `BIGSERIAL` integers assigned by the
//! store, so a dispenser id can never be passed where a record id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a dispenser.
///
/// Assigned once by the store at registration and immutable thereafter.
/// Used as the ordered key in [`super::DispenserRegistry`], so iteration
/// order equals creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispenserId(i64);

impl DispenserId {
    /// Wraps a raw store id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DispenserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DispenserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a usage record ("transaction" on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageRecordId(i64);

impl UsageRecordId {
    /// Wraps a raw store id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
