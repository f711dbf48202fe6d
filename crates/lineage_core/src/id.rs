//! Identifiers for tracked resources and the logical clock that orders events.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Process-unique identifier of an async resource.
///
/// Ids are allocated monotonically by the registry and never reused.
/// [`AsyncId::ROOT`] is reserved for "no resource executing" and is the
/// trigger of every resource created at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncId(u64);

impl AsyncId {
    /// The root sentinel: the execution context outside of any resource.
    pub const ROOT: AsyncId = AsyncId(1);

    /// The first id handed out by a fresh allocator.
    pub const FIRST: AsyncId = AsyncId(2);

    /// Creates an id from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` for the root sentinel.
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }

    /// Returns the id immediately after this one, or `None` at `u64::MAX`.
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl fmt::Display for AsyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("async_root")
        } else {
            write!(f, "async_{}", self.0)
        }
    }
}

impl From<u64> for AsyncId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Logical timestamp assigned to every accepted lifecycle event.
///
/// Stamps are strictly increasing in arrival order, so comparing two stamps
/// tells which event the tracker accepted first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Stamp(u64);

impl Stamp {
    /// Creates a stamp from a raw tick.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Returns the raw tick.
    #[must_use]
    pub const fn tick(self) -> u64 {
        self.0
    }

    /// Returns the stamp immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_below_first() {
        assert!(AsyncId::ROOT < AsyncId::FIRST);
        assert!(AsyncId::ROOT.is_root());
        assert!(!AsyncId::FIRST.is_root());
    }

    #[test]
    fn display_names_root() {
        assert_eq!(AsyncId::ROOT.to_string(), "async_root");
        assert_eq!(AsyncId::new(7).to_string(), "async_7");
    }

    #[test]
    fn checked_next_stops_at_the_top() {
        assert_eq!(AsyncId::ROOT.checked_next(), Some(AsyncId::FIRST));
        assert_eq!(AsyncId::new(u64::MAX).checked_next(), None);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&AsyncId::new(42)).unwrap();
        assert_eq!(json, "42");
        let stamp: Stamp = serde_json::from_str("9").unwrap();
        assert_eq!(stamp.tick(), 9);
    }

    #[test]
    fn stamps_order_by_tick() {
        let a = Stamp::new(3);
        assert!(a < a.next());
        assert_eq!(a.next().tick(), 4);
    }
}
