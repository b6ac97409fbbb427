//! Feed ordering key, opaque cursors, and clock injection.
//!
//! The request feed is ordered newest first. Creation time alone is not a
//! total order (two requests can be stamped in the same millisecond), so the
//! store-assigned id breaks ties ascending. [`SortKey`] encodes exactly that
//! order: a feed is a strictly increasing sequence of keys.
//!
//! # Cursor format
//!
//! The controller treats [`Cursor`] as opaque and only hands back what a
//! store gave it. Stores that position by [`SortKey`] use the textual format
//! `"millis:id"`. Ids may contain `:`, so parsing splits on the first one.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Composite ordering key of a record: `(created_at desc, id asc)`.
///
/// `a < b` means `a` comes before `b` in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_millis: i64,
    /// Store-assigned identifier.
    pub id: RecordId,
}

impl SortKey {
    /// Builds a key from its parts.
    #[must_use]
    pub fn new(created_at_millis: i64, id: RecordId) -> Self {
        Self {
            created_at_millis,
            id,
        }
    }

    /// Encodes this key as a cursor token.
    #[must_use]
    pub fn to_cursor(&self) -> Cursor {
        Cursor::new(format!("{}:{}", self.created_at_millis, self.id))
    }

    /// Decodes a cursor produced by [`SortKey::to_cursor`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] if the token has no `:` separator or the
    /// timestamp part is not an integer.
    pub fn from_cursor(cursor: &Cursor) -> Result<Self, CursorError> {
        let token = cursor.as_str();
        let (millis, id) = token
            .split_once(':')
            .ok_or_else(|| CursorError::MissingSeparator(token.to_string()))?;
        let created_at_millis = millis
            .parse::<i64>()
            .map_err(|_| CursorError::InvalidTimestamp(millis.to_string()))?;
        Ok(Self::new(created_at_millis, RecordId::new(id)))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .created_at_millis
            .cmp(&self.created_at_millis)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Opaque position in an ordered collection, as returned by a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a store-provided token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure to decode a `"millis:id"` cursor token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor token has no ':' separator: {0:?}")]
    MissingSeparator(String),
    #[error("cursor timestamp is not an integer: {0:?}")]
    InvalidTimestamp(String),
}

/// Abstraction over the wall clock for dependency injection.
///
/// Stores use it to stamp `createdAt`; summaries use it for "recent" counts.
pub trait ClockSource: Send + Sync {
    /// Current time as milliseconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Clock source backed by `std::time::SystemTime`.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    // Millisecond timestamps fit in i64 until the year 292 million.
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// Manually driven clock for tests and deterministic seeding.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `millis`.
    #[must_use]
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Moves the clock forward by `delta` milliseconds.
    pub fn advance(&self, delta: i64) {
        self.millis.fetch_add(delta, AtomicOrdering::SeqCst);
    }

    /// Sets the clock to an absolute value.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, AtomicOrdering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> i64 {
        self.millis.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn key(millis: i64, id: &str) -> SortKey {
        SortKey::new(millis, RecordId::from(id))
    }

    #[test]
    fn newer_records_sort_first() {
        assert!(key(200, "z") < key(100, "a"));
    }

    #[test]
    fn ties_break_by_id_ascending() {
        assert!(key(100, "a") < key(100, "b"));
        assert_eq!(key(100, "a").cmp(&key(100, "a")), Ordering::Equal);
    }

    #[test]
    fn cursor_round_trip_keeps_colons_in_id() {
        let original = key(1_700_000_000_000, "req:42:x");
        let cursor = original.to_cursor();
        assert_eq!(cursor.as_str(), "1700000000000:req:42:x");
        assert_eq!(SortKey::from_cursor(&cursor), Ok(original));
    }

    #[test]
    fn cursor_with_negative_timestamp() {
        let original = key(-5, "old");
        assert_eq!(SortKey::from_cursor(&original.to_cursor()), Ok(original));
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        assert_eq!(
            SortKey::from_cursor(&Cursor::new("no-separator")),
            Err(CursorError::MissingSeparator("no-separator".to_string()))
        );
        assert_eq!(
            SortKey::from_cursor(&Cursor::new("soon:abc")),
            Err(CursorError::InvalidTimestamp("soon".to_string()))
        );
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now(), 1_500);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn system_clock_returns_positive() {
        assert!(SystemClock.now() > 0);
    }

    proptest! {
        #[test]
        fn order_is_consistent_with_components(
            a_millis in -1_000i64..1_000,
            b_millis in -1_000i64..1_000,
            a_id in "[a-z]{1,4}",
            b_id in "[a-z]{1,4}",
        ) {
            let a = SortKey::new(a_millis, RecordId::new(a_id.clone()));
            let b = SortKey::new(b_millis, RecordId::new(b_id.clone()));
            let expected = b_millis.cmp(&a_millis).then_with(|| a_id.cmp(&b_id));
            prop_assert_eq!(a.cmp(&b), expected);
            prop_assert_eq!(b.cmp(&a), expected.reverse());
        }
    }
}
