//! Immutable views of a feed controller's state for the presentation layer.

use std::sync::Arc;

use bloodlink_core::{BloodRequest, Cursor, RecordFilter, WindowSummary};

use crate::feed::error::FeedError;

/// Controller state, as observed from outside.
///
/// State machine: `Idle -> LoadingInitial -> Ready <-> LoadingMore -> ... -> Exhausted`.
/// A filter change from any phase returns to `LoadingInitial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// No fetch has been started yet.
    Idle,
    /// The first page for the active filter is in flight.
    LoadingInitial,
    /// Not pending; more pages may exist.
    Ready,
    /// A follow-up page is in flight.
    LoadingMore,
    /// Not pending; the store has no further pages for the active filter.
    Exhausted,
}

impl FeedPhase {
    /// `true` while any fetch is in flight.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::LoadingInitial | Self::LoadingMore)
    }
}

/// Point-in-time copy of the loaded window and render flags.
///
/// Cheap to clone: the item list is shared, and a newer snapshot never
/// mutates an older one.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub(crate) items: Arc<Vec<BloodRequest>>,
    pub(crate) cursor: Option<Cursor>,
    pub(crate) exhausted: bool,
    pub(crate) phase: FeedPhase,
    pub(crate) filter: RecordFilter,
    pub(crate) client_filter: Option<RecordFilter>,
    pub(crate) last_error: Option<FeedError>,
    pub(crate) generation: u64,
}

impl FeedSnapshot {
    /// Every loaded record, in feed order, regardless of the active filter.
    #[must_use]
    pub fn items(&self) -> &[BloodRequest] {
        &self.items
    }

    /// Loaded records that pass the active filter.
    ///
    /// Lazy and restartable: clone the iterator to walk it again. Filters
    /// pushed down to the store are not re-applied here.
    pub fn visible(&self) -> impl Iterator<Item = &BloodRequest> + Clone + '_ {
        let filter = self.client_filter;
        self.items
            .iter()
            .filter(move |record| filter.is_none_or(|f| f.matches(record)))
    }

    /// Loaded records that pass `filter`, without touching the store.
    pub fn visible_with(
        &self,
        filter: RecordFilter,
    ) -> impl Iterator<Item = &BloodRequest> + Clone + '_ {
        self.items
            .iter()
            .filter(move |record| filter.matches(record))
    }

    /// Position after the last fetched page, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Whether the store reported no further pages.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether a further page can still be requested.
    ///
    /// `false` once exhausted, and also after an initial load that failed or
    /// was dropped: with no cursor there is nothing to continue from, and
    /// the caller should offer a reload instead.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.exhausted
            && (self.cursor.is_some()
                || matches!(self.phase, FeedPhase::Idle | FeedPhase::LoadingInitial))
    }

    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    /// Filter the window was loaded for.
    #[must_use]
    pub fn filter(&self) -> RecordFilter {
        self.filter
    }

    /// Error from the most recent failed fetch, cleared by the next success
    /// or reset.
    #[must_use]
    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }

    /// Reset counter; increments on every initial load.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Aggregate counts over all loaded records.
    #[must_use]
    pub fn summary(&self, now_millis: i64) -> WindowSummary {
        WindowSummary::from_records(self.items.iter(), now_millis)
    }
}
