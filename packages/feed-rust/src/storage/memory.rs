//! In-memory [`OrderedRecordStore`] backed by [`DashMap`].
//!
//! Each collection is a `BTreeMap` keyed in feed order, so a page is a range
//! scan starting strictly after the cursor. Suitable for tests, demos, and
//! any deployment where the collection fits in memory.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use bloodlink_core::{
    normalize, BloodRequest, ClockSource, Cursor, RawDocument, RecordFilter, RecordId,
    RequestStatus, SortKey, SystemClock,
};
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::traits::{OrderedRecordStore, Page, PageRequest};

/// Prefix marking cursors that point at documents without an ordering field.
const UNORDERED_CURSOR_PREFIX: char = '~';

/// Position of a document inside a collection.
///
/// Documents lacking a parseable `createdAt` cannot be placed by time; they
/// sort after every ordered document, by id. Keeping them lets callers see
/// how malformed data surfaces instead of silently hiding it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StoreKey {
    Ordered(SortKey),
    Unordered(String),
}

impl StoreKey {
    fn of(doc: &RawDocument) -> Self {
        match doc.created_at_millis() {
            Some(millis) => Self::Ordered(SortKey::new(millis, RecordId::new(doc.id.clone()))),
            None => Self::Unordered(doc.id.clone()),
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Ordered(key) => key.id.as_str(),
            Self::Unordered(id) => id,
        }
    }

    fn to_cursor(&self) -> Cursor {
        match self {
            Self::Ordered(key) => key.to_cursor(),
            Self::Unordered(id) => Cursor::new(format!("{UNORDERED_CURSOR_PREFIX}{id}")),
        }
    }

    fn from_cursor(cursor: &Cursor) -> anyhow::Result<Self> {
        if let Some(id) = cursor.as_str().strip_prefix(UNORDERED_CURSOR_PREFIX) {
            return Ok(Self::Unordered(id.to_string()));
        }
        let key = SortKey::from_cursor(cursor)
            .with_context(|| format!("invalid cursor {cursor}"))?;
        Ok(Self::Ordered(key))
    }
}

type Collection = BTreeMap<StoreKey, RawDocument>;

/// In-memory ordered record store.
///
/// Concurrent readers and writers are safe; `DashMap` shards per collection.
/// Supports status predicate push-down and fault injection for tests.
pub struct MemoryRecordStore {
    collections: DashMap<String, Collection>,
    clock: Arc<dyn ClockSource>,
    failures_remaining: AtomicU32,
    fetch_count: AtomicU64,
}

impl MemoryRecordStore {
    /// Creates an empty store stamping new documents with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamping new documents with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            collections: DashMap::new(),
            clock,
            failures_remaining: AtomicU32::new(0),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Adds a new document, assigning a fresh id.
    ///
    /// `createdAt` is stamped from the clock unless `fields` already has one.
    pub fn insert(&self, collection: &str, mut fields: Map<String, Value>) -> RecordId {
        let id = uuid::Uuid::new_v4().to_string();
        if !fields.contains_key("createdAt") {
            fields.insert("createdAt".into(), Value::from(self.clock.now()));
        }
        self.insert_document(collection, RawDocument::new(id.clone(), fields));
        RecordId::new(id)
    }

    /// Stores a canonical request under its own id.
    pub fn insert_request(&self, collection: &str, request: &BloodRequest) {
        self.insert_document(collection, request.to_raw());
    }

    /// Stores a document verbatim, replacing any document with the same id.
    pub fn insert_document(&self, collection: &str, doc: RawDocument) {
        let mut entries = self.collections.entry(collection.to_string()).or_default();
        entries.retain(|key, _| key.id() != doc.id);
        entries.insert(StoreKey::of(&doc), doc);
    }

    /// Updates the status of a document in place. Ordering is unaffected.
    ///
    /// Returns `false` if the document does not exist.
    pub fn set_status(&self, collection: &str, id: &str, status: RequestStatus) -> bool {
        let Some(mut entries) = self.collections.get_mut(collection) else {
            return false;
        };
        match entries.iter_mut().find(|(key, _)| key.id() == id) {
            Some((_, doc)) => {
                doc.fields
                    .insert("status".into(), Value::from(status.as_str()));
                true
            }
            None => false,
        }
    }

    /// Removes a document, returning it if it existed.
    pub fn remove(&self, collection: &str, id: &str) -> Option<RawDocument> {
        let mut entries = self.collections.get_mut(collection)?;
        let key = entries.keys().find(|key| key.id() == id)?.clone();
        entries.remove(&key)
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    /// Whether `collection` holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.clock.now()
    }

    /// Makes the next `count` fetches fail as if the store were unreachable.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Total number of `fetch_page` calls served or failed so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store-side predicate check. Documents that do not normalize never match.
fn matches_predicate(doc: &RawDocument, predicate: Option<&RecordFilter>) -> bool {
    match predicate {
        None | Some(RecordFilter::All) => true,
        Some(filter) => normalize(doc).is_ok_and(|record| filter.matches(&record)),
    }
}

#[async_trait]
impl OrderedRecordStore for MemoryRecordStore {
    async fn fetch_page(&self, request: &PageRequest) -> anyhow::Result<Page> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            anyhow::bail!("record store unavailable");
        }

        let start = match &request.after {
            Some(cursor) => Bound::Excluded(StoreKey::from_cursor(cursor)?),
            None => Bound::Unbounded,
        };

        let Some(entries) = self.collections.get(&request.collection) else {
            return Ok(Page::default());
        };

        let selected: Vec<(&StoreKey, &RawDocument)> = entries
            .range((start, Bound::Unbounded))
            .filter(|(_, doc)| matches_predicate(doc, request.predicate.as_ref()))
            .take(request.limit)
            .collect();

        let end_cursor = selected.last().map(|(key, _)| key.to_cursor());
        let documents = selected.into_iter().map(|(_, doc)| doc.clone()).collect();

        tracing::debug!(
            collection = %request.collection,
            limit = request.limit,
            "served page from memory store"
        );

        Ok(Page {
            documents,
            end_cursor,
        })
    }

    fn supports_predicate(&self, _filter: &RecordFilter) -> bool {
        true
    }
}
