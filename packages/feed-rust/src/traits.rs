use async_trait::async_trait;
use bloodlink_core::{Cursor, RawDocument, RecordFilter};

/// One page request against an ordered collection.
///
/// Ordering is fixed: `createdAt` descending, then document id ascending.
/// Stores must honour it exactly so that consecutive pages are contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Collection to read from (e.g. `"bloodRequests"`).
    pub collection: String,
    /// Start strictly after this position. `None` starts at the newest record.
    pub after: Option<Cursor>,
    /// Maximum number of documents to return.
    pub limit: usize,
    /// Store-side predicate, only set when the store reported support for it.
    pub predicate: Option<RecordFilter>,
}

/// A contiguous slice of the ordered collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Documents in feed order, at most `limit` of them.
    pub documents: Vec<RawDocument>,
    /// Position of the last document in `documents`; `None` when empty.
    pub end_cursor: Option<Cursor>,
}

impl Page {
    /// Number of documents the store returned, malformed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store returned nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Datastore able to serve an ordered collection page by page.
/// Implementations: in-memory (tests, demo), hosted document databases.
#[async_trait]
pub trait OrderedRecordStore: Send + Sync {
    /// Fetch the next page strictly after `request.after`.
    ///
    /// Read-only. Errors are treated as transient by callers.
    async fn fetch_page(&self, request: &PageRequest) -> anyhow::Result<Page>;

    /// Whether `filter` can be evaluated by the store itself.
    ///
    /// Returns `false` by default, meaning predicates are never pushed down.
    fn supports_predicate(&self, _filter: &RecordFilter) -> bool {
        false
    }
}
