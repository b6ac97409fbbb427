//! Home-page preview of the newest open requests.
//!
//! A single fetch, no cursor, no controller state. Records are filtered on
//! the client so the store never needs a status index.

use bloodlink_core::{normalize, BloodRequest};

use crate::feed::error::FeedError;
use crate::traits::{OrderedRecordStore, PageRequest};

/// Records fetched for the preview before filtering.
pub const PREVIEW_FETCH_LIMIT: usize = 10;

/// Open records shown in the preview.
pub const PREVIEW_TAKE: usize = 4;

/// Fetches the newest `fetch_limit` records of `collection` and returns at
/// most `take` of the open ones, newest first.
///
/// Malformed documents are skipped.
///
/// # Errors
///
/// Returns [`FeedError::StoreUnavailable`] if the fetch fails.
pub async fn urgent_preview(
    store: &dyn OrderedRecordStore,
    collection: &str,
    fetch_limit: usize,
    take: usize,
) -> Result<Vec<BloodRequest>, FeedError> {
    let request = PageRequest {
        collection: collection.to_string(),
        after: None,
        limit: fetch_limit,
        predicate: None,
    };
    let page = store
        .fetch_page(&request)
        .await
        .map_err(|err| FeedError::store(&err))?;

    let open: Vec<BloodRequest> = page
        .documents
        .iter()
        .filter_map(|doc| match normalize(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "preview skipping malformed record");
                None
            }
        })
        .filter(BloodRequest::is_open)
        .take(take)
        .collect();

    tracing::debug!(received = page.len(), shown = open.len(), "urgent preview loaded");
    Ok(open)
}

#[cfg(test)]
mod tests {
    use bloodlink_core::{RawDocument, RequestStatus};
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::storage::MemoryRecordStore;

    const COLLECTION: &str = "bloodRequests";

    fn doc(id: &str, created_at: i64, status: &str) -> RawDocument {
        let Value::Object(fields) = json!({"createdAt": created_at, "status": status}) else {
            unreachable!()
        };
        RawDocument::new(id, fields)
    }

    #[tokio::test]
    async fn shows_newest_open_requests_only() {
        let store = MemoryRecordStore::new();
        for t in 0..12 {
            let status = if t % 3 == 0 { "fulfilled" } else { "open" };
            store.insert_document(COLLECTION, doc(&format!("r{t:02}"), t, status));
        }

        let preview = urgent_preview(&store, COLLECTION, PREVIEW_FETCH_LIMIT, PREVIEW_TAKE)
            .await
            .unwrap();
        let ids: Vec<&str> = preview.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r11", "r10", "r08", "r07"]);
        assert!(preview.iter().all(|r| r.status == RequestStatus::Open));
    }

    #[tokio::test]
    async fn open_records_beyond_fetch_window_are_not_shown() {
        let store = MemoryRecordStore::new();
        store.insert_document(COLLECTION, doc("old-open", 1, "open"));
        for t in 10..20 {
            store.insert_document(COLLECTION, doc(&format!("f{t}"), t, "fulfilled"));
        }

        let preview = urgent_preview(&store, COLLECTION, PREVIEW_FETCH_LIMIT, PREVIEW_TAKE)
            .await
            .unwrap();
        assert!(preview.is_empty());
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped() {
        let store = MemoryRecordStore::new();
        store.insert_document(COLLECTION, doc("good", 5, "open"));
        store.insert_document(
            COLLECTION,
            RawDocument::new("bad", {
                let mut fields = Map::new();
                fields.insert("createdAt".into(), json!(4));
                fields.insert("status".into(), json!("archived"));
                fields
            }),
        );

        let preview = urgent_preview(&store, COLLECTION, 10, 4).await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].id.as_str(), "good");
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store = MemoryRecordStore::new();
        store.fail_next(1);
        let result = urgent_preview(&store, COLLECTION, 10, 4).await;
        assert!(matches!(result, Err(FeedError::StoreUnavailable { .. })));
    }
}
