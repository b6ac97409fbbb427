//! Paginated feed controller.
//!
//! Owns the loaded window of a newest-first collection and grows it one
//! fixed-size page at a time. Every reset bumps a generation counter; a
//! fetch applies its result only if its generation is still current, so a
//! superseded request can never write into the window. At most one fetch
//! per generation is in flight, guarded by the `pending` flag.
//!
//! Operations split into a synchronous part, run when the method is called
//! (reset, precondition checks, marking pending), and a returned future
//! that performs the store call and applies the result. Callers await the
//! future or hand it to `tokio::spawn`.

use std::future::Future;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use bloodlink_core::{normalize, BloodRequest, Cursor, RecordFilter, WindowSummary};
use parking_lot::Mutex;
use tracing::Instrument;

use crate::feed::config::{FeedConfig, FilterPolicy};
use crate::feed::error::{ConfigError, FeedError};
use crate::feed::signal::{NearEndCallback, SignalAttachment, Throttle, ViewportSignal};
use crate::feed::snapshot::{FeedPhase, FeedSnapshot};
use crate::traits::{OrderedRecordStore, Page, PageRequest};

/// Which operation issued a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    More,
}

/// Result of awaiting a controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was applied to the window.
    Loaded {
        /// Documents the store returned.
        received: usize,
        /// Records appended to the window.
        appended: usize,
        /// Documents skipped as malformed or out of order.
        rejected: usize,
        /// Whether this page ended the feed.
        exhausted: bool,
    },
    /// Preconditions did not hold; nothing was fetched or changed.
    Skipped,
    /// A newer initial load superseded this fetch; its result was discarded.
    Stale,
    /// The fetch failed; the window is unchanged and the operation may be retried.
    Failed(FeedError),
}

/// A fetch that has been admitted and must be completed.
struct FetchTicket {
    generation: u64,
    kind: FetchKind,
    request: PageRequest,
    guard: PendingGuard,
}

/// Releases the pending slot if its fetch is dropped before completing.
///
/// Armed when the fetch is admitted, disarmed once `complete` has run.
/// Dropping an armed guard (caller-side timeout, `select!`, task abort)
/// clears `pending` for its own generation and records
/// [`FeedError::Cancelled`], so the feed stays retryable.
struct PendingGuard {
    inner: Arc<Inner>,
    generation: u64,
    kind: FetchKind,
    armed: bool,
}

impl PendingGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        if state.generation != self.generation || state.pending != Some(self.kind) {
            return;
        }
        state.pending = None;
        state.last_error = Some(FeedError::Cancelled);
        tracing::debug!(
            generation = self.generation,
            kind = ?self.kind,
            "fetch dropped before completion"
        );
        self.inner.publish(&state);
    }
}

/// Mutable controller state. Only touched under the controller's lock.
#[derive(Debug)]
struct FeedState {
    items: Arc<Vec<BloodRequest>>,
    cursor: Option<Cursor>,
    exhausted: bool,
    pending: Option<FetchKind>,
    generation: u64,
    filter: RecordFilter,
    pushed_down: bool,
    started: bool,
    last_error: Option<FeedError>,
}

impl FeedState {
    fn new(filter: RecordFilter) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            cursor: None,
            exhausted: false,
            pending: None,
            generation: 0,
            filter,
            pushed_down: false,
            started: false,
            last_error: None,
        }
    }

    fn phase(&self) -> FeedPhase {
        match self.pending {
            Some(FetchKind::Initial) => FeedPhase::LoadingInitial,
            Some(FetchKind::More) => FeedPhase::LoadingMore,
            None if !self.started => FeedPhase::Idle,
            None if self.exhausted => FeedPhase::Exhausted,
            None => FeedPhase::Ready,
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: Arc::clone(&self.items),
            cursor: self.cursor.clone(),
            exhausted: self.exhausted,
            phase: self.phase(),
            filter: self.filter,
            client_filter: (!self.pushed_down).then_some(self.filter),
            last_error: self.last_error.clone(),
            generation: self.generation,
        }
    }

    fn store_predicate(&self) -> Option<RecordFilter> {
        self.pushed_down.then_some(self.filter)
    }
}

struct Inner {
    store: Arc<dyn OrderedRecordStore>,
    config: FeedConfig,
    state: Mutex<FeedState>,
    published: ArcSwap<FeedSnapshot>,
}

impl Inner {
    fn publish(&self, state: &FeedState) {
        self.published.store(Arc::new(state.snapshot()));
    }
}

/// Paginated, filterable view over an [`OrderedRecordStore`] collection.
///
/// Cloning yields another handle to the same feed. State is owned by the
/// controller and changed only by its own operations.
#[derive(Clone)]
pub struct FeedController {
    inner: Arc<Inner>,
}

impl FeedController {
    /// Creates an idle controller with the default filter (open requests).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn new(
        store: Arc<dyn OrderedRecordStore>,
        config: FeedConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_filter(store, config, RecordFilter::default())
    }

    /// Creates an idle controller with an explicit initial filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn with_filter(
        store: Arc<dyn OrderedRecordStore>,
        config: FeedConfig,
        filter: RecordFilter,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = FeedState::new(filter);
        let published = ArcSwap::from_pointee(state.snapshot());
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                config,
                state: Mutex::new(state),
                published,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    // --- Operations ---

    /// Discards the window and loads the first page for `filter`.
    ///
    /// The reset happens before this method returns; any fetch still in
    /// flight becomes stale. The returned future performs the fetch.
    pub fn load_initial(
        &self,
        filter: RecordFilter,
    ) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let ticket = self.begin_initial(filter);
        let this = self.clone();
        async move { this.execute(ticket).await }
    }

    /// Switches the active filter. Always a full reset, see [`load_initial`](Self::load_initial).
    pub fn set_filter(
        &self,
        filter: RecordFilter,
    ) -> impl Future<Output = FetchOutcome> + Send + 'static {
        self.load_initial(filter)
    }

    /// Reloads from the top with the current filter (retry after a failed
    /// initial load, pull-to-refresh).
    pub fn reload(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let filter = self.inner.state.lock().filter;
        self.load_initial(filter)
    }

    /// Loads the page after the current cursor.
    ///
    /// A no-op resolving to [`FetchOutcome::Skipped`] while a fetch is in
    /// flight, after the feed is exhausted, or before any page was loaded.
    /// Safe to call on every scroll event.
    pub fn load_more(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let ticket = self.begin_more();
        let this = self.clone();
        async move {
            match ticket {
                Some(ticket) => this.execute(ticket).await,
                None => FetchOutcome::Skipped,
            }
        }
    }

    // --- Presentation surface ---

    /// Latest published state. Lock-free.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.inner.published.load_full()
    }

    /// Loaded records passing the active filter, in feed order.
    #[must_use]
    pub fn visible_items(&self) -> Vec<BloodRequest> {
        self.snapshot().visible().cloned().collect()
    }

    /// Loaded records passing `filter`. Never fetches.
    #[must_use]
    pub fn visible_items_with(&self, filter: RecordFilter) -> Vec<BloodRequest> {
        self.snapshot().visible_with(filter).cloned().collect()
    }

    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        self.snapshot().phase()
    }

    #[must_use]
    pub fn filter(&self) -> RecordFilter {
        self.snapshot().filter()
    }

    #[must_use]
    pub fn is_loading_initial(&self) -> bool {
        self.phase() == FeedPhase::LoadingInitial
    }

    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.phase() == FeedPhase::LoadingMore
    }

    /// Whether `load_more` can still fetch a page. See [`FeedSnapshot::has_more`].
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.snapshot().has_more()
    }

    /// Error from the most recent failed fetch, if it has not been superseded.
    #[must_use]
    pub fn last_error(&self) -> Option<FeedError> {
        self.snapshot().last_error().cloned()
    }

    /// Aggregate counts over every loaded record.
    #[must_use]
    pub fn summary(&self, now_millis: i64) -> WindowSummary {
        self.snapshot().summary(now_millis)
    }

    /// Registers this feed on a viewport signal so that "near end" triggers
    /// `load_more`. Triggers are throttled by `trigger_throttle` and spawned
    /// on the runtime current at attach time.
    ///
    /// The registration holds only a weak reference to the controller and
    /// is removed when the returned attachment is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NoRuntime`] when called outside a tokio runtime.
    pub fn attach(&self, signal: Arc<dyn ViewportSignal>) -> Result<SignalAttachment, FeedError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| FeedError::NoRuntime)?;
        let throttle = Throttle::new(self.inner.config.trigger_throttle);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let callback: NearEndCallback = Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = FeedController { inner };
            // Triggers the pending guard would drop anyway must not spend
            // the throttle window.
            let snapshot = controller.snapshot();
            if snapshot.phase().is_pending() || !snapshot.has_more() {
                tracing::trace!(phase = ?snapshot.phase(), "near-end trigger ignored");
                return;
            }
            if !throttle.permit() {
                tracing::trace!("near-end trigger throttled");
                return;
            }
            handle.spawn(controller.load_more());
        });

        let id = signal.subscribe(callback);
        tracing::debug!(subscription = id.0, "feed attached to viewport signal");
        Ok(SignalAttachment { signal, id })
    }

    // --- Internals ---

    fn begin_initial(&self, filter: RecordFilter) -> FetchTicket {
        let pushed_down = !filter.is_all()
            && self.inner.config.filter_policy == FilterPolicy::PreferStore
            && self.inner.store.supports_predicate(&filter);

        let mut state = self.inner.state.lock();
        state.generation += 1;
        state.items = Arc::new(Vec::new());
        state.cursor = None;
        state.exhausted = false;
        state.pending = Some(FetchKind::Initial);
        state.started = true;
        state.filter = filter;
        state.pushed_down = pushed_down;
        state.last_error = None;

        let ticket = self.ticket(
            state.generation,
            FetchKind::Initial,
            self.page_request(None, state.store_predicate()),
        );
        self.publish(&state);
        ticket
    }

    fn begin_more(&self) -> Option<FetchTicket> {
        let mut state = self.inner.state.lock();
        if state.pending.is_some() || state.exhausted {
            tracing::trace!(phase = ?state.phase(), "load_more skipped");
            return None;
        }
        let cursor = state.cursor.clone()?;

        state.pending = Some(FetchKind::More);
        let ticket = self.ticket(
            state.generation,
            FetchKind::More,
            self.page_request(Some(cursor), state.store_predicate()),
        );
        self.publish(&state);
        Some(ticket)
    }

    fn ticket(&self, generation: u64, kind: FetchKind, request: PageRequest) -> FetchTicket {
        FetchTicket {
            generation,
            kind,
            request,
            guard: PendingGuard {
                inner: Arc::clone(&self.inner),
                generation,
                kind,
                armed: true,
            },
        }
    }

    fn page_request(&self, after: Option<Cursor>, predicate: Option<RecordFilter>) -> PageRequest {
        PageRequest {
            collection: self.inner.config.collection.clone(),
            after,
            limit: self.inner.config.page_size,
            predicate,
        }
    }

    async fn execute(self, mut ticket: FetchTicket) -> FetchOutcome {
        let span = tracing::info_span!(
            "feed_fetch",
            collection = %ticket.request.collection,
            kind = ?ticket.kind,
            generation = ticket.generation,
        );
        async move {
            let result = self.fetch(&ticket.request).await;
            let outcome = self.complete(&ticket, result);
            ticket.guard.disarm();
            outcome
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self, request: &PageRequest) -> Result<Page, FeedError> {
        let fut = self.inner.store.fetch_page(request);
        let result = match self.inner.config.fetch_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    return Err(FeedError::Timeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            },
            None => fut.await,
        };
        result.map_err(|err| FeedError::store(&err))
    }

    fn complete(&self, ticket: &FetchTicket, result: Result<Page, FeedError>) -> FetchOutcome {
        let mut state = self.inner.state.lock();
        if state.generation != ticket.generation {
            tracing::debug!(
                current = state.generation,
                "discarding completion from superseded request"
            );
            return FetchOutcome::Stale;
        }

        state.pending = None;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(error = %err, "feed fetch failed");
                state.last_error = Some(err.clone());
                self.publish(&state);
                return FetchOutcome::Failed(err);
            }
        };

        let received = page.len();
        let (appended, rejected) = append_page(Arc::make_mut(&mut state.items), page.documents);
        if page.end_cursor.is_some() {
            state.cursor = page.end_cursor;
        }
        state.exhausted = received < self.inner.config.page_size;
        state.last_error = None;

        tracing::info!(
            received,
            appended,
            rejected,
            total = state.items.len(),
            exhausted = state.exhausted,
            "feed page applied"
        );
        self.publish(&state);

        FetchOutcome::Loaded {
            received,
            appended,
            rejected,
            exhausted: state.exhausted,
        }
    }

    fn publish(&self, state: &FeedState) {
        self.inner.publish(state);
    }
}

/// Normalizes `documents` and appends them to `items`.
///
/// Each document is judged on its own: malformed ones and ones that would
/// not sort strictly after the current tail are skipped, the rest applied.
/// Returns `(appended, rejected)`.
fn append_page(
    items: &mut Vec<BloodRequest>,
    documents: Vec<bloodlink_core::RawDocument>,
) -> (usize, usize) {
    let mut appended = 0;
    let mut rejected = 0;
    for doc in documents {
        let record = match normalize(&doc) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping malformed record");
                rejected += 1;
                continue;
            }
        };
        if let Some(tail) = items.last() {
            if record.sort_key() <= tail.sort_key() {
                tracing::warn!(
                    id = %record.id,
                    tail = %tail.id,
                    "skipping record that does not follow the loaded window"
                );
                rejected += 1;
                continue;
            }
        }
        items.push(record);
        appended += 1;
    }
    (appended, rejected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
