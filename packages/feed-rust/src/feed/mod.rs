//! Paginated blood request feed: controller, configuration, presentation
//! snapshots, and the viewport signal seam.

pub mod config;
pub mod controller;
pub mod error;
pub mod preview;
pub mod signal;
pub mod snapshot;

pub use config::{FeedConfig, FilterPolicy, DEFAULT_COLLECTION, DEFAULT_PAGE_SIZE};
pub use controller::{FeedController, FetchKind, FetchOutcome};
pub use error::{ConfigError, FeedError};
pub use preview::{urgent_preview, PREVIEW_FETCH_LIMIT, PREVIEW_TAKE};
pub use signal::{ManualSignal, NearEndCallback, SignalAttachment, SubscriptionId, ViewportSignal};
pub use snapshot::{FeedPhase, FeedSnapshot};
