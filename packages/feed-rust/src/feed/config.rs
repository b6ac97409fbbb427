use std::time::Duration;

use crate::feed::error::ConfigError;

/// Collection holding blood requests.
pub const DEFAULT_COLLECTION: &str = "bloodRequests";

/// Number of records fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Where the active filter is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPolicy {
    /// Fetch unfiltered pages and filter the loaded window for display.
    #[default]
    ClientSide,
    /// Push the filter down to the store when it supports it; otherwise
    /// fall back to client-side filtering.
    PreferStore,
}

/// Configuration for a paginated feed controller.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Collection to page through.
    pub collection: String,
    /// Records requested per fetch. A shorter page marks the feed exhausted.
    pub page_size: usize,
    /// Where the active filter is evaluated.
    pub filter_policy: FilterPolicy,
    /// Per-fetch timeout. Expiry is handled like any other fetch failure.
    pub fetch_timeout: Option<Duration>,
    /// Minimum spacing between viewport-triggered loads. Zero disables throttling.
    pub trigger_throttle: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            filter_policy: FilterPolicy::ClientSide,
            fetch_timeout: None,
            trigger_throttle: Duration::from_millis(250),
        }
    }
}

impl FeedConfig {
    /// Checks invariants the controller relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the page size is zero or the collection
    /// name is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_config_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.collection, "bloodRequests");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.filter_policy, FilterPolicy::ClientSide);
        assert!(config.fetch_timeout.is_none());
        assert_eq!(config.trigger_throttle, Duration::from_millis(250));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = FeedConfig {
            page_size: 0,
            ..FeedConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPageSize));
    }

    #[test]
    fn blank_collection_is_rejected() {
        let config = FeedConfig {
            collection: "  ".to_string(),
            ..FeedConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyCollection));
    }
}
