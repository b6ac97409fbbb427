/// Errors surfaced by the feed controller.
///
/// Never thrown at the presentation layer: fetch failures are stored as the
/// controller's last error and returned in `FetchOutcome::Failed`. All
/// variants are recoverable by re-invoking the failed operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("record store unavailable: {message}")]
    StoreUnavailable { message: String },
    #[error("fetch timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("fetch was dropped before it completed")]
    Cancelled,
    #[error("no tokio runtime available to drive viewport-triggered loads")]
    NoRuntime,
}

impl FeedError {
    /// Wraps a store error, keeping the full context chain in the message.
    #[must_use]
    pub fn store(err: &anyhow::Error) -> Self {
        Self::StoreUnavailable {
            message: format!("{err:#}"),
        }
    }
}

/// Invalid feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("page size must be at least 1")]
    ZeroPageSize,
    #[error("collection name must not be empty")]
    EmptyCollection,
}

#[cfg(test)]
mod tests {
    use anyhow::Context as _;

    use super::*;

    #[test]
    fn store_error_keeps_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("connection refused"))
            .context("fetching bloodRequests")
            .unwrap_err();
        assert_eq!(
            FeedError::store(&err),
            FeedError::StoreUnavailable {
                message: "fetching bloodRequests: connection refused".to_string()
            }
        );
    }

    #[test]
    fn timeout_display() {
        let err = FeedError::Timeout { timeout_ms: 1500 };
        assert_eq!(err.to_string(), "fetch timed out after 1500ms");
    }
}
