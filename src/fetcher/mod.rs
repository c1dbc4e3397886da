//! Page fetching from the remote history API.
//!
//! The harvest loop only depends on the [`PageFetcher`] trait; transport,
//! authentication, and request shaping live in the concrete client.

use async_trait::async_trait;
use serde::Deserialize;

pub mod dify;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error (non-success status)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network error (timeout, connection failure)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Summary of one fetched page of history.
///
/// All three fields simultaneously absent is the sentinel for a remote
/// internal error: the workflow replied 200 but produced no outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchResult {
    /// Number of messages in the page.
    #[serde(default)]
    pub message_size: Option<u64>,
    /// Timestamp of the oldest message in the page (`YYYY-MM-DD HH:MM:SS`).
    #[serde(default)]
    pub oldest_dt: Option<String>,
    /// Continuation token for the next (older) page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl BatchResult {
    /// Whether this result is the all-absent remote-internal-error sentinel.
    pub fn is_internal_error(&self) -> bool {
        self.message_size.is_none() && self.oldest_dt.is_none() && self.next_cursor.is_none()
    }

    /// The continuation cursor, with empty strings treated as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// One page fetch against the remote history API.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page identified by `cursor`.
    ///
    /// `None` asks for the most recent page. Page size, time bounds, and the
    /// API user are fixed at client construction; the loop only varies the
    /// cursor.
    async fn fetch_page(&self, cursor: Option<&str>) -> FetcherResult<BatchResult>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch_page(&self, cursor: Option<&str>) -> FetcherResult<BatchResult> {
        (**self).fetch_page(cursor).await
    }
}
