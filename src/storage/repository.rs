use async_trait::async_trait;

use super::types::{Feed, FeedQuery, StorageError};

/// Operations every feed storage backend provides.
///
/// Callers are expected to have validated URLs with
/// [`is_valid_absolute_url`](crate::util::is_valid_absolute_url) and to pass
/// non-empty provider/category values. Backends enforce URL uniqueness and
/// existence atomically; an implementation must never report a racing insert
/// as anything other than [`StorageError::Duplicate`].
#[async_trait]
pub trait FeedRepository: Send + Sync + 'static {
    /// Returns every feed matching `query`. No match is an empty vec.
    async fn get_feeds(&self, query: &FeedQuery) -> Result<Vec<Feed>, StorageError>;

    /// Inserts `feed`. Returns `Err(Duplicate)` if the URL is already stored.
    async fn add_feed(&self, feed: &Feed) -> Result<(), StorageError>;

    /// Sets the enabled flag of the feed at `url`. Returns `Err(NotFound)` if
    /// no such feed exists.
    async fn set_feed_state(&self, url: &str, enabled: bool) -> Result<(), StorageError>;

    /// Removes the feed at `url`. Returns `Err(NotFound)` if no such feed exists.
    async fn delete_feed(&self, url: &str) -> Result<(), StorageError>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}
