use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::repository::FeedRepository;
use super::types::{Feed, FeedQuery, StorageError};

#[derive(Debug, Clone)]
struct FeedRecord {
    provider: String,
    category: String,
    enabled: bool,
}

/// Process-local feed store.
///
/// Feeds are keyed by URL in a `BTreeMap`, so listings come back in URL
/// order. Mutations hold the write lock across their existence check and
/// write; nothing outside this type can reach the map.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    feeds: RwLock<BTreeMap<String, FeedRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored feeds, regardless of state.
    pub async fn len(&self) -> usize {
        self.feeds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feeds.read().await.is_empty()
    }
}

#[async_trait]
impl FeedRepository for InMemoryRepository {
    async fn get_feeds(&self, query: &FeedQuery) -> Result<Vec<Feed>, StorageError> {
        let feeds = self.feeds.read().await;
        Ok(feeds
            .iter()
            .map(|(url, record)| Feed {
                url: url.clone(),
                provider: record.provider.clone(),
                category: record.category.clone(),
                enabled: record.enabled,
            })
            .filter(|feed| query.matches(feed))
            .collect())
    }

    async fn add_feed(&self, feed: &Feed) -> Result<(), StorageError> {
        let mut feeds = self.feeds.write().await;
        match feeds.entry(feed.url.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate(feed.url.clone())),
            Entry::Vacant(slot) => {
                slot.insert(FeedRecord {
                    provider: feed.provider.clone(),
                    category: feed.category.clone(),
                    enabled: feed.enabled,
                });
                tracing::debug!(url = %feed.url, "Feed inserted");
                Ok(())
            }
        }
    }

    async fn set_feed_state(&self, url: &str, enabled: bool) -> Result<(), StorageError> {
        let mut feeds = self.feeds.write().await;
        match feeds.get_mut(url) {
            Some(record) => {
                record.enabled = enabled;
                Ok(())
            }
            None => Err(StorageError::NotFound(url.to_owned())),
        }
    }

    async fn delete_feed(&self, url: &str) -> Result<(), StorageError> {
        let mut feeds = self.feeds.write().await;
        feeds
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(url.to_owned()))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
