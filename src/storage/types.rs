use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failure kinds surfaced by every [`FeedRepository`](super::FeedRepository)
/// backend.
///
/// Handlers match on the variant to pick a status code. `Service` keeps the
/// driver error as its source so the cause can be logged without being
/// returned to clients.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A feed with this URL already exists
    #[error("Feed already exists: {0}")]
    Duplicate(String),

    /// No feed with this URL exists
    #[error("Feed not found: {0}")]
    NotFound(String),

    /// Schema setup failed while opening the database
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Any other backend failure (connectivity, timeout, unexpected constraint)
    #[error("Storage service error: {0}")]
    Service(#[from] sqlx::Error),
}

impl StorageError {
    /// Classify a sqlx error raised while operating on the feed keyed by `url`.
    ///
    /// Unique-constraint violations become `Duplicate`, `RowNotFound` becomes
    /// `NotFound`, and everything else is a `Service` error.
    pub(crate) fn from_sqlx(err: sqlx::Error, url: &str) -> Self {
        match err {
            sqlx::Error::Database(ref db_err)
                if db_err.is_unique_violation()
                    || db_err.message().contains("UNIQUE constraint failed") =>
            {
                StorageError::Duplicate(url.to_owned())
            }
            sqlx::Error::RowNotFound => StorageError::NotFound(url.to_owned()),
            other => StorageError::Service(other),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A subscribed RSS source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: String,
    pub provider: String,
    pub category: String,
    pub enabled: bool,
}

impl Feed {
    pub fn new(
        url: impl Into<String>,
        provider: impl Into<String>,
        category: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            url: url.into(),
            provider: provider.into(),
            category: category.into(),
            enabled,
        }
    }
}

/// Filter for [`get_feeds`](super::FeedRepository::get_feeds).
///
/// An empty `provider` or `category` means "any value". `enabled` is always
/// applied; there is no wildcard for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub provider: String,
    pub category: String,
    pub enabled: bool,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            provider: String::new(),
            category: String::new(),
            enabled: true,
        }
    }
}

impl FeedQuery {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Whether `feed` passes every active filter dimension.
    pub fn matches(&self, feed: &Feed) -> bool {
        (self.provider.is_empty() || self.provider == feed.provider)
            && (self.category.is_empty() || self.category == feed.category)
            && self.enabled == feed.enabled
    }
}

/// Row type for the joined feed query
pub(crate) type FeedRow = (String, String, String, bool);
