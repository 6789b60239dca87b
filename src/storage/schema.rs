use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed feed store.
///
/// Feeds reference providers and categories by id; both lookup tables are
/// filled on first use and never pruned.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Path that selects a private in-memory database.
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Open (creating if missing) the database at `path` and run migrations.
    ///
    /// `busy_timeout` bounds how long a statement waits on a locked database
    /// before failing; it is also used as the pool acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Service` if the database cannot be opened and
    /// `StorageError::Migration` if schema setup fails.
    pub async fn open(
        path: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        let options = SqliteConnectOptions::from_str(&url)?
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        // Every connection to ":memory:" is its own database, so the pool is
        // pinned to a single connection that is never recycled.
        let pool_options = if path == Self::IN_MEMORY {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(busy_timeout)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        tracing::info!(path = %path, "Database opened");
        Ok(db)
    }

    /// Open a fresh in-memory database with default timeouts.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(Self::IN_MEMORY, 1, Duration::from_secs(5)).await
    }

    /// Close every pooled connection. Pending operations fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS providers (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                url TEXT PRIMARY KEY NOT NULL,
                provider_id INTEGER NOT NULL REFERENCES providers(id),
                category_id INTEGER NOT NULL REFERENCES categories(id),
                enabled INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Covers the enabled filter, which every listing applies
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_enabled ON feeds(enabled, url)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_provider ON feeds(provider_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_category ON feeds(category_id)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
