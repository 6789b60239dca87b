use async_trait::async_trait;
use sqlx::QueryBuilder;

use super::repository::FeedRepository;
use super::schema::Database;
use super::types::{Feed, FeedQuery, FeedRow, StorageError};

impl Database {
    // ========================================================================
    // Lookup Tables
    // ========================================================================

    /// First-or-create a provider row, returning its id.
    ///
    /// The no-op `DO UPDATE` makes `RETURNING` yield the existing id on
    /// conflict, so this is a single write statement.
    async fn upsert_provider(
        conn: &mut sqlx::SqliteConnection,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO providers (name) VALUES (?)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
        )
        .bind(name)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// First-or-create a category row, returning its id.
    async fn upsert_category(
        conn: &mut sqlx::SqliteConnection,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO categories (name) VALUES (?)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
        )
        .bind(name)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    async fn feed_exists(&self, url: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM feeds WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// All provider names ever registered, sorted.
    pub async fn provider_names(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM providers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// All category names ever registered, sorted.
    pub async fn category_names(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[async_trait]
impl FeedRepository for Database {
    /// Feeds are returned in URL order.
    async fn get_feeds(&self, query: &FeedQuery) -> Result<Vec<Feed>, StorageError> {
        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            r#"
            SELECT f.url, p.name, c.name, f.enabled
            FROM feeds f
            JOIN providers p ON p.id = f.provider_id
            JOIN categories c ON c.id = f.category_id
            WHERE f.enabled = "#,
        );
        builder.push_bind(query.enabled);

        if !query.provider.is_empty() {
            builder.push(" AND p.name = ");
            builder.push_bind(&query.provider);
        }
        if !query.category.is_empty() {
            builder.push(" AND c.name = ");
            builder.push_bind(&query.category);
        }
        builder.push(" ORDER BY f.url");

        let rows: Vec<FeedRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Feed listing query failed");
                StorageError::Service(e)
            })?;

        Ok(rows
            .into_iter()
            .map(|(url, provider, category, enabled)| Feed {
                url,
                provider,
                category,
                enabled,
            })
            .collect())
    }

    async fn add_feed(&self, feed: &Feed) -> Result<(), StorageError> {
        // Fast path only; the primary key decides races below.
        if self
            .feed_exists(&feed.url)
            .await
            .map_err(|e| StorageError::from_sqlx(e, &feed.url))?
        {
            return Err(StorageError::Duplicate(feed.url.clone()));
        }

        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            let provider_id = Self::upsert_provider(&mut *tx, &feed.provider).await?;
            let category_id = Self::upsert_category(&mut *tx, &feed.category).await?;

            sqlx::query(
                "INSERT INTO feeds (url, provider_id, category_id, enabled) VALUES (?, ?, ?, ?)",
            )
            .bind(&feed.url)
            .bind(provider_id)
            .bind(category_id)
            .bind(feed.enabled)
            .execute(&mut *tx)
            .await?;

            tx.commit().await
        }
        .await;

        result.map_err(|e| StorageError::from_sqlx(e, &feed.url))?;
        tracing::debug!(url = %feed.url, provider = %feed.provider, category = %feed.category, "Feed inserted");
        Ok(())
    }

    async fn set_feed_state(&self, url: &str, enabled: bool) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE feeds SET enabled = ? WHERE url = ?")
            .bind(enabled)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::from_sqlx(e, url))?;

        // SQLite counts matched rows, so re-applying the same value still reports 1
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(url.to_owned()));
        }
        Ok(())
    }

    async fn delete_feed(&self, url: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM feeds WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::from_sqlx(e, url))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(url.to_owned()));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
