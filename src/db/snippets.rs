//! SQLite-backed snippet store.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use time::{Duration, OffsetDateTime};

use super::models::Snippet;
use super::SnippetStore;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SqliteSnippetStore {
    pool: SqlitePool,
}

impl SqliteSnippetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for SqliteSnippetStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> AppResult<i64> {
        let created = OffsetDateTime::now_utc();
        let expires = created + Duration::days(expires_days);

        let result = sqlx::query(
            "INSERT INTO snippets (title, content, created, expires) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(content)
        .bind(created)
        .bind(expires)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> AppResult<Snippet> {
        let snippet = sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE id = ? AND expires > ?",
        )
        .bind(id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            _ => AppError::Database(e),
        })?;

        Ok(snippet)
    }

    async fn latest(&self) -> AppResult<Vec<Snippet>> {
        let snippets = sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > ? ORDER BY id DESC LIMIT 10",
        )
        .bind(OffsetDateTime::now_utc())
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteSnippetStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteSnippetStore::new(pool)
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = test_store().await;

        let id = store.insert("an old silent pond", "an old silent pond...", 7)
            .await
            .unwrap();

        let snippet = store.get(id).await.unwrap();
        assert_eq!(snippet.title, "an old silent pond");
        assert_eq!(snippet.content, "an old silent pond...");
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = test_store().await;
        assert!(matches!(store.get(99).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn latest_skips_expired_and_orders_newest_first() {
        let store = test_store().await;

        let first = store.insert("first", "body", 7).await.unwrap();
        let second = store.insert("second", "body", 7).await.unwrap();

        // Force one snippet into the past.
        sqlx::query("UPDATE snippets SET expires = ? WHERE id = ?")
            .bind(OffsetDateTime::now_utc() - Duration::days(1))
            .bind(first)
            .execute(&store.pool)
            .await
            .unwrap();

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, second);

        // The expired snippet is also gone from direct lookup.
        assert!(matches!(store.get(first).await, Err(AppError::NotFound)));
    }
}
