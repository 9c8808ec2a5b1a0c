//! Session store backends.
//!
//! A [`SessionStore`] is a token-keyed load/save/delete boundary; the wire
//! format of the persisted record is the backend's own business. Two
//! implementations are provided: a SQLite-backed store for production and an
//! in-memory store for tests and development.
//!
//! Expired records are treated as absent everywhere: a token whose record has
//! passed its expiry must behave exactly like a token that never existed.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

use super::SessionRecord;
use crate::error::{AppError, AppResult};

/// Token-keyed persistent session backend.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record for a token. Expired or unknown tokens yield `None`.
    async fn load(&self, token: &str) -> AppResult<Option<SessionRecord>>;

    /// Save (insert or overwrite) the record for a token. Concurrent saves
    /// of the same token are last-write-wins.
    async fn save(&self, token: &str, record: &SessionRecord) -> AppResult<()>;

    /// Delete the record for a token. Deleting an unknown token is a no-op.
    async fn delete(&self, token: &str) -> AppResult<()>;
}

/// SQLite-backed session store (sessions table, JSON data blob).
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, token: &str) -> AppResult<Option<SessionRecord>> {
        let row = sqlx::query("SELECT data, expires FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: OffsetDateTime = row.try_get("expires")?;
        if expires_at <= OffsetDateTime::now_utc() {
            // Expired record: remove it and report absence.
            self.delete(token).await?;
            return Ok(None);
        }

        let blob: Vec<u8> = row.try_get("data")?;
        let data: HashMap<String, Value> = serde_json::from_slice(&blob)?;

        Ok(Some(SessionRecord { data, expires_at }))
    }

    async fn save(&self, token: &str, record: &SessionRecord) -> AppResult<()> {
        let blob = serde_json::to_vec(&record.data)?;

        sqlx::query(
            "INSERT INTO sessions (token, data, expires) VALUES (?, ?, ?)
             ON CONFLICT (token) DO UPDATE SET data = excluded.data, expires = excluded.expires",
        )
        .bind(token)
        .bind(blob)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// In-memory session store for tests and single-process development runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, token: &str) -> AppResult<Option<SessionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| AppError::SessionStore("memory store lock poisoned".to_string()))?;

        Ok(records
            .get(token)
            .filter(|record| !record.is_expired())
            .cloned())
    }

    async fn save(&self, token: &str, record: &SessionRecord) -> AppResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AppError::SessionStore("memory store lock poisoned".to_string()))?;

        records.insert(token.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, token: &str) -> AppResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| AppError::SessionStore("memory store lock poisoned".to_string()))?;

        records.remove(token);
        Ok(())
    }
}
