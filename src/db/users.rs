//! SQLite-backed credential store.
//!
//! Passwords are hashed with argon2 before they touch the database; the
//! plaintext never leaves the store methods.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use time::OffsetDateTime;

use super::UserStore;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| AppError::Internal(format!("stored password hash is malformed: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> AppResult<()> {
        let hashed = hash_password(password)?;

        sqlx::query(
            "INSERT INTO users (name, email, hashed_password, created) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(hashed)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEmail
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<i64> {
        let row = sqlx::query("SELECT id, hashed_password FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => AppError::InvalidCredentials,
                _ => AppError::Database(e),
            })?;

        let id: i64 = row.try_get("id")?;
        let hashed: String = row.try_get("hashed_password")?;

        if verify_password(password, &hashed)? {
            Ok(id)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("present")? != 0)
    }
}
