//! # Data Stores
//!
//! Trait boundaries for the record and credential stores, plus their SQLite
//! implementations. Handlers depend only on the traits, so tests can swap in
//! the mocks from [`mocks`].
//!
//! ## Submodules
//! - `models`: row types (`Snippet`)
//! - `snippets`: snippet record store
//! - `users`: credential store (argon2-hashed passwords)
//! - `mocks`: canned implementations with call counters (tests only)

pub mod models;
pub mod snippets;
pub mod users;

#[cfg(test)]
pub mod mocks;

use async_trait::async_trait;

use crate::error::AppResult;
use models::Snippet;

/// Snippet record store.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Insert a snippet expiring `expires_days` from now; returns its id.
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> AppResult<i64>;

    /// Fetch one unexpired snippet. Missing or expired → `AppError::NotFound`.
    async fn get(&self, id: i64) -> AppResult<Snippet>;

    /// The ten most recently created unexpired snippets, newest first.
    async fn latest(&self) -> AppResult<Vec<Snippet>>;
}

/// User credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a new user. Duplicate email → `AppError::DuplicateEmail`.
    async fn insert(&self, name: &str, email: &str, password: &str) -> AppResult<()>;

    /// Verify credentials; returns the user id on success, otherwise
    /// `AppError::InvalidCredentials`.
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<i64>;

    /// Whether a user with this id still exists.
    async fn exists(&self, id: i64) -> AppResult<bool>;
}
