//! Canned store implementations for handler and middleware tests.
//!
//! The mocks record how often their mutating methods were invoked so tests
//! can assert that guards short-circuit before any business logic runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use time::macros::datetime;

use super::models::Snippet;
use super::{SnippetStore, UserStore};
use crate::error::{AppError, AppResult};

pub fn mock_snippet() -> Snippet {
    Snippet {
        id: 1,
        title: "an old silent pond".to_string(),
        content: "an old silent pond...".to_string(),
        created: datetime!(2024-01-02 10:15 UTC),
        expires: datetime!(2030-01-02 10:15 UTC),
    }
}

/// Snippet store that serves one canned record and counts inserts.
#[derive(Default)]
pub struct MockSnippetStore {
    pub insert_calls: AtomicUsize,
    pub last_insert: Mutex<Option<(String, String, i64)>>,
}

#[async_trait]
impl SnippetStore for MockSnippetStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> AppResult<i64> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_insert.lock().unwrap() =
            Some((title.to_string(), content.to_string(), expires_days));
        Ok(2)
    }

    async fn get(&self, id: i64) -> AppResult<Snippet> {
        match id {
            1 => Ok(mock_snippet()),
            _ => Err(AppError::NotFound),
        }
    }

    async fn latest(&self) -> AppResult<Vec<Snippet>> {
        Ok(vec![mock_snippet()])
    }
}

/// Credential store with one known user: alice@example.com / pa$$word123.
#[derive(Default)]
pub struct MockUserStore {
    /// When set, `exists` reports false for every id (simulates a deleted
    /// user behind a live session).
    pub deny_exists: bool,
    pub insert_calls: AtomicUsize,
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn insert(&self, _name: &str, email: &str, _password: &str) -> AppResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if email == "dupe@example.com" {
            return Err(AppError::DuplicateEmail);
        }
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<i64> {
        if email == "alice@example.com" && password == "pa$$word123" {
            Ok(1)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        Ok(!self.deny_exists && id == 1)
    }
}
