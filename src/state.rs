//! # Application State
//!
//! Shared state handed to every request handler. The composition root in
//! `main` builds this once — including the template cache, which must exist
//! before serving begins — and axum clones it per request (cheap: every field
//! is an `Arc` or a small value).
//!
//! Handlers and middleware depend on the store *traits*, so tests swap the
//! SQLite implementations for mocks without touching the pipeline.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::snippets::SqliteSnippetStore;
use crate::db::users::SqliteUserStore;
use crate::db::{SnippetStore, UserStore};
use crate::error::AppResult;
use crate::session::store::{SessionStore, SqliteSessionStore};
use crate::templates::TemplateCache;

#[derive(Clone)]
pub struct AppState {
    /// Snippet record store.
    pub snippets: Arc<dyn SnippetStore>,

    /// User credential store.
    pub users: Arc<dyn UserStore>,

    /// Token-keyed session backend.
    pub sessions: Arc<dyn SessionStore>,

    /// Pre-built, read-only template cache.
    pub templates: Arc<TemplateCache>,

    /// Idle lifetime applied to session records on save.
    pub session_lifetime: Duration,

    /// Per-request deadline enforced by the timeout layer.
    pub request_timeout: Duration,
}

impl AppState {
    /// Connect the database, run migrations, build the template cache and
    /// wire up the production stores.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let pool = SqlitePool::connect(&config.database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| crate::error::AppError::Config(format!("migrations failed: {e}")))?;

        // A broken template must never produce a partially-usable cache:
        // build() aborts startup on any registration defect.
        let templates = Arc::new(TemplateCache::build()?);

        Ok(AppState {
            snippets: Arc::new(SqliteSnippetStore::new(pool.clone())),
            users: Arc::new(SqliteUserStore::new(pool.clone())),
            sessions: Arc::new(SqliteSessionStore::new(pool)),
            templates,
            session_lifetime: config.session_lifetime,
            request_timeout: config.request_timeout,
        })
    }
}
