//! # HTTP Request Handlers
//!
//! The business handlers behind the dynamic routes, plus the two helpers
//! they all share: assembling the per-page [`BaseContext`] and rendering a
//! page through the template cache.
//!
//! ## Submodules
//! - `health`: liveness endpoint, wired outside the dynamic chain
//! - `snippets`: home page, snippet view, snippet creation
//! - `users`: signup, login (with session renewal), logout

pub mod health;
pub mod snippets;
pub mod users;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::session::Session;
use crate::state::AppState;
use crate::templates::views::{BaseContext, PageView};

/// Data every page gets: the current year, the one-shot flash message, the
/// authentication flag and the session's anti-forgery token.
pub fn base_context(session: &Session, auth: AuthContext) -> BaseContext {
    BaseContext {
        current_year: OffsetDateTime::now_utc().year(),
        flash: session.pop_flash(),
        is_authenticated: auth.is_authenticated(),
        csrf_token: session.csrf_token().unwrap_or_default(),
    }
}

/// Render a page into a buffer, then attach the status code. A mid-render
/// failure returns before any status is committed, so the recovery wrapper
/// can still produce a clean error response.
pub fn render(
    state: &AppState,
    status: StatusCode,
    page: &str,
    view: PageView,
) -> AppResult<Response> {
    let html = state.templates.render(page, &view).map_err(AppError::from)?;
    Ok((status, Html(html)).into_response())
}
