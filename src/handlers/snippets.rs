//! Snippet pages: home listing, single view, creation form and submission.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};

use super::{base_context, render};
use crate::error::{AppError, AppResult};
use crate::forms::SnippetCreateForm;
use crate::middleware::auth::AuthContext;
use crate::session::Session;
use crate::state::AppState;
use crate::templates::views::PageView;

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Response> {
    let snippets = state.snippets.latest().await?;

    let view = PageView::Home {
        base: base_context(&session, auth),
        snippets,
    };
    render(&state, StatusCode::OK, "home", view)
}

pub async fn view(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if id < 1 {
        return Err(AppError::NotFound);
    }

    let snippet = state.snippets.get(id).await?;

    let view = PageView::SnippetView {
        base: base_context(&session, auth),
        snippet,
    };
    render(&state, StatusCode::OK, "view", view)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Response> {
    let view = PageView::Create {
        base: base_context(&session, auth),
        form: SnippetCreateForm::default(),
    };
    render(&state, StatusCode::OK, "create", view)
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
    Form(mut form): Form<SnippetCreateForm>,
) -> AppResult<Response> {
    if !form.validate() {
        let view = PageView::Create {
            base: base_context(&session, auth),
            form,
        };
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, "create", view);
    }

    let id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;

    session.set_flash("Snippet successfully created!")?;

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
