//! Per-page view data and the askama template types behind it.
//!
//! [`PageView`] is a closed set: one tagged variant per page, each owning the
//! data its template needs for a single request. A view is handed to the
//! renderer once and never shared or mutated afterwards.

use askama::Template;

use crate::db::models::Snippet;
use crate::forms::{LoginForm, SignupForm, SnippetCreateForm};

use super::RenderError;

/// Data every page needs, assembled per request by the handler layer.
#[derive(Debug, Clone, Default)]
pub struct BaseContext {
    pub current_year: i32,
    pub flash: String,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

/// Typed view data, one variant per page.
#[derive(Debug)]
pub enum PageView {
    Home {
        base: BaseContext,
        snippets: Vec<Snippet>,
    },
    SnippetView {
        base: BaseContext,
        snippet: Snippet,
    },
    Create {
        base: BaseContext,
        form: SnippetCreateForm,
    },
    Signup {
        base: BaseContext,
        form: SignupForm,
    },
    Login {
        base: BaseContext,
        form: LoginForm,
    },
}

/// Custom template filters, resolvable inside every template in this module.
mod filters {
    use time::OffsetDateTime;

    pub fn humandate(t: &OffsetDateTime) -> askama::Result<String> {
        Ok(super::super::human_date(Some(*t)))
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomePage<'a> {
    base: &'a BaseContext,
    snippets: &'a [Snippet],
}

#[derive(Template)]
#[template(path = "pages/view.html")]
struct ViewPage<'a> {
    base: &'a BaseContext,
    snippet: &'a Snippet,
}

#[derive(Template)]
#[template(path = "pages/create.html")]
struct CreatePage<'a> {
    base: &'a BaseContext,
    form: &'a SnippetCreateForm,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
struct SignupPage<'a> {
    base: &'a BaseContext,
    form: &'a SignupForm,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginPage<'a> {
    base: &'a BaseContext,
    form: &'a LoginForm,
}

pub(super) fn render_home(view: &PageView) -> Result<String, RenderError> {
    match view {
        PageView::Home { base, snippets } => Ok(HomePage { base, snippets }.render()?),
        _ => Err(RenderError::ViewMismatch { page: "home" }),
    }
}

pub(super) fn render_view(view: &PageView) -> Result<String, RenderError> {
    match view {
        PageView::SnippetView { base, snippet } => Ok(ViewPage { base, snippet }.render()?),
        _ => Err(RenderError::ViewMismatch { page: "view" }),
    }
}

pub(super) fn render_create(view: &PageView) -> Result<String, RenderError> {
    match view {
        PageView::Create { base, form } => Ok(CreatePage { base, form }.render()?),
        _ => Err(RenderError::ViewMismatch { page: "create" }),
    }
}

pub(super) fn render_signup(view: &PageView) -> Result<String, RenderError> {
    match view {
        PageView::Signup { base, form } => Ok(SignupPage { base, form }.render()?),
        _ => Err(RenderError::ViewMismatch { page: "signup" }),
    }
}

pub(super) fn render_login(view: &PageView) -> Result<String, RenderError> {
    match view {
        PageView::Login { base, form } => Ok(LoginPage { base, form }.render()?),
        _ => Err(RenderError::ViewMismatch { page: "login" }),
    }
}
