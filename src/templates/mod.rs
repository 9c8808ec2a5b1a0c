//! # Template Cache
//!
//! Maps logical page names to pre-compiled, renderable template sets. Each
//! page composes three layers: the base layout, the shared nav partial, and
//! the page document itself — askama resolves and validates that composition
//! when the crate is compiled, so a broken template can never produce a
//! partially-usable cache at runtime.
//!
//! The cache is built once in the composition root, stored in `AppState`
//! behind an `Arc`, and never mutated afterwards; concurrent readers need no
//! locking. A lookup miss is a startup/config defect (a page was added
//! without being registered), never a user-facing condition.

pub mod views;

use std::collections::HashMap;
use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::AppError;
use views::PageView;

/// Fixed 24-hour UTC pattern, e.g. "05 Mar 2022 at 10:15".
const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] at [hour]:[minute]");

/// Human-readable timestamp for templates. The zero value (`None`) renders
/// as the empty string; anything else is normalized to UTC first.
pub fn human_date(t: Option<OffsetDateTime>) -> String {
    match t {
        None => String::new(),
        Some(t) => t
            .to_offset(UtcOffset::UTC)
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_default(),
    }
}

/// Rendering failures. All of these are server-side defects.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No cache entry under this name: a page exists that was never
    /// registered, or a handler asked for a page that does not exist.
    #[error("the template {0:?} does not exist")]
    UnknownPage(String),

    /// The view data variant does not belong to the requested page.
    #[error("view data does not match page {page:?}")]
    ViewMismatch { page: &'static str },

    /// The template engine failed mid-render.
    #[error(transparent)]
    Askama(#[from] askama::Error),
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Template(err.to_string())
    }
}

type RenderFn = fn(&PageView) -> Result<String, RenderError>;

/// The logical pages this application renders. Every entry here must have a
/// registered render function, and vice versa.
pub const PAGE_NAMES: [&str; 5] = ["home", "view", "create", "signup", "login"];

/// Immutable name → template-set mapping, built once at startup.
pub struct TemplateCache {
    pages: HashMap<&'static str, RenderFn>,
}

impl TemplateCache {
    /// Build the cache, registering exactly one entry per page. Any
    /// registration defect aborts startup with a configuration error.
    pub fn build() -> Result<Self, AppError> {
        let mut cache = Self {
            pages: HashMap::new(),
        };

        cache.register("home", views::render_home)?;
        cache.register("view", views::render_view)?;
        cache.register("create", views::render_create)?;
        cache.register("signup", views::render_signup)?;
        cache.register("login", views::render_login)?;

        if cache.pages.len() != PAGE_NAMES.len() {
            return Err(AppError::Config(format!(
                "template cache has {} entries, expected {}",
                cache.pages.len(),
                PAGE_NAMES.len()
            )));
        }

        Ok(cache)
    }

    fn register(&mut self, name: &'static str, f: RenderFn) -> Result<(), AppError> {
        if self.pages.insert(name, f).is_some() {
            return Err(AppError::Config(format!(
                "template {name:?} registered twice"
            )));
        }
        Ok(())
    }

    /// Execute the named page into a buffer. The caller attaches the HTTP
    /// status only after this returns Ok, so a mid-render failure still
    /// becomes a clean error response.
    pub fn render(&self, name: &str, view: &PageView) -> Result<String, RenderError> {
        let render = self
            .pages
            .get(name)
            .ok_or_else(|| RenderError::UnknownPage(name.to_string()))?;

        render(view)
    }

    /// The registered page names (test visibility).
    pub fn page_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.pages.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::views::BaseContext;
    use super::*;
    use crate::db::mocks::mock_snippet;
    use time::macros::datetime;

    #[test]
    fn human_date_zero_value_is_empty() {
        assert_eq!(human_date(None), "");
    }

    #[test]
    fn human_date_formats_utc() {
        let t = datetime!(2022-03-05 10:15 UTC);
        assert_eq!(human_date(Some(t)), "05 Mar 2022 at 10:15");
    }

    #[test]
    fn human_date_normalizes_offsets_to_utc() {
        // 10:15 in UTC+1 is 09:15 UTC.
        let t = datetime!(2022-03-05 10:15 +1);
        assert_eq!(human_date(Some(t)), "05 Mar 2022 at 09:15");
    }

    #[test]
    fn build_registers_exactly_one_entry_per_page() {
        let cache = TemplateCache::build().unwrap();
        let mut expected = PAGE_NAMES.to_vec();
        expected.sort_unstable();
        assert_eq!(cache.page_names(), expected);
    }

    #[test]
    fn unknown_page_lookup_is_an_error() {
        let cache = TemplateCache::build().unwrap();
        let view = PageView::Home {
            base: BaseContext::default(),
            snippets: vec![],
        };

        let err = cache.render("missing", &view).unwrap_err();
        assert!(matches!(err, RenderError::UnknownPage(_)));
    }

    #[test]
    fn mismatched_view_data_is_an_error() {
        let cache = TemplateCache::build().unwrap();
        let view = PageView::Home {
            base: BaseContext::default(),
            snippets: vec![],
        };

        let err = cache.render("view", &view).unwrap_err();
        assert!(matches!(err, RenderError::ViewMismatch { page: "view" }));
    }

    #[test]
    fn home_page_renders_snippets_and_flash() {
        let cache = TemplateCache::build().unwrap();
        let view = PageView::Home {
            base: BaseContext {
                current_year: 2024,
                flash: "Snippet successfully created!".to_string(),
                is_authenticated: true,
                csrf_token: "tok".to_string(),
            },
            snippets: vec![mock_snippet()],
        };

        let html = cache.render("home", &view).unwrap();
        assert!(html.contains("an old silent pond"));
        assert!(html.contains("Snippet successfully created!"));
        assert!(html.contains("02 Jan 2024 at 10:15"));
        assert!(html.contains("/user/logout"));
    }
}
