//! # Forms & Validation
//!
//! One form type per page that accepts input, each with its own validation
//! rules. Handlers deserialize the submitted body into the matching form,
//! call `validate()`, and re-render the page with the populated
//! [`ValidationErrors`] on failure. No store call happens for an invalid
//! form.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The HTML5 email input pattern.
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Accumulated validation failures: per-field messages plus general ones
/// that belong to no single field (e.g. "email or password is incorrect").
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
    general: Vec<String>,
}

impl ValidationErrors {
    /// Record a message for a field, keeping only the first per field.
    pub fn add_field(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    /// Record a message not tied to any field.
    pub fn add_general(&mut self, message: impl Into<String>) {
        self.general.push(message.into());
    }

    /// The message recorded for a field, if any. Called from templates.
    pub fn field(&self, name: &str) -> Option<&String> {
        self.fields.get(name)
    }

    /// Messages not tied to any field. Called from templates.
    pub fn general(&self) -> &[String] {
        &self.general
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_empty()
    }
}

/// A value is blank when it is empty after trimming whitespace.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn char_count(value: &str) -> usize {
    value.chars().count()
}

/// Form behind GET/POST /snippet/create.
#[derive(Debug, Clone, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_expires")]
    pub expires: i64,
    #[serde(skip)]
    pub errors: ValidationErrors,
}

fn default_expires() -> i64 {
    365
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: default_expires(),
            errors: ValidationErrors::default(),
        }
    }
}

impl SnippetCreateForm {
    /// Check the form, populating `errors`. Returns true when clean.
    pub fn validate(&mut self) -> bool {
        if is_blank(&self.title) {
            self.errors.add_field("title", "This field cannot be blank");
        } else if char_count(&self.title) > 100 {
            self.errors
                .add_field("title", "This field cannot be more than 100 characters long");
        }

        // Blank means empty after trimming, same rule as the title.
        if is_blank(&self.content) {
            self.errors
                .add_field("content", "This field cannot be blank");
        }

        if ![1, 7, 365].contains(&self.expires) {
            self.errors
                .add_field("expires", "This field must equal 1, 7 or 365");
        }

        self.errors.is_empty()
    }
}

/// Form behind GET/POST /user/signup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip)]
    pub errors: ValidationErrors,
}

impl SignupForm {
    pub fn validate(&mut self) -> bool {
        if is_blank(&self.name) {
            self.errors.add_field("name", "This field cannot be blank");
        }

        if is_blank(&self.email) {
            self.errors.add_field("email", "This field cannot be blank");
        } else if !EMAIL_RE.is_match(&self.email) {
            self.errors
                .add_field("email", "This field must be a valid email address");
        }

        if is_blank(&self.password) {
            self.errors
                .add_field("password", "This field cannot be blank");
        } else if char_count(&self.password) < 8 {
            self.errors
                .add_field("password", "This field must be at least 8 characters long");
        }

        self.errors.is_empty()
    }
}

/// Form behind GET/POST /user/login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(skip)]
    pub errors: ValidationErrors,
}

impl LoginForm {
    pub fn validate(&mut self) -> bool {
        if is_blank(&self.email) {
            self.errors.add_field("email", "This field cannot be blank");
        } else if !EMAIL_RE.is_match(&self.email) {
            self.errors
                .add_field("email", "This field must be a valid email address");
        }

        if is_blank(&self.password) {
            self.errors
                .add_field("password", "This field cannot be blank");
        }

        self.errors.is_empty()
    }
}
