//! # Sessions
//!
//! Server-side session state addressed by an opaque, unguessable token that
//! travels in a cookie. The [`Session`] handle here is the per-request view
//! of that state: the session middleware loads it before the handler runs and
//! persists it afterwards based on the lifecycle status the handler left
//! behind.
//!
//! Handlers never see the token itself. They read and write named values,
//! request a renewal on privilege changes (login/logout), or destroy the
//! session outright; the middleware owns token issuance and invalidation.

pub mod store;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

use crate::error::AppResult;

/// Session data key holding the flash message shown on the next page load.
pub const FLASH_KEY: &str = "flash";

/// Session data key holding the per-session anti-forgery token.
pub const CSRF_TOKEN_KEY: &str = "_csrf_token";

/// Session data key holding the id of the authenticated user, if any.
pub const AUTH_USER_ID_KEY: &str = "authenticated_user_id";

/// Generate a new unguessable session or CSRF token:
/// 32 random bytes, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// What happened to a session during a request. Ordered: a status only ever
/// moves towards the more drastic outcome, never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    /// Nothing written this request.
    #[default]
    Unchanged,
    /// Data was written; persist under the current token.
    Modified,
    /// Privilege change: issue a new token, migrate data, invalidate the old
    /// token so a captured pre-login token cannot ride the new session.
    Renewed,
    /// Logout/expiry: delete the record and clear the cookie.
    Destroyed,
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Value>,
    status: Status,
}

/// The record a [`store::SessionStore`] keeps per token.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub data: HashMap<String, Value>,
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}

/// Request-scoped session handle, shared between the middleware and the
/// handler via request extensions.
///
/// Cheap to clone; all clones observe the same state. The mutex is only held
/// for in-memory map access, never across an await point.
#[derive(Debug, Clone, Default)]
pub struct Session(Arc<Mutex<Inner>>);

impl Session {
    /// A fresh, empty session. Stays unpersisted until the first write.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session rehydrated from a store record.
    pub fn from_data(data: HashMap<String, Value>) -> Self {
        Self(Arc::new(Mutex::new(Inner {
            data,
            status: Status::Unchanged,
        })))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned session mutex means a panic mid-update; the recovery
        // wrapper already turned that request into a 500, so continuing
        // with the inner state is sound.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read a value, deserializing it into the requested type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.lock();
        inner
            .data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write a value. Upgrades the status to at least `Modified`.
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> AppResult<()> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.lock();
        inner.data.insert(key.to_string(), value);
        inner.status = inner.status.max(Status::Modified);
        Ok(())
    }

    /// Remove a value if present.
    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.data.remove(key).is_some() {
            inner.status = inner.status.max(Status::Modified);
        }
    }

    /// Read and remove a value in one step (used for flash messages).
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut inner = self.lock();
        let value = inner.data.remove(key)?;
        inner.status = inner.status.max(Status::Modified);
        serde_json::from_value(value).ok()
    }

    /// Queue a flash message for the next rendered page.
    pub fn set_flash(&self, message: &str) -> AppResult<()> {
        self.insert(FLASH_KEY, message)
    }

    /// Take the pending flash message, if any.
    pub fn pop_flash(&self) -> String {
        self.pop::<String>(FLASH_KEY).unwrap_or_default()
    }

    /// The anti-forgery token bound to this session, if one has been minted.
    pub fn csrf_token(&self) -> Option<String> {
        self.get::<String>(CSRF_TOKEN_KEY)
    }

    /// Request a token renewal on privilege escalation. Data migrates to the
    /// new token, except the CSRF binding: rotating the session invalidates
    /// the old anti-forgery token.
    pub fn renew(&self) {
        let mut inner = self.lock();
        inner.data.remove(CSRF_TOKEN_KEY);
        inner.status = inner.status.max(Status::Renewed);
    }

    /// Destroy the session: clear all data and delete the record.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.status = Status::Destroyed;
    }

    /// Snapshot taken by the middleware after the handler has finished.
    pub fn state(&self) -> (Status, HashMap<String, Value>) {
        let inner = self.lock();
        (inner.status, inner.data.clone())
    }
}
