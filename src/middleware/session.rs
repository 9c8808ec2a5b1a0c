//! Session middleware: cookie in, session handle through, store write out.
//!
//! On entry the token is read from the session cookie and its record loaded
//! from the store; no cookie, or an expired/unknown token, yields a fresh
//! empty session that stays unpersisted until the first write (lazy
//! creation). The [`Session`] handle goes into request extensions for the
//! rest of the chain.
//!
//! On exit the session's lifecycle status decides what to persist:
//! `Renewed` issues a brand-new token and invalidates the old one, so a
//! token captured before login cannot ride the authenticated session.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use cookie::{Cookie, SameSite};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;

use crate::error::AppResult;
use crate::session::{generate_token, Session, SessionRecord, Status};
use crate::state::AppState;

/// Name of the session-token cookie.
pub const SESSION_COOKIE: &str = "session";

fn request_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn record(data: HashMap<String, Value>, lifetime: Duration) -> SessionRecord {
    SessionRecord {
        data,
        expires_at: OffsetDateTime::now_utc() + lifetime,
    }
}

fn session_cookie(token: String, lifetime: Duration) -> Cookie<'static> {
    let max_age = time::Duration::try_from(lifetime).unwrap_or(time::Duration::hours(12));
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

pub async fn session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let incoming = request_token(&request);

    // A live token is one that resolved to an unexpired record; only live
    // tokens are deleted or refreshed on the way out.
    let mut live_token: Option<String> = None;
    let session = match &incoming {
        Some(token) => match state.sessions.load(token).await {
            Ok(Some(record)) => {
                live_token = Some(token.clone());
                Session::from_data(record.data)
            }
            Ok(None) => Session::new(),
            Err(err) => return err.into_response(),
        },
        None => Session::new(),
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let (status, data) = session.state();
    let lifetime = state.session_lifetime;

    let outcome: AppResult<Option<Cookie<'static>>> = match status {
        // Nothing written. Refresh the idle lifetime of a live session and
        // re-issue the cookie so its Max-Age slides along with the record;
        // a fresh empty session is never persisted.
        Status::Unchanged => match &live_token {
            Some(token) => state
                .sessions
                .save(token, &record(data, lifetime))
                .await
                .map(|()| Some(session_cookie(token.clone(), lifetime))),
            None => Ok(None),
        },
        Status::Modified => {
            let token = live_token.clone().unwrap_or_else(generate_token);
            state
                .sessions
                .save(&token, &record(data, lifetime))
                .await
                .map(|()| Some(session_cookie(token, lifetime)))
        }
        Status::Renewed => {
            let fresh = generate_token();
            let saved = state.sessions.save(&fresh, &record(data, lifetime)).await;
            let deleted = match &live_token {
                Some(old) => state.sessions.delete(old).await,
                None => Ok(()),
            };
            saved
                .and(deleted)
                .map(|()| Some(session_cookie(fresh, lifetime)))
        }
        Status::Destroyed => {
            let deleted = match &live_token {
                Some(old) => state.sessions.delete(old).await,
                None => Ok(()),
            };
            deleted.map(|()| live_token.as_ref().map(|_| removal_cookie()))
        }
    };

    match outcome {
        Ok(Some(cookie)) => {
            if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
                response.headers_mut().append(SET_COOKIE, value);
            }
            response
        }
        Ok(None) => response,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::{MemoryStore, SessionStore};
    use crate::session::AUTH_USER_ID_KEY;
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with_store(store: Arc<MemoryStore>) -> Router {
        let mut state = test_state();
        state.sessions = store;

        Router::new()
            .route(
                "/write",
                get(|Extension(session): Extension<Session>| async move {
                    session.insert("greeting", "hello").unwrap();
                    "written"
                }),
            )
            .route(
                "/read",
                get(|Extension(session): Extension<Session>| async move {
                    session.get::<String>("greeting").unwrap_or_default()
                }),
            )
            .route(
                "/login",
                get(|Extension(session): Extension<Session>| async move {
                    session.renew();
                    session.insert(AUTH_USER_ID_KEY, 1).unwrap();
                    "logged in"
                }),
            )
            .route(
                "/logout",
                get(|Extension(session): Extension<Session>| async move {
                    session.destroy();
                    "logged out"
                }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), session))
            .with_state(state)
    }

    fn set_cookie_token(response: &Response) -> Option<String> {
        let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
        let cookie = Cookie::parse(header.to_string()).ok()?;
        assert_eq!(cookie.name(), SESSION_COOKIE);
        Some(cookie.value().to_string())
    }

    async fn seed(store: &MemoryStore, token: &str) {
        let mut data = HashMap::new();
        data.insert("greeting".to_string(), Value::from("hello"));
        store
            .save(token, &record(data, Duration::from_secs(3600)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn session_is_created_lazily_on_first_write() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with_store(store.clone());

        // A read-only request with no cookie creates nothing.
        let response = app
            .clone()
            .oneshot(Request::get("/read").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());

        // The first write mints a token and persists the record.
        let response = app
            .oneshot(Request::get("/write").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let token = set_cookie_token(&response).expect("cookie issued");
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));

        let saved = store.load(&token).await.unwrap().unwrap();
        assert_eq!(saved.data.get("greeting").unwrap(), "hello");
    }

    #[tokio::test]
    async fn read_only_request_slides_the_cookie_of_a_live_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "tok").await;
        let app = app_with_store(store);

        let response = app
            .oneshot(
                Request::get("/read")
                    .header(COOKIE, format!("{SESSION_COOKIE}=tok"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // The same token comes back with a fresh Max-Age, so the browser
        // cookie expires together with the refreshed record, not at first
        // issue.
        let token = set_cookie_token(&response).expect("cookie re-issued");
        assert_eq!(token, "tok");
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.contains("Max-Age="));
        assert!(!header.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn loaded_session_is_visible_to_handlers() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "tok").await;
        let app = app_with_store(store);

        let response = app
            .oneshot(
                Request::get("/read")
                    .header(COOKIE, format!("{SESSION_COOKIE}=tok"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn renewal_rotates_the_token_and_invalidates_the_old_one() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "pre-login").await;
        let app = app_with_store(store.clone());

        let response = app
            .oneshot(
                Request::get("/login")
                    .header(COOKIE, format!("{SESSION_COOKIE}=pre-login"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let fresh = set_cookie_token(&response).expect("new cookie issued");
        assert_ne!(fresh, "pre-login");

        // The captured pre-login token no longer resolves to anything.
        assert!(store.load("pre-login").await.unwrap().is_none());

        // The migrated data lives under the new token only.
        let migrated = store.load(&fresh).await.unwrap().unwrap();
        assert_eq!(migrated.data.get("greeting").unwrap(), "hello");
        assert_eq!(migrated.data.get(AUTH_USER_ID_KEY).unwrap(), 1);
    }

    #[tokio::test]
    async fn destroy_deletes_the_record_and_clears_the_cookie() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "tok").await;
        let app = app_with_store(store.clone());

        let response = app
            .oneshot(
                Request::get("/logout")
                    .header(COOKIE, format!("{SESSION_COOKIE}=tok"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(store.load("tok").await.unwrap().is_none());

        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.contains("Max-Age=0"));
    }
}
