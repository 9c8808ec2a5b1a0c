//! Authentication propagation and the protected-route guard.
//!
//! `authenticate` runs for every dynamic route: it resolves "is this request
//! authenticated" from session state once, re-validates the user still
//! exists, and attaches the answer as an immutable [`AuthContext`] extension.
//! `require_auth` trusts only that context — it never inspects the session
//! store — which makes the propagator-before-guard ordering a hard
//! dependency, enforced where the router is assembled.

use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::session::{Session, AUTH_USER_ID_KEY};
use crate::state::AppState;

/// Request-scoped, read-only authentication status. Computed freshly for
/// each request and never mutated once attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthContext {
    user_id: Option<i64>,
}

impl AuthContext {
    pub fn authenticated(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

/// Resolve authentication status from the session and attach it.
///
/// Re-validation failures degrade to "not authenticated" — a deleted user or
/// a store hiccup must never crash the request here.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<Session>().cloned();

    let mut ctx = AuthContext::anonymous();
    if let Some(session) = session {
        if let Some(id) = session.get::<i64>(AUTH_USER_ID_KEY) {
            match state.users.exists(id).await {
                Ok(true) => ctx = AuthContext::authenticated(id),
                // The user behind this session no longer exists; drop the
                // stale id so we stop re-checking it.
                Ok(false) => session.remove(AUTH_USER_ID_KEY),
                Err(err) => {
                    tracing::warn!(
                        user_id = id,
                        error = %err,
                        "could not re-validate user; treating request as unauthenticated"
                    );
                }
            }
        }
    }

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Reject unauthenticated requests to protected routes with a redirect to
/// the login page. Must be mounted after [`authenticate`].
pub async fn require_auth(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<AuthContext>()
        .is_some_and(AuthContext::is_authenticated);

    if !authenticated {
        let mut response = Redirect::to("/user/login").into_response();
        // Pages behind the guard must not be served from cache either.
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        return response;
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mocks::{MockSnippetStore, MockUserStore};
    use crate::middleware::session as session_mw;
    use crate::session::store::{MemoryStore, SessionStore};
    use crate::session::SessionRecord;
    use crate::state::test_support::{test_state, test_state_with};
    use axum::body::Body;
    use axum::http::header::{COOKIE, LOCATION};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    fn chain(state: crate::state::AppState, counter: Arc<AtomicUsize>) -> Router {
        let guarded = Router::new()
            .route(
                "/protected",
                get(move |Extension(ctx): Extension<AuthContext>| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        format!("user {}", ctx.user_id().unwrap_or(0))
                    }
                }),
            )
            .route_layer(middleware::from_fn(require_auth));

        guarded
            .layer(
                tower::ServiceBuilder::new()
                    .layer(middleware::from_fn_with_state(
                        state.clone(),
                        session_mw::session,
                    ))
                    .layer(middleware::from_fn_with_state(state.clone(), authenticate)),
            )
            .with_state(state)
    }

    async fn seed_authenticated(store: &MemoryStore, token: &str, user_id: i64) {
        let mut data = HashMap::new();
        data.insert(AUTH_USER_ID_KEY.to_string(), Value::from(user_id));
        store
            .save(
                token,
                &SessionRecord {
                    data,
                    expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unauthenticated_request_redirects_to_login() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = chain(test_state(), calls.clone());

        let response = app
            .oneshot(Request::get("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/user/login");
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-store");
        // The guarded handler never ran.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn authenticated_request_reaches_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        seed_authenticated(&store, "tok", 1).await;

        let mut state = test_state();
        state.sessions = store;
        let app = chain(state, calls.clone());

        let response = app
            .oneshot(
                Request::get("/protected")
                    .header(COOKIE, "session=tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"user 1");
    }

    #[tokio::test]
    async fn deleted_user_degrades_to_unauthenticated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        seed_authenticated(&store, "tok", 1).await;

        let users = MockUserStore {
            deny_exists: true,
            ..Default::default()
        };
        let (mut state, _, _) = test_state_with(MockSnippetStore::default(), users);
        state.sessions = store.clone();
        let app = chain(state, calls.clone());

        let response = app
            .oneshot(
                Request::get("/protected")
                    .header(COOKIE, "session=tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Redirected, not crashed; and the stale id was dropped from the
        // persisted session.
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let saved = store.load("tok").await.unwrap().unwrap();
        assert!(!saved.data.contains_key(AUTH_USER_ID_KEY));
    }
}
