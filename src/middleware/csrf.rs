//! CSRF guard: per-session anti-forgery tokens.
//!
//! Safe (read-only) methods get a token minted into their session so the
//! handler can embed it in rendered forms. State-changing methods must echo
//! that token back in the `csrf_token` form field; absence or mismatch is
//! rejected with a 400 before any business logic runs.
//!
//! The token lives in session data, so rotating the session (login/logout)
//! invalidates it together with the old token.

use axum::body::Body;
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::session::{generate_token, Session, CSRF_TOKEN_KEY};

/// Hidden form field carrying the anti-forgery token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Upper bound on buffered form bodies. Snippet content is small; anything
/// beyond this is not a legitimate form submission.
const BODY_LIMIT: usize = 64 * 1024;

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn form_field(bytes: &[u8], name: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

pub async fn guard(request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return AppError::Internal(
            "session middleware must run before the CSRF guard".to_string(),
        )
        .into_response();
    };

    if is_safe(request.method()) {
        // Expose a token for rendered forms, minting one on first use.
        if session.csrf_token().is_none() {
            if let Err(err) = session.insert(CSRF_TOKEN_KEY, generate_token()) {
                return err.into_response();
            }
        }
        return next.run(request).await;
    }

    // State-changing request: the body has to be buffered to reach the form
    // field, then handed back so extractors downstream still see it.
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return AppError::BadRequest("form body too large or unreadable".to_string())
                .into_response()
        }
    };

    let submitted = form_field(&bytes, CSRF_FORM_FIELD);
    let expected = session.csrf_token();

    let valid = matches!((&submitted, &expected), (Some(s), Some(e)) if s == e);
    if !valid {
        return AppError::InvalidCsrf.into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}
