//! # Router Assembly
//!
//! The one place where the middleware chain gets its order. Layers listed
//! first in a `ServiceBuilder` wrap everything after them, so reading top to
//! bottom is reading outermost to innermost:
//!
//! - outer (every route, static files and `/ping` included):
//!   recover → trace → timeout → security headers
//! - dynamic routes only: session → csrf → authenticate
//! - protected routes only: require_auth
//!
//! `require_auth` reads the `AuthContext` that `authenticate` attaches, and
//! the CSRF guard reads the `Session` extension, so neither may be mounted
//! without its upstream stage.

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, snippets, users};
use crate::middleware::{auth, csrf, headers, recover, session};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/snippet/create",
            get(snippets::create).post(snippets::create_post),
        )
        .route("/user/logout", post(users::logout_post))
        .route_layer(middleware::from_fn(auth::require_auth));

    let dynamic = Router::new()
        .route("/", get(snippets::home))
        .route("/snippet/view/{id}", get(snippets::view))
        .route("/user/signup", get(users::signup).post(users::signup_post))
        .route("/user/login", get(users::login).post(users::login_post))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session::session,
                ))
                .layer(middleware::from_fn(csrf::guard))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::authenticate,
                )),
        );

    Router::new()
        .merge(dynamic)
        .route("/ping", get(health::ping))
        .nest_service("/static", ServeDir::new("static"))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(recover::recover))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(state.request_timeout))
                .layer(middleware::from_fn(headers::security_headers)),
        )
        .with_state(state)
}
