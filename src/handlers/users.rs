//! User pages: signup, login and logout.
//!
//! Login and logout are privilege changes, so both renew the session token
//! (see the session middleware) before the response goes out.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};

use super::{base_context, render};
use crate::error::{AppError, AppResult};
use crate::forms::{LoginForm, SignupForm};
use crate::middleware::auth::AuthContext;
use crate::session::{Session, AUTH_USER_ID_KEY};
use crate::state::AppState;
use crate::templates::views::PageView;

pub async fn signup(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Response> {
    let view = PageView::Signup {
        base: base_context(&session, auth),
        form: SignupForm::default(),
    };
    render(&state, StatusCode::OK, "signup", view)
}

pub async fn signup_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
    Form(mut form): Form<SignupForm>,
) -> AppResult<Response> {
    if !form.validate() {
        let view = PageView::Signup {
            base: base_context(&session, auth),
            form,
        };
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, "signup", view);
    }

    match state
        .users
        .insert(&form.name, &form.email, &form.password)
        .await
    {
        Ok(()) => {
            session.set_flash("Your signup was successful. Please log in.")?;
            Ok(Redirect::to("/user/login").into_response())
        }
        Err(AppError::DuplicateEmail) => {
            form.errors
                .add_field("email", "Email address is already in use");
            let view = PageView::Signup {
                base: base_context(&session, auth),
                form,
            };
            render(&state, StatusCode::UNPROCESSABLE_ENTITY, "signup", view)
        }
        Err(err) => Err(err),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Response> {
    let view = PageView::Login {
        base: base_context(&session, auth),
        form: LoginForm::default(),
    };
    render(&state, StatusCode::OK, "login", view)
}

pub async fn login_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthContext>,
    Form(mut form): Form<LoginForm>,
) -> AppResult<Response> {
    if !form.validate() {
        let view = PageView::Login {
            base: base_context(&session, auth),
            form,
        };
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, "login", view);
    }

    match state.users.authenticate(&form.email, &form.password).await {
        Ok(user_id) => {
            // Privilege escalation: rotate the token before storing the id,
            // so a captured pre-login token is dead from here on.
            session.renew();
            session.insert(AUTH_USER_ID_KEY, user_id)?;
            Ok(Redirect::to("/snippet/create").into_response())
        }
        Err(AppError::InvalidCredentials) => {
            form.errors.add_general("Email or password is incorrect");
            let view = PageView::Login {
                base: base_context(&session, auth),
                form,
            };
            render(&state, StatusCode::UNPROCESSABLE_ENTITY, "login", view)
        }
        Err(err) => Err(err),
    }
}

pub async fn logout_post(
    Extension(session): Extension<Session>,
) -> AppResult<Response> {
    session.remove(AUTH_USER_ID_KEY);
    // Dropping privilege is a privilege change too: rotate the token.
    session.renew();
    session.set_flash("You've been logged out successfully!")?;

    Ok(Redirect::to("/").into_response())
}
