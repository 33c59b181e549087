//! Signup, login and logout.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    application::{
        auth::{AuthError, SignupCommand, SignupErrors},
        error::HttpError,
    },
    presentation::views::{
        LayoutContext, LoginContext, LoginTemplate, SignupContext, SignupTemplate,
        render_template_response,
    },
};

use super::{
    HttpState,
    session::{SESSION_COOKIE, Viewer, expired_session_cookie, safe_next, session_cookie},
};

const INVALID_LOGIN_MESSAGE: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupForm {
    username: String,
    first_name: String,
    last_name: String,
    password: String,
    password_confirmation: String,
}

pub(super) async fn login_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Response {
    let content = LoginContext {
        username: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        error: None,
    };
    let view = LayoutContext::new(state.chrome(&viewer).with_title("Log in"), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    match state.auth.login(&form.username, &form.password).await {
        Ok(session) => {
            let cookie = session_cookie(
                session.token,
                state.auth.session_ttl(),
                state.secure_cookies,
            );
            (jar.add(cookie), Redirect::to(&next)).into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            let content = LoginContext {
                username: form.username,
                next,
                error: Some(INVALID_LOGIN_MESSAGE.to_string()),
            };
            let view = LayoutContext::new(state.chrome(&viewer).with_title("Log in"), content);
            render_template_response(LoginTemplate { view }, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.auth.logout(cookie.value()).await
    {
        warn!(
            target = "yatube::http::auth",
            error = %err,
            "failed to remove session"
        );
    }

    (jar.remove(expired_session_cookie()), Redirect::to("/")).into_response()
}

pub(super) async fn signup_form(State(state): State<HttpState>, viewer: Viewer) -> Response {
    render_signup(&state, &viewer, SignupContext::default(), StatusCode::OK)
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Form(form): Form<SignupForm>,
) -> Response {
    let command = SignupCommand {
        username: form.username.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        password: form.password,
        password_confirmation: form.password_confirmation,
    };

    match state.auth.signup(command).await {
        Ok(user) => {
            info!(
                target = "yatube::http::auth",
                user_id = user.id,
                "account created"
            );
            Redirect::to("/auth/login/").into_response()
        }
        Err(AuthError::Invalid(errors)) => render_signup(
            &state,
            &viewer,
            signup_context(form.username, form.first_name, form.last_name, errors),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn signup_context(
    username: String,
    first_name: String,
    last_name: String,
    errors: SignupErrors,
) -> SignupContext {
    SignupContext {
        username,
        first_name,
        last_name,
        errors,
    }
}

fn render_signup(
    state: &HttpState,
    viewer: &Viewer,
    content: SignupContext,
    status: StatusCode,
) -> Response {
    let view = LayoutContext::new(state.chrome(viewer).with_title("Sign up"), content);
    render_template_response(SignupTemplate { view }, status)
}
