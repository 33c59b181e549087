//! Session cookie resolution and the extractors built on it.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::warn;
use url::form_urlencoded;

use crate::{application::auth::CurrentUser, domain::entities::UserRecord};

use super::HttpState;

pub const SESSION_COOKIE: &str = "yatube_session";
pub const LOGIN_PATH: &str = "/auth/login/";

/// Attach the signed-in user, if any, to the request extensions.
pub async fn resolve_session(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let current = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.auth.resolve_session(cookie.value()).await {
            Ok(user) => user.map(CurrentUser),
            Err(err) => {
                warn!(
                    target = "yatube::http::session",
                    error = %err,
                    "failed to resolve session, continuing as guest"
                );
                None
            }
        },
        None => None,
    };

    if let Some(user) = current.clone() {
        request.extensions_mut().insert(user);
    }

    let mut response = next.run(request).await;
    if let Some(user) = current {
        response.extensions_mut().insert(user);
    }
    response
}

/// The optional signed-in user.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<CurrentUser>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref().map(|current| &current.0)
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(CurrentUser::id)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// A signed-in user. Guests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct RequireUser(pub CurrentUser);

impl RequireUser {
    pub fn user(&self) -> &UserRecord {
        &self.0.0
    }

    pub fn id(&self) -> i64 {
        self.0.id()
    }

    pub fn viewer(&self) -> Viewer {
        Viewer(Some(self.0.clone()))
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(user) => Ok(Self(user.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(LoginRedirect::new(next))
            }
        }
    }
}

#[derive(Debug)]
pub struct LoginRedirect {
    next: String,
}

impl LoginRedirect {
    pub fn new(next: &str) -> Self {
        Self {
            next: safe_next(Some(next)).to_string(),
        }
    }

    pub fn location(&self) -> String {
        login_url(&self.next)
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.location()).into_response()
    }
}

pub fn login_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(value)
            if value.starts_with('/') && !value.starts_with("//") && !value.contains('\\') =>
        {
            value
        }
        _ => "/",
    }
}

pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(ttl)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
