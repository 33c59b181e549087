use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        auth::AuthError, feed::FeedError, follow::FollowError, posts::PostCommandError,
        repos::RepoError,
    },
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        let status = match error {
            RepoError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpError::from_error(
            "infra::http::repo_error_to_http_error",
            status,
            INTERNAL_MESSAGE,
            &error,
        )
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "infra::http::feed_error_to_http_error";
        match error {
            FeedError::UnknownGroup => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown group",
                "Group slug did not match any group",
            ),
            FeedError::UnknownAuthor => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                "Username did not match any user",
            ),
            FeedError::UnknownPost => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown post",
                "Post id did not match any post",
            ),
            FeedError::Repo(err) => HttpError::from(err),
        }
    }
}

impl From<PostCommandError> for HttpError {
    fn from(error: PostCommandError) -> Self {
        const SOURCE: &str = "infra::http::post_command_error_to_http_error";
        match error {
            PostCommandError::Invalid(errors) => HttpError::new(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Submitted form is invalid",
                format!("{errors:?}"),
            ),
            PostCommandError::NotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown post",
                "Post id did not match any post",
            ),
            err @ PostCommandError::NotAuthor { .. } => {
                HttpError::from_error(SOURCE, StatusCode::FORBIDDEN, "Not allowed", &err)
            }
            PostCommandError::Upload(err) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded image",
                &err,
            ),
            PostCommandError::Repo(err) => HttpError::from(err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "infra::http::follow_error_to_http_error";
        match error {
            FollowError::UnknownAuthor => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                "Username did not match any user",
            ),
            err @ FollowError::SelfFollow { .. } => {
                HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Not allowed", &err)
            }
            FollowError::Repo(err) => HttpError::from(err),
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(error: AuthError) -> Self {
        const SOURCE: &str = "infra::http::auth_error_to_http_error";
        match error {
            AuthError::Invalid(errors) => HttpError::new(
                SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Submitted form is invalid",
                format!("{errors:?}"),
            ),
            AuthError::InvalidCredentials => HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
                "Credentials were rejected",
            ),
            err @ AuthError::Hash(_) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE,
                &err,
            ),
            AuthError::Repo(err) => HttpError::from(err),
        }
    }
}

/// Failures that abort a CLI command or server start-up.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
