//! Accounts and cookie sessions.
//!
//! Passwords are hashed with argon2. A session token has the shape
//! `ys_{prefix}_{secret}`: the prefix is stored in clear and used for lookup,
//! the secret is stored as a sha256 digest and compared in constant time.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::users::{Username, validate_password};

const TOKEN_PREFIX: &str = "ys";
const MIN_SECRET_LEN: usize = 32;
const NAME_MAX_CHARS: usize = 150;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signup form is invalid")]
    Invalid(SignupErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignupErrors {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.name.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupCommand {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirmation: String,
}

/// The authenticated user a request was made by, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// A freshly issued session. `token` is the only copy of the secret.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            writer,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn signup(&self, command: SignupCommand) -> Result<UserRecord, AuthError> {
        let mut errors = SignupErrors::default();

        let username = match Username::parse(&command.username) {
            Ok(username) => Some(username),
            Err(err) => {
                errors.username = Some(err.to_string());
                None
            }
        };

        if let Err(err) = validate_password(&command.password) {
            errors.password = Some(err.to_string());
        } else if command.password != command.password_confirmation {
            errors.password = Some("The two password fields didn't match.".to_string());
        }

        let first_name = command.first_name.trim().to_string();
        let last_name = command.last_name.trim().to_string();
        if first_name.chars().count() > NAME_MAX_CHARS || last_name.chars().count() > NAME_MAX_CHARS
        {
            errors.name = Some(format!(
                "names must be at most {NAME_MAX_CHARS} characters"
            ));
        }

        let username = match username {
            Some(username) if errors.is_empty() => username,
            _ => return Err(AuthError::Invalid(errors)),
        };

        let password_hash = hash_password(command.password).await?;

        let params = CreateUserParams {
            username: username.as_str().to_string(),
            first_name,
            last_name,
            password_hash,
        };

        let user = match self.writer.create_user(params).await {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => {
                return Err(AuthError::Invalid(SignupErrors {
                    username: Some("A user with that username already exists.".to_string()),
                    ..SignupErrors::default()
                }));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "yatube::application::auth",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;
        let credentials = self
            .users
            .find_credentials(username.as_str())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password.to_string(), credentials.password_hash).await? {
            debug!(
                target = "yatube::application::auth",
                user_id = credentials.user.id,
                "password mismatch"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        if let Err(err) = self.sessions.delete_expired_sessions(now).await {
            warn!(
                target = "yatube::application::auth",
                error = %err,
                "failed to purge expired sessions"
            );
        }

        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = now + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                prefix,
                hashed_secret: hash_secret(&secret),
                user_id: credentials.user.id,
                expires_at,
            })
            .await?;

        info!(
            target = "yatube::application::auth",
            user_id = credentials.user.id,
            "session issued"
        );

        Ok(IssuedSession {
            user: credentials.user,
            token,
            expires_at,
        })
    }

    /// The user a session token belongs to. Malformed, unknown and expired
    /// tokens resolve to `None`.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<UserRecord>, AuthError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(None);
        };
        let Some(record) = self.sessions.find_session_by_prefix(&parsed.prefix).await? else {
            return Ok(None);
        };

        let hashed_input = hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }

        if record.is_expired(OffsetDateTime::now_utc()) {
            self.sessions.delete_session(&record.prefix).await?;
            return Ok(None);
        }

        Ok(self.users.find_user_by_id(record.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if let Some(parsed) = parse_token(token) {
            self.sessions.delete_session(&parsed.prefix).await?;
            debug!(target = "yatube::application::auth", "session removed");
        }
        Ok(())
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hash(err.to_string()))
    })
    .await
    .map_err(|err| AuthError::Hash(err.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|err| AuthError::Hash(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AuthError::Hash(err.to_string()))?
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}
