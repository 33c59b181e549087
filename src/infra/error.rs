//! Failures while bringing up storage, telemetry and the HTTP listener.

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to {action}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to {action}")]
    Database {
        action: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to install tracing subscriber")]
    Telemetry(#[source] TryInitError),
    #[error("invalid setting `{key}`: {reason}")]
    Setting { key: &'static str, reason: String },
}

impl InfraError {
    pub fn io(action: &'static str, source: std::io::Error) -> Self {
        Self::Io { action, source }
    }

    pub fn database(action: &'static str, source: sqlx::Error) -> Self {
        Self::Database { action, source }
    }

    pub fn setting(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Setting {
            key,
            reason: reason.into(),
        }
    }
}
