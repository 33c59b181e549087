//! Account identity rules.

use crate::domain::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// A username limited to letters, digits and `@.+-_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if value.chars().count() > USERNAME_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "username must be at most {USERNAME_MAX_CHARS} characters"
            )));
        }
        if !value
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(DomainError::validation(
                "username may contain only letters, digits and @/./+/-/_",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn validate_password(raw: &str) -> Result<(), DomainError> {
    if raw.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(format!(
            "password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    Ok(())
}
