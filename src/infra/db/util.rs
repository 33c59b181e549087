use sqlx::error::ErrorKind;
use time::OffsetDateTime;

use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: constraint_name(db.message()),
            },
            ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation => {
                RepoError::InvalidInput {
                    message: db.message().to_string(),
                }
            }
            ErrorKind::CheckViolation => RepoError::Integrity {
                message: db.message().to_string(),
            },
            _ if db.message().contains("database is locked") => RepoError::Timeout,
            _ => RepoError::from_persistence(db.message()),
        },
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

/// SQLite reports `UNIQUE constraint failed: users.username`; keep the column list.
fn constraint_name(message: &str) -> String {
    message
        .split_once("failed:")
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn to_micros(value: OffsetDateTime) -> i64 {
    let micros = value.unix_timestamp_nanos() / 1_000;
    i64::try_from(micros).unwrap_or(i64::MAX)
}

pub(crate) fn from_micros(value: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(value) * 1_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_name_is_extracted() {
        assert_eq!(
            constraint_name("UNIQUE constraint failed: follows.user_id, follows.author_id"),
            "follows.user_id, follows.author_id"
        );
        assert_eq!(constraint_name("something else"), "unknown");
    }

    #[test]
    fn micros_survive_storage() {
        let now = OffsetDateTime::now_utc();
        let restored = from_micros(to_micros(now));
        assert_eq!(restored.unix_timestamp(), now.unix_timestamp());
        assert_eq!(restored.microsecond(), now.microsecond());
    }
}
