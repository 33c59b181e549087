use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

use super::util::{from_micros, to_micros};
use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionRow {
    prefix: String,
    hashed_secret: Vec<u8>,
    user_id: i64,
    created_at: i64,
    expires_at: i64,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            user_id: row.user_id,
            created_at: from_micros(row.created_at),
            expires_at: from_micros(row.expires_at),
        }
    }
}

#[async_trait]
impl SessionsRepo for SqliteRepositories {
    async fn create_session(&self, params: CreateSessionParams) -> Result<(), RepoError> {
        let CreateSessionParams {
            prefix,
            hashed_secret,
            user_id,
            expires_at,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO sessions (prefix, hashed_secret, user_id, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(prefix)
        .bind(hashed_secret)
        .bind(user_id)
        .bind(to_micros(OffsetDateTime::now_utc()))
        .bind(to_micros(expires_at))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT prefix, hashed_secret, user_id, created_at, expires_at \
             FROM sessions WHERE prefix = ?",
        )
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SessionRecord::from))
    }

    async fn delete_session(&self, prefix: &str) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM sessions WHERE prefix = ?")
            .bind(prefix)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(to_micros(now))
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
