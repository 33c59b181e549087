use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo, UsersWriteRepo};
use crate::domain::entities::{UserCredentials, UserRecord};

use super::util::{from_micros, to_micros};
use super::{SqliteRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, username, first_name, last_name, password_hash, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    created_at: i64,
}

impl UserRow {
    fn into_credentials(self) -> UserCredentials {
        let password_hash = self.password_hash.clone();
        UserCredentials {
            user: UserRecord::from(self),
            password_hash,
        }
    }
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: from_micros(row.created_at),
        }
    }
}

impl SqliteRepositories {
    async fn fetch_user_row_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRow>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl UsersRepo for SqliteRepositories {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let row = self.fetch_user_row_by_username(username).await?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, RepoError> {
        let row = self.fetch_user_row_by_username(username).await?;
        Ok(row.map(UserRow::into_credentials))
    }
}

#[async_trait]
impl UsersWriteRepo for SqliteRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let CreateUserParams {
            username,
            first_name,
            last_name,
            password_hash,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, password_hash, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .bind(to_micros(OffsetDateTime::now_utc()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }
}
