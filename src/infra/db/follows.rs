use async_trait::async_trait;

use crate::application::repos::{FollowsRepo, RepoError};

use super::util::convert_count;
use super::{SqliteRepositories, map_sqlx_error};

#[async_trait]
impl FollowsRepo for SqliteRepositories {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists != 0)
    }

    async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id) VALUES (?, ?) \
             ON CONFLICT (user_id, author_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }
}
