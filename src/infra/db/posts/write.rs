use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;
use crate::infra::db::util::to_micros;

use super::SqliteRepositories;
use super::types::PostRow;

#[async_trait]
impl PostsWriteRepo for SqliteRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            text,
            group_id,
            image,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id = sqlx::query(
            "INSERT INTO posts (text, pub_date, image, author_id, group_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(text)
        .bind(to_micros(OffsetDateTime::now_utc()))
        .bind(image)
        .bind(author_id)
        .bind(group_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        let row = sqlx::query_as::<_, PostRow>(&Self::post_by_id_sql())
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            group_id,
            image,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            "UPDATE posts SET text = ?, group_id = ?, image = COALESCE(?, image) WHERE id = ?",
        )
        .bind(text)
        .bind(group_id)
        .bind(image)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        let row = sqlx::query_as::<_, PostRow>(&Self::post_by_id_sql())
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: i64) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&Self::post_by_id_sql())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }
}
