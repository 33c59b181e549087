use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::util::{from_micros, to_micros};
use super::{SqliteRepositories, map_sqlx_error};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
     c.text, c.created \
     FROM comments c \
     INNER JOIN users u ON u.id = c.author_id";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    author_username: String,
    text: String,
    created: i64,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            text: row.text,
            created: from_micros(row.created),
        }
    }
}

#[async_trait]
impl CommentsRepo for SqliteRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!("{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created, c.id");
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let CreateCommentParams {
            post_id,
            author_id,
            text,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id = sqlx::query(
            "INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(to_micros(OffsetDateTime::now_utc()))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
