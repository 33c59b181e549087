use async_trait::async_trait;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;

use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    title: String,
    slug: String,
    description: String,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[async_trait]
impl GroupsRepo for SqliteRepositories {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM groups WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GroupRecord::from))
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(GroupRecord::from))
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM groups ORDER BY title, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GroupRecord::from).collect())
    }
}

#[async_trait]
impl GroupsWriteRepo for SqliteRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let CreateGroupParams {
            title,
            slug,
            description,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id = sqlx::query("INSERT INTO groups (title, slug, description) VALUES (?, ?, ?)")
            .bind(title)
            .bind(slug)
            .bind(description)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .last_insert_rowid();

        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(GroupRecord::from(row))
    }
}
