use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostListFilter, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;
use crate::infra::db::util::convert_count;

use super::types::PostRow;
use super::{POST_SELECT, SqliteRepositories};

#[async_trait]
impl PostsRepo for SqliteRepositories {
    async fn count_posts(&self, filter: PostListFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        convert_count(count)
    }

    async fn list_posts(
        &self,
        filter: PostListFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: "page offset exceeds supported range".to_string(),
        })?;

        let mut qb = QueryBuilder::new(POST_SELECT);
        qb.push(" WHERE 1=1");
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit.clamp(1, 100)));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&Self::post_by_id_sql())
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
