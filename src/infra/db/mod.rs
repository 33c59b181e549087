//! SQLite-backed repository implementations.

mod comments;
mod follows;
mod groups;
mod posts;
mod sessions;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    QueryBuilder, Sqlite, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

use crate::application::repos::PostListFilter;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteRepositories {
    pool: Arc<SqlitePool>,
}

impl SqliteRepositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }

    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
    }

    fn apply_post_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: PostListFilter) {
        match filter {
            PostListFilter::All => {}
            PostListFilter::Group(group_id) => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            PostListFilter::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            PostListFilter::FollowedBy(user_id) => {
                qb.push(" AND p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ");
                qb.push_bind(user_id);
                qb.push(") AND p.author_id <> ");
                qb.push_bind(user_id);
            }
        }
    }
}
