use crate::domain::entities::PostRecord;
use crate::infra::db::util::from_micros;

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) pub_date: i64,
    pub(crate) image: Option<String>,
    pub(crate) author_id: i64,
    pub(crate) author_username: String,
    pub(crate) group_id: Option<i64>,
    pub(crate) group_slug: Option<String>,
    pub(crate) group_title: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: from_micros(row.pub_date),
            image: row.image,
            author_id: row.author_id,
            author_username: row.author_username,
            group_id: row.group_id,
            group_slug: row.group_slug,
            group_title: row.group_title,
        }
    }
}
