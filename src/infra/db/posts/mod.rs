mod read;
mod types;
mod write;

use super::SqliteRepositories;

pub(super) const POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, p.author_id, \
     u.username AS author_username, p.group_id, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id";

impl SqliteRepositories {
    fn post_by_id_sql() -> String {
        format!("{POST_SELECT} WHERE p.id = ?")
    }
}
