//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::posts::{POST_HEADLINE_CHARS, headline};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    /// Full name when present, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// A user together with the stored password hash. Only the auth service sees this.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
}

impl PostRecord {
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&headline(&self.text, POST_HEADLINE_CHARS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}
