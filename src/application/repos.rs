//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    CommentRecord, GroupRecord, PostRecord, SessionRecord, UserCredentials, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers. Every listing is ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by the authors this user follows.
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    /// `None` keeps the current image.
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub user_id: i64,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn find_credentials(&self, username: &str)
    -> Result<Option<UserCredentials>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, filter: PostListFilter) -> Result<u64, RepoError>;

    async fn list_posts(
        &self,
        filter: PostListFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Remove a post and its comments. Returns the removed record.
    async fn delete_post(&self, id: i64) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Insert the edge unless it already exists. Returns `true` when a row was added.
    async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Remove the edge if present. Returns `true` when a row was removed.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError>;

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams) -> Result<(), RepoError>;

    async fn find_session_by_prefix(&self, prefix: &str)
    -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, prefix: &str) -> Result<(), RepoError>;

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError>;
}
