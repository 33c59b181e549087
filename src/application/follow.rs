//! Follow edges between a reader and an author.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::users::Username;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author")]
    UnknownAuthor,
    #[error("users cannot follow themselves")]
    SelfFollow { author: UserRecord },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What a follow or unfollow call did to the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    Removed,
    /// The edge was already in the requested state.
    Unchanged,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Start following `author`. Following twice leaves a single edge.
    pub async fn follow(
        &self,
        follower_id: i64,
        author: &str,
    ) -> Result<(UserRecord, FollowOutcome), FollowError> {
        let author = self.find_author(author).await?;
        if author.id == follower_id {
            return Err(FollowError::SelfFollow { author });
        }

        let outcome = if self.follows.insert_follow(follower_id, author.id).await? {
            FollowOutcome::Created
        } else {
            FollowOutcome::Unchanged
        };

        info!(
            target = "yatube::application::follow",
            follower_id,
            author_id = author.id,
            ?outcome,
            "follow requested"
        );
        Ok((author, outcome))
    }

    /// Stop following `author`. A missing edge is not an error.
    pub async fn unfollow(
        &self,
        follower_id: i64,
        author: &str,
    ) -> Result<(UserRecord, FollowOutcome), FollowError> {
        let author = self.find_author(author).await?;

        let outcome = if self.follows.delete_follow(follower_id, author.id).await? {
            FollowOutcome::Removed
        } else {
            FollowOutcome::Unchanged
        };

        info!(
            target = "yatube::application::follow",
            follower_id,
            author_id = author.id,
            ?outcome,
            "unfollow requested"
        );
        Ok((author, outcome))
    }

    pub async fn is_following(&self, follower_id: i64, author_id: i64) -> Result<bool, FollowError> {
        Ok(self.follows.is_following(follower_id, author_id).await?)
    }

    async fn find_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        let username = Username::parse(username).map_err(|_| FollowError::UnknownAuthor)?;
        self.users
            .find_user_by_username(username.as_str())
            .await?
            .ok_or(FollowError::UnknownAuthor)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::entities::UserCredentials;

    #[derive(Default)]
    struct MemoryRepo {
        users: Vec<UserRecord>,
        edges: Mutex<HashSet<(i64, i64)>>,
    }

    #[async_trait]
    impl UsersRepo for MemoryRepo {
        async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
            Ok(self.users.iter().find(|user| user.id == id).cloned())
        }

        async fn find_user_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .users
                .iter()
                .find(|user| user.username == username)
                .cloned())
        }

        async fn find_credentials(
            &self,
            _username: &str,
        ) -> Result<Option<UserCredentials>, RepoError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl FollowsRepo for MemoryRepo {
        async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
            Ok(self
                .edges
                .lock()
                .expect("edges lock")
                .contains(&(user_id, author_id)))
        }

        async fn insert_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
            Ok(self
                .edges
                .lock()
                .expect("edges lock")
                .insert((user_id, author_id)))
        }

        async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
            Ok(self
                .edges
                .lock()
                .expect("edges lock")
                .remove(&(user_id, author_id)))
        }

        async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
            let edges = self.edges.lock().expect("edges lock");
            Ok(edges.iter().filter(|(u, _)| *u == user_id).count() as u64)
        }

        async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
            let edges = self.edges.lock().expect("edges lock");
            Ok(edges.iter().filter(|(_, a)| *a == author_id).count() as u64)
        }
    }

    fn user(id: i64, username: &str) -> UserRecord {
        UserRecord {
            id,
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn setup() -> (FollowService, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo {
            users: vec![user(1, "reader"), user(2, "author")],
            ..MemoryRepo::default()
        });
        (FollowService::new(repo.clone(), repo.clone()), repo)
    }

    #[tokio::test]
    async fn follow_twice_keeps_one_edge() {
        let (service, repo) = setup();

        let (_, first) = service.follow(1, "author").await.expect("first follow");
        let (_, second) = service.follow(1, "author").await.expect("second follow");

        assert_eq!(first, FollowOutcome::Created);
        assert_eq!(second, FollowOutcome::Unchanged);
        assert_eq!(repo.count_following(1).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn self_follow_creates_no_edge() {
        let (service, repo) = setup();

        let result = service.follow(1, "reader").await;
        assert!(matches!(result, Err(FollowError::SelfFollow { .. })));
        assert_eq!(repo.count_following(1).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_a_no_op() {
        let (service, _) = setup();

        let (_, outcome) = service.unfollow(1, "author").await.expect("unfollow");
        assert_eq!(outcome, FollowOutcome::Unchanged);

        service.follow(1, "author").await.expect("follow");
        let (_, outcome) = service.unfollow(1, "author").await.expect("unfollow");
        assert_eq!(outcome, FollowOutcome::Removed);
        assert!(!service.is_following(1, 2).await.expect("state"));
    }

    #[tokio::test]
    async fn unknown_author_fails() {
        let (service, _) = setup();
        assert!(matches!(
            service.follow(1, "ghost").await,
            Err(FollowError::UnknownAuthor)
        ));
        assert!(matches!(
            service.unfollow(1, "bad name").await,
            Err(FollowError::UnknownAuthor)
        ));
    }
}
