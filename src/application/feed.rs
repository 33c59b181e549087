//! Read side: post listings, profiles and post detail pages.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{Page, PageNumber, PageWindow, posts_per_page};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostListFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::slug::validate_slug;
use crate::domain::users::Username;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    /// Whether the viewer currently follows the author.
    pub following: bool,
    pub is_own_profile: bool,
    pub followers: u64,
    pub following_count: u64,
}

pub struct PostDetail {
    pub post: PostRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
        }
    }

    /// Every post, newest first.
    pub async fn list_index(&self, page: PageNumber) -> Result<Page<PostRecord>, FeedError> {
        self.paginate(PostListFilter::All, page).await
    }

    pub async fn list_by_group(
        &self,
        slug: &str,
        page: PageNumber,
    ) -> Result<GroupFeed, FeedError> {
        if validate_slug(slug).is_err() {
            return Err(FeedError::UnknownGroup);
        }

        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;

        let page = self.paginate(PostListFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn list_by_author(
        &self,
        username: &str,
        page: PageNumber,
        viewer: Option<i64>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self.find_author(username).await?;
        let page = self.paginate(PostListFilter::Author(author.id), page).await?;

        let is_own_profile = viewer == Some(author.id);
        let following = match viewer {
            Some(viewer_id) if !is_own_profile => {
                self.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        let followers = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;

        Ok(ProfileFeed {
            author,
            page,
            following,
            is_own_profile,
            followers,
            following_count,
        })
    }

    /// Posts by the authors `user_id` follows. Empty when the user follows nobody.
    pub async fn list_followed(
        &self,
        user_id: i64,
        page: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.paginate(PostListFilter::FollowedBy(user_id), page).await
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or(FeedError::UnknownPost)?;

        let author_post_count = self
            .posts
            .count_posts(PostListFilter::Author(post.author_id))
            .await?;
        let comments = self.comments.list_comments(post.id).await?;

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }

    async fn find_author(&self, username: &str) -> Result<UserRecord, FeedError> {
        let username = Username::parse(username).map_err(|_| FeedError::UnknownAuthor)?;
        self.users
            .find_user_by_username(username.as_str())
            .await?
            .ok_or(FeedError::UnknownAuthor)
    }

    async fn paginate(
        &self,
        filter: PostListFilter,
        requested: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = PageWindow::resolve(total, posts_per_page(), requested);

        let items = if window.is_empty() {
            Vec::new()
        } else {
            self.posts
                .list_posts(filter, window.offset(), window.limit())
                .await?
        };

        debug!(
            target = "yatube::application::feed",
            ?filter,
            requested = requested.get(),
            page = window.number,
            total_pages = window.total_pages,
            items = items.len(),
            "resolved post listing page"
        );

        Ok(Page::new(items, window))
    }
}
