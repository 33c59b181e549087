use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        auth::AuthService,
        error::{ErrorReport, HttpError},
        feed::{FeedError, FeedService},
        follow::FollowService,
        groups::GroupService,
        pagination::PageNumber,
        posts::PostCommandService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, GroupsWriteRepo, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo, UsersWriteRepo,
        },
    },
    cache::{CacheConfig, CacheState, RenderedIndexPage, index_cache_layer},
    config::Settings,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        uploads::{UploadStorage, UploadStorageError},
    },
    presentation::views::{
        FeedPageContext, FollowTemplate, GroupContext, GroupTemplate, IndexTemplate, LayoutChrome,
        LayoutContext, PostDetailContext, PostDetailTemplate, ProfileContext, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth, db_health_response, follow,
    middleware::{log_responses, set_request_context},
    posts,
    session::{RequireUser, Viewer, resolve_session},
};

#[derive(Clone)]
pub struct HttpState {
    pub site_title: Arc<str>,
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostCommandService>,
    pub groups: Arc<GroupService>,
    pub follows: Arc<FollowService>,
    pub auth: Arc<AuthService>,
    pub db: Arc<SqliteRepositories>,
    pub upload_storage: Arc<UploadStorage>,
    pub upload_body_limit: usize,
    pub secure_cookies: bool,
    pub cache: CacheState,
}

impl HttpState {
    /// Wire every service onto one set of repositories.
    pub fn new(
        repositories: Arc<SqliteRepositories>,
        upload_storage: Arc<UploadStorage>,
        settings: &Settings,
    ) -> Result<Self, InfraError> {
        let users: Arc<dyn UsersRepo> = repositories.clone();
        let users_write: Arc<dyn UsersWriteRepo> = repositories.clone();
        let groups: Arc<dyn GroupsRepo> = repositories.clone();
        let groups_write: Arc<dyn GroupsWriteRepo> = repositories.clone();
        let posts: Arc<dyn PostsRepo> = repositories.clone();
        let posts_write: Arc<dyn PostsWriteRepo> = repositories.clone();
        let comments: Arc<dyn CommentsRepo> = repositories.clone();
        let follows: Arc<dyn FollowsRepo> = repositories.clone();
        let sessions: Arc<dyn SessionsRepo> = repositories.clone();

        let session_ttl = time::Duration::try_from(settings.auth.session_ttl)
            .map_err(|err| InfraError::setting("auth.session_ttl_hours", err.to_string()))?;

        Ok(Self {
            site_title: Arc::from(settings.site.title.as_str()),
            feed: Arc::new(FeedService::new(
                posts.clone(),
                groups.clone(),
                users.clone(),
                follows.clone(),
                comments.clone(),
            )),
            posts: Arc::new(PostCommandService::new(
                posts,
                posts_write,
                groups.clone(),
                comments,
                upload_storage.clone(),
            )),
            groups: Arc::new(GroupService::new(groups, groups_write)),
            follows: Arc::new(FollowService::new(users.clone(), follows)),
            auth: Arc::new(AuthService::new(users, users_write, sessions, session_ttl)),
            db: repositories,
            upload_storage,
            upload_body_limit: settings.uploads.body_limit(),
            secure_cookies: settings.auth.secure_cookies,
            cache: CacheState::new(CacheConfig::from(&settings.cache)),
        })
    }

    pub fn chrome(&self, viewer: &Viewer) -> LayoutChrome {
        LayoutChrome::new(self.site_title.as_ref(), viewer.user())
    }
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index listing is cached; every other page reflects writes immediately.
    let cached_routes = Router::new()
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(
            state.cache.clone(),
            index_cache_layer,
        ));

    let upload_routes = Router::new()
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .layer(DefaultBodyLimit::max(state.upload_body_limit));

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(follow::follow_author))
        .route("/profile/{username}/unfollow/", get(follow::unfollow_author))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/posts/{id}/delete/", post(posts::delete_post))
        .route("/follow/", get(follow_index))
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health));

    cached_routes
        .merge(upload_routes)
        .merge(routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn page(&self) -> PageNumber {
        PageNumber::from_query(self.page.as_deref())
    }
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome(&viewer);

    match state.feed.list_index(query.page()).await {
        Ok(page) => {
            let rendered = RenderedIndexPage::from_window(&page.window);
            let content = FeedPageContext::new("Latest updates", "No posts yet.", &page, "/");
            let view = LayoutContext::new(chrome, content);
            let mut response = render_template_response(IndexTemplate { view }, StatusCode::OK);
            response.extensions_mut().insert(rendered);
            response
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome(&viewer);

    match state.feed.list_by_group(&slug, query.page()).await {
        Ok(feed) => {
            let title = format!("Posts of group {}", feed.group.title);
            let chrome = chrome.with_description(feed.group.description.clone());
            let view = LayoutContext::new(chrome.with_title(title), GroupContext::from(&feed));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = state.chrome(&viewer);

    match state
        .feed
        .list_by_author(&username, query.page(), viewer.id())
        .await
    {
        Ok(feed) => {
            let title = format!("Profile of {}", feed.author.display_name());
            let content = ProfileContext::new(&feed, viewer.id().is_some());
            let view = LayoutContext::new(chrome.with_title(title), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Response {
    let chrome = state.chrome(&viewer);

    match state.feed.post_detail(id).await {
        Ok(detail) => {
            let chrome = chrome
                .with_title(PostDetailContext::page_title(&detail))
                .with_description(PostDetailContext::page_description(&detail));
            let content = PostDetailContext::new(&detail, viewer.user());
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    user: RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = user.viewer();
    let chrome = state.chrome(&viewer);

    match state.feed.list_followed(user.id(), query.page()).await {
        Ok(page) => {
            let content = FeedPageContext::new(
                "Posts by authors you follow",
                "You are not following anyone with posts yet.",
                &page,
                "/follow/",
            );
            let view = LayoutContext::new(chrome.with_title("Following"), content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

async fn fallback(State(state): State<HttpState>, viewer: Viewer) -> Response {
    render_not_found_response(state.chrome(&viewer))
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    let detail = match &err {
        FeedError::UnknownGroup => "Unknown group",
        FeedError::UnknownAuthor => "Unknown author",
        FeedError::UnknownPost => "Unknown post",
        FeedError::Repo(_) => return HttpError::from(err).into_response(),
    };

    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message(
        "infra::http::feed_error_to_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
