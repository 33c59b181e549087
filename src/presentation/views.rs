use crate::{
    application::{
        auth::SignupErrors,
        error::{ErrorReport, HttpError},
        feed::{GroupFeed, PostDetail, ProfileFeed},
        pagination::{Page, PageWindow},
        posts::PostFormErrors,
    },
    domain::{
        entities::{CommentRecord, GroupRecord, PostRecord, UserRecord},
        posts::{HUMAN_DATE_FORMAT, ISO_DATE_FORMAT, POST_TITLE_CHARS, headline, truncate_chars},
    },
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;

const META_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title("Page not found"), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct CurrentUserView {
    pub username: String,
    pub display_name: String,
    pub profile_href: String,
}

impl From<&UserRecord> for CurrentUserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name(),
            profile_href: profile_href(&user.username),
        }
    }
}

/// Site-wide parts of every page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub user: Option<CurrentUserView>,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn new(site_title: impl Into<String>, user: Option<&UserRecord>) -> Self {
        let site_title = site_title.into();
        Self {
            meta: PageMetaView {
                title: site_title.clone(),
                description: String::new(),
            },
            site_title,
            user: user.map(CurrentUserView::from),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            meta: PageMetaView {
                title: title.into(),
                ..self.meta
            },
            ..self
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            meta: PageMetaView {
                description: description.into(),
                ..self.meta
            },
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub user: Option<CurrentUserView>,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            user: chrome.user,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub author_username: String,
    pub author_href: String,
    pub published: String,
    pub iso_date: String,
    pub group: Option<GroupLinkView>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        let group = match (post.group_slug.as_ref(), post.group_title.as_ref()) {
            (Some(slug), Some(title)) => Some(GroupLinkView {
                title: title.clone(),
                href: group_href(slug),
            }),
            _ => None,
        };

        Self {
            id: post.id,
            text: post.text.clone(),
            author_username: post.author_username.clone(),
            author_href: profile_href(&post.author_username),
            published: format_human_date(post.pub_date),
            iso_date: format_iso_date(post.pub_date),
            group,
            image_url: post.image.as_deref().map(media_href),
            detail_href: post_href(post.id),
        }
    }
}

pub fn build_post_cards(posts: &[PostRecord]) -> Vec<PostCard> {
    posts.iter().map(PostCard::from).collect()
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub is_current: bool,
}

/// Numbered links around the current page plus previous/next shortcuts.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub total_pages: u32,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLinkView>,
}

impl PaginatorView {
    pub fn new(window: &PageWindow, base_path: &str) -> Self {
        let href = |number: u32| format!("{base_path}?page={number}");
        Self {
            number: window.number,
            total_pages: window.total_pages,
            previous_href: window.previous_number().map(href),
            next_href: window.next_number().map(href),
            pages: (1..=window.total_pages)
                .map(|number| PageLinkView {
                    number,
                    href: href(number),
                    is_current: number == window.number,
                })
                .collect(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }
}

/// Paginated listing shared by the index and the follow feed.
pub struct FeedPageContext {
    pub heading: String,
    pub empty_message: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl FeedPageContext {
    pub fn new(
        heading: impl Into<String>,
        empty_message: impl Into<String>,
        page: &Page<PostRecord>,
        base_path: &str,
    ) -> Self {
        Self {
            heading: heading.into(),
            empty_message: empty_message.into(),
            posts: build_post_cards(&page.items),
            paginator: PaginatorView::new(&page.window, base_path),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedPageContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedPageContext>,
}

pub struct GroupContext {
    pub title: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl From<&GroupFeed> for GroupContext {
    fn from(feed: &GroupFeed) -> Self {
        Self {
            title: feed.group.title.clone(),
            description: feed.group.description.clone(),
            posts: build_post_cards(&feed.page.items),
            paginator: PaginatorView::new(&feed.page.window, &group_href(&feed.group.slug)),
        }
    }
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub followers: u64,
    pub following_count: u64,
    pub following: bool,
    pub can_follow: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl ProfileContext {
    /// `signed_in` hides the follow controls from guests.
    pub fn new(feed: &ProfileFeed, signed_in: bool) -> Self {
        let base = profile_href(&feed.author.username);
        Self {
            username: feed.author.username.clone(),
            display_name: feed.author.display_name(),
            post_count: feed.page.window.total_items,
            followers: feed.followers,
            following_count: feed.following_count,
            following: feed.following,
            can_follow: signed_in && !feed.is_own_profile,
            follow_href: format!("{base}follow/"),
            unfollow_href: format!("{base}unfollow/"),
            posts: build_post_cards(&feed.page.items),
            paginator: PaginatorView::new(&feed.page.window, &base),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub created: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            author_href: profile_href(&comment.author_username),
            text: comment.text.clone(),
            created: format_human_date(comment.created),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
    pub edit_href: String,
    pub delete_href: String,
    pub comment_href: String,
}

impl PostDetailContext {
    pub fn new(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let id = detail.post.id;
        Self {
            post: PostCard::from(&detail.post),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            can_edit: viewer.is_some_and(|user| detail.post.is_authored_by(user.id)),
            can_comment: viewer.is_some(),
            edit_href: format!("{}edit/", post_href(id)),
            delete_href: format!("{}delete/", post_href(id)),
            comment_href: format!("{}comment/", post_href(id)),
        }
    }

    pub fn page_title(detail: &PostDetail) -> String {
        format!("Post {}", headline(&detail.post.text, POST_TITLE_CHARS))
    }

    pub fn page_description(detail: &PostDetail) -> String {
        truncate_chars(&detail.post.text, META_DESCRIPTION_CHARS)
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone)]
pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Create and edit share one form.
pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub no_group_selected: bool,
    pub current_image: Option<String>,
    pub errors: PostFormErrors,
}

impl PostFormContext {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self::build(false, "/create/".to_string(), "", "", groups, None)
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        let selected = post.group_id.map(|id| id.to_string()).unwrap_or_default();
        Self::build(
            true,
            format!("{}edit/", post_href(post.id)),
            &post.text,
            &selected,
            groups,
            post.image.as_deref(),
        )
    }

    /// Re-render a submitted form with its values and messages.
    pub fn resubmit(
        action: String,
        is_edit: bool,
        text: &str,
        selected_group: &str,
        groups: &[GroupRecord],
        current_image: Option<&str>,
        errors: PostFormErrors,
    ) -> Self {
        Self {
            errors,
            ..Self::build(
                is_edit,
                action,
                text,
                selected_group,
                groups,
                current_image,
            )
        }
    }

    fn build(
        is_edit: bool,
        action: String,
        text: &str,
        selected_group: &str,
        groups: &[GroupRecord],
        current_image: Option<&str>,
    ) -> Self {
        let selected_group = selected_group.trim();
        let groups: Vec<GroupOptionView> = groups
            .iter()
            .map(|group| GroupOptionView {
                id: group.id,
                title: group.title.clone(),
                selected: group.id.to_string() == selected_group,
            })
            .collect();
        Self {
            is_edit,
            action,
            text: text.to_string(),
            no_group_selected: !groups.iter().any(|group| group.selected),
            groups,
            current_image: current_image.map(media_href),
            errors: PostFormErrors::default(),
        }
    }
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub errors: SignupErrors,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn media_href(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

fn format_human_date(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

fn format_iso_date(value: OffsetDateTime) -> String {
    value
        .format(ISO_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}
