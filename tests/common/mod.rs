#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use yatube::{
    application::{
        auth::SignupCommand,
        repos::{
            CreateGroupParams, CreatePostParams, CreateUserParams, GroupsWriteRepo,
            PostsWriteRepo, UsersWriteRepo,
        },
    },
    config::Settings,
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        db::SqliteRepositories,
        http::{HttpState, SESSION_COOKIE, build_router},
        uploads::UploadStorage,
    },
};

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub state: HttpState,
    pub router: Router,
    pub repos: Arc<SqliteRepositories>,
    _uploads: TempDir,
}

pub async fn app(pool: SqlitePool) -> TestApp {
    let settings = Settings::defaults().expect("default settings");
    app_with(pool, settings)
}

pub fn app_with(pool: SqlitePool, settings: Settings) -> TestApp {
    let uploads = tempfile::tempdir().expect("uploads dir");
    let storage =
        Arc::new(UploadStorage::new(uploads.path().to_path_buf()).expect("upload storage"));
    let repos = Arc::new(SqliteRepositories::new(pool));
    let state = HttpState::new(repos.clone(), storage, &settings).expect("http state");
    let router = build_router(state.clone());

    TestApp {
        state,
        router,
        repos,
        _uploads: uploads,
    }
}

impl TestApp {
    /// Register through the auth service and return a `Cookie` header value.
    pub async fn signup_and_login(&self, username: &str) -> (UserRecord, String) {
        let user = self
            .state
            .auth
            .signup(SignupCommand {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                password: PASSWORD.to_string(),
                password_confirmation: PASSWORD.to_string(),
            })
            .await
            .expect("signup");
        let session = self
            .state
            .auth
            .login(username, PASSWORD)
            .await
            .expect("login");
        (user, format!("{SESSION_COOKIE}={}", session.token))
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        const BOUNDARY: &str = "yatube-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub async fn create_user(repos: &SqliteRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("create user")
}

pub async fn create_group(repos: &SqliteRepositories, title: &str, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        })
        .await
        .expect("create group")
}

pub async fn create_post(
    repos: &SqliteRepositories,
    author: &UserRecord,
    text: &str,
    group: Option<&GroupRecord>,
) -> PostRecord {
    repos
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|group| group.id),
            image: None,
        })
        .await
        .expect("create post")
}
