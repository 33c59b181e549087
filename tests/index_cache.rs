mod common;

use std::time::Duration;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use yatube::config::Settings;

use common::{app, app_with, body_text, create_post, create_user};

#[sqlx::test(migrations = "./migrations")]
async fn index_stays_stale_until_cache_is_cleared(pool: SqlitePool) {
    let app = app(pool).await;
    let leo = create_user(&app.repos, "leo").await;
    create_post(&app.repos, &leo, "before caching", None).await;

    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("before caching"));
    assert_eq!(app.state.cache.pages.len(), 1);

    create_post(&app.repos, &leo, "written after caching", None).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(!html.contains("written after caching"));

    // Other listings are never cached.
    let html = body_text(app.get("/profile/leo/", None).await).await;
    assert!(html.contains("written after caching"));

    app.state.cache.pages.clear();
    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("written after caching"));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleted_post_keeps_serving_until_cache_is_cleared(pool: SqlitePool) {
    let app = app(pool).await;
    let (leo, cookie) = app.signup_and_login("leo").await;
    let post = create_post(&app.repos, &leo, "soon to be deleted", None).await;

    let before = app
        .get("/", Some(&cookie))
        .await
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    assert!(String::from_utf8_lossy(&before).contains("soon to be deleted"));

    let response = app
        .post_form(&format!("/posts/{}/delete/", post.id), "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let after = app
        .get("/", Some(&cookie))
        .await
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    assert_eq!(before, after);

    app.state.cache.pages.clear();
    let html = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(!html.contains("soon to be deleted"));
}

#[sqlx::test(migrations = "./migrations")]
async fn out_of_range_pages_share_the_last_page_entry(pool: SqlitePool) {
    let app = app(pool).await;
    let leo = create_user(&app.repos, "leo").await;
    for n in 1..=15 {
        create_post(&app.repos, &leo, &format!("entry{n:02}"), None).await;
    }

    let second = body_text(app.get("/?page=2", None).await).await;
    assert_eq!(app.state.cache.pages.len(), 1);

    for uri in ["/?page=3", "/?page=99"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, second, "{uri}");
    }
    assert_eq!(app.state.cache.pages.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn index_pages_are_cached_per_page_and_viewer(pool: SqlitePool) {
    let app = app(pool).await;
    let leo = create_user(&app.repos, "leo").await;
    for n in 1..=12 {
        create_post(&app.repos, &leo, &format!("entry{n:02}"), None).await;
    }
    let (_, cookie) = app.signup_and_login("reader").await;

    app.get("/", None).await;
    app.get("/?page=2", None).await;
    app.get("/", Some(&cookie)).await;
    assert_eq!(app.state.cache.pages.len(), 3);

    create_post(&app.repos, &leo, "entry13", None).await;
    let html = body_text(app.get("/?page=2", None).await).await;
    assert!(html.contains("entry01"));
    assert!(!html.contains("entry03"));
}

#[sqlx::test(migrations = "./migrations")]
async fn index_entries_expire_after_ttl(pool: SqlitePool) {
    let mut settings = Settings::defaults().expect("defaults");
    settings.cache.index_ttl = Duration::from_secs(1);
    let app = app_with(pool, settings);
    let leo = create_user(&app.repos, "leo").await;

    app.get("/", None).await;
    create_post(&app.repos, &leo, "eventually visible", None).await;
    let html = body_text(app.get("/", None).await).await;
    assert!(!html.contains("eventually visible"));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("eventually visible"));
}

#[sqlx::test(migrations = "./migrations")]
async fn disabled_cache_reflects_writes_immediately(pool: SqlitePool) {
    let mut settings = Settings::defaults().expect("defaults");
    settings.cache.enabled = false;
    let app = app_with(pool, settings);
    let leo = create_user(&app.repos, "leo").await;

    app.get("/", None).await;
    create_post(&app.repos, &leo, "shown at once", None).await;
    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("shown at once"));
    assert!(app.state.cache.pages.is_empty());
}
