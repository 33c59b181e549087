mod common;

use axum::http::StatusCode;
use sqlx::SqlitePool;
use yatube::application::{
    follow::{FollowError, FollowOutcome},
    pagination::PageNumber,
    repos::FollowsRepo,
};

use common::{app, body_text, create_post, create_user, location};

#[sqlx::test(migrations = "./migrations")]
async fn following_twice_keeps_a_single_edge(pool: SqlitePool) {
    let app = app(pool).await;
    let reader = create_user(&app.repos, "reader").await;
    create_user(&app.repos, "leo").await;

    let (author, first) = app
        .state
        .follows
        .follow(reader.id, "leo")
        .await
        .expect("follow");
    assert_eq!(first, FollowOutcome::Created);

    let (_, second) = app
        .state
        .follows
        .follow(reader.id, "leo")
        .await
        .expect("follow again");
    assert_eq!(second, FollowOutcome::Unchanged);
    assert_eq!(app.repos.count_followers(author.id).await.expect("count"), 1);

    let (_, removed) = app
        .state
        .follows
        .unfollow(reader.id, "leo")
        .await
        .expect("unfollow");
    assert_eq!(removed, FollowOutcome::Removed);

    let (_, noop) = app
        .state
        .follows
        .unfollow(reader.id, "leo")
        .await
        .expect("unfollow again");
    assert_eq!(noop, FollowOutcome::Unchanged);
    assert!(!app.repos.is_following(reader.id, author.id).await.expect("edge"));
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_refused(pool: SqlitePool) {
    let app = app(pool).await;
    let (leo, cookie) = app.signup_and_login("leo").await;

    let err = app
        .state
        .follows
        .follow(leo.id, "leo")
        .await
        .expect_err("self follow");
    assert!(matches!(err, FollowError::SelfFollow { .. }));

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    assert!(!app.repos.is_following(leo.id, leo.id).await.expect("edge"));
    assert_eq!(app.repos.count_following(leo.id).await.expect("count"), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_routes_toggle_the_edge(pool: SqlitePool) {
    let app = app(pool).await;
    let (reader, cookie) = app.signup_and_login("reader").await;
    let leo = create_user(&app.repos, "leo").await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    assert!(app.repos.is_following(reader.id, leo.id).await.expect("edge"));

    let response = app.get("/profile/leo/unfollow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!app.repos.is_following(reader.id, leo.id).await.expect("edge"));

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_shows_only_followed_authors(pool: SqlitePool) {
    let app = app(pool).await;
    let (reader, cookie) = app.signup_and_login("reader").await;
    let (_, outsider_cookie) = app.signup_and_login("outsider").await;
    let leo = create_user(&app.repos, "leo").await;
    let ann = create_user(&app.repos, "ann").await;

    create_post(&app.repos, &leo, "from leo", None).await;
    create_post(&app.repos, &ann, "from ann", None).await;
    app.state
        .follows
        .follow(reader.id, "leo")
        .await
        .expect("follow");

    let feed = app
        .state
        .feed
        .list_followed(reader.id, PageNumber::FIRST)
        .await
        .expect("feed");
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].author_id, leo.id);

    let html = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(html.contains("from leo"));
    assert!(!html.contains("from ann"));

    let html = body_text(app.get("/follow/", Some(&outsider_cookie)).await).await;
    assert!(!html.contains("from leo"));
    assert!(!html.contains("from ann"));

    let new_post = create_post(&app.repos, &leo, "fresh from leo", None).await;
    let html = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(html.contains(&new_post.text));
}
