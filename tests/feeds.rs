mod common;

use axum::http::StatusCode;
use sqlx::SqlitePool;
use yatube::application::pagination::PageNumber;

use common::{app, body_text, create_group, create_post, create_user};

fn page(n: u32) -> PageNumber {
    PageNumber::new(n).unwrap_or_default()
}

#[sqlx::test(migrations = "./migrations")]
async fn index_pages_hold_ten_posts_and_clamp_past_the_end(pool: SqlitePool) {
    let app = app(pool).await;
    let author = create_user(&app.repos, "leo").await;
    for n in 1..=15 {
        create_post(&app.repos, &author, &format!("post number {n}"), None).await;
    }

    let first = app.state.feed.list_index(page(1)).await.expect("page 1");
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.window.total_pages, 2);
    assert_eq!(first.items[0].text, "post number 15");

    let second = app.state.feed.list_index(page(2)).await.expect("page 2");
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.items[4].text, "post number 1");

    let clamped = app.state.feed.list_index(page(3)).await.expect("page 3");
    assert_eq!(clamped.window.number, 2);
    let ids: Vec<i64> = clamped.items.iter().map(|post| post.id).collect();
    let expected: Vec<i64> = second.items.iter().map(|post| post.id).collect();
    assert_eq!(ids, expected);
}

#[sqlx::test(migrations = "./migrations")]
async fn page_count_rounds_up(pool: SqlitePool) {
    let app = app(pool).await;
    let author = create_user(&app.repos, "leo").await;

    let empty = app.state.feed.list_index(page(1)).await.expect("empty");
    assert!(empty.items.is_empty());
    assert_eq!(empty.window.total_pages, 1);

    for n in 1..=21 {
        create_post(&app.repos, &author, &format!("p{n}"), None).await;
    }
    let listing = app.state.feed.list_index(page(1)).await.expect("listing");
    assert_eq!(listing.window.total_pages, 3);
    assert_eq!(listing.window.total_items, 21);

    let last = app.state.feed.list_index(page(3)).await.expect("last");
    assert_eq!(last.items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn group_listing_contains_only_that_group(pool: SqlitePool) {
    let app = app(pool).await;
    let author = create_user(&app.repos, "leo").await;
    let cats = create_group(&app.repos, "Cats", "cats").await;
    let dogs = create_group(&app.repos, "Dogs", "dogs").await;

    let in_cats = create_post(&app.repos, &author, "meow", Some(&cats)).await;
    create_post(&app.repos, &author, "woof", Some(&dogs)).await;
    create_post(&app.repos, &author, "no group", None).await;

    let feed = app
        .state
        .feed
        .list_by_group("cats", page(1))
        .await
        .expect("cats feed");
    assert_eq!(feed.group.id, cats.id);
    assert_eq!(feed.page.items.len(), 1);
    assert_eq!(feed.page.items[0].id, in_cats.id);
    assert_eq!(feed.page.items[0].group_slug.as_deref(), Some("cats"));

    let response = app.get("/group/cats/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("meow"));
    assert!(!html.contains("woof"));
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_group_and_author_render_not_found(pool: SqlitePool) {
    let app = app(pool).await;

    assert_eq!(
        app.get("/group/missing/", None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/profile/nobody/", None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/posts/999/", None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get("/no/such/page/", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn profile_lists_author_posts_with_count(pool: SqlitePool) {
    let app = app(pool).await;
    let leo = create_user(&app.repos, "leo").await;
    let ann = create_user(&app.repos, "ann").await;
    for n in 1..=12 {
        create_post(&app.repos, &leo, &format!("leo says {n}"), None).await;
    }
    create_post(&app.repos, &ann, "ann says hi", None).await;

    let feed = app
        .state
        .feed
        .list_by_author("leo", page(2), Some(ann.id))
        .await
        .expect("profile");
    assert_eq!(feed.page.window.total_items, 12);
    assert_eq!(feed.page.items.len(), 2);
    assert!(feed.page.items.iter().all(|post| post.author_id == leo.id));
    assert!(!feed.following);
    assert!(!feed.is_own_profile);

    let response = app.get("/profile/leo/?page=9", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("leo says 2"));
    assert!(!html.contains("leo says 12"));
    assert!(!html.contains("ann says hi"));
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_page_parameter_falls_back_to_first_page(pool: SqlitePool) {
    let app = app(pool).await;
    let author = create_user(&app.repos, "leo").await;
    for n in 1..=11 {
        create_post(&app.repos, &author, &format!("entry{n:02}"), None).await;
    }

    for query in ["?page=abc", "?page=-4", "?page=0"] {
        let response = app.get(&format!("/profile/leo/{query}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("entry11"), "query {query}");
        assert!(!html.contains("entry01"), "query {query}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn post_detail_shows_comments_oldest_first(pool: SqlitePool) {
    let app = app(pool).await;
    let author = create_user(&app.repos, "leo").await;
    let post = create_post(&app.repos, &author, "discuss", None).await;

    for text in ["first reply", "second reply", "third reply"] {
        app.state
            .posts
            .add_comment(author.id, post.id, text)
            .await
            .expect("comment");
    }

    let detail = app.state.feed.post_detail(post.id).await.expect("detail");
    let texts: Vec<&str> = detail
        .comments
        .iter()
        .map(|comment| comment.text.as_str())
        .collect();
    assert_eq!(texts, ["first reply", "second reply", "third reply"]);
    assert_eq!(detail.author_post_count, 1);

    let html = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    let first = html.find("first reply").expect("first comment rendered");
    let third = html.find("third reply").expect("third comment rendered");
    assert!(first < third);
}
