mod common;

use std::{collections::HashSet, time::Duration};

use metrics_util::debugging::DebuggingRecorder;
use sqlx::SqlitePool;
use yatube::{
    cache::{METRIC_INDEX_CACHE_EXPIRED, METRIC_INDEX_CACHE_HIT, METRIC_INDEX_CACHE_MISS},
    config::Settings,
};

use common::{app_with, create_post, create_user};

#[sqlx::test(migrations = "./migrations")]
async fn index_cache_emits_hit_miss_and_expiry_counters(pool: SqlitePool) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let mut settings = Settings::defaults().expect("defaults");
    settings.cache.index_ttl = Duration::from_secs(1);
    let app = app_with(pool, settings);
    let leo = create_user(&app.repos, "leo").await;
    create_post(&app.repos, &leo, "counted", None).await;

    app.get("/", None).await;
    app.get("/", None).await;
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    app.get("/", None).await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        METRIC_INDEX_CACHE_MISS,
        METRIC_INDEX_CACHE_HIT,
        METRIC_INDEX_CACHE_EXPIRED,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
