//! Index page cache middleware.
//!
//! Serves GET requests for the index listing from [`PageCache`] and stores
//! successful responses on a miss. Must run inside the session middleware so
//! the viewer is known.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use crate::application::auth::CurrentUser;

use super::{
    CacheConfig, PageCache,
    keys::{IndexPageKey, RenderedIndexPage},
    store::CachedResponse,
};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub pages: Arc<PageCache>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let pages = Arc::new(PageCache::new(&config));
        Self { config, pages }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn index_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let viewer = request
        .extensions()
        .get::<CurrentUser>()
        .map(CurrentUser::id);
    let requested = IndexPageKey::from_query(request.uri().query(), viewer);
    let key = match cache.pages.last_page() {
        Some(last_page) => requested.clamped_to(last_page),
        None => requested,
    };

    if let Some(cached) = cache.pages.get(&key) {
        debug!(cache = "index", outcome = "hit", %key, "serving cached page");
        return build_response(cached);
    }

    debug!(cache = "index", outcome = "miss", %key, "rendering page");
    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let key = match response.extensions().get::<RenderedIndexPage>() {
        Some(rendered) => {
            cache.pages.record_last_page(rendered.last_page);
            IndexPageKey::new(rendered.page, viewer)
        }
        None => key,
    };

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "index", %key, error = %err, "failed to buffer page body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter(|(name, _)| *name != SET_COOKIE)
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.pages.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
