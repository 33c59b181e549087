//! Page cache for the index listing.
//!
//! Rendered index pages are stored under the `index_page` key prefix, one
//! entry per rendered page number and viewer. Requests past the last page
//! share the entry of the page they clamp to. Entries expire after
//! `cache.index_ttl_seconds` or when [`PageCache::clear`] is called; creating,
//! editing or deleting posts does not touch them.
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! max_entries = 64
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{INDEX_PAGE_PREFIX, IndexPageKey, RenderedIndexPage};
pub use middleware::{CacheState, index_cache_layer};
pub use store::{
    CachedResponse, METRIC_INDEX_CACHE_EXPIRED, METRIC_INDEX_CACHE_HIT, METRIC_INDEX_CACHE_MISS,
    PageCache,
};
