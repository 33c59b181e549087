//! In-memory store for rendered index pages.
//!
//! Entries are never invalidated by writes: a cached page keeps serving the
//! bytes it was stored with until its TTL runs out or [`PageCache::clear`] is
//! called.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use crate::application::pagination::PageNumber;

use super::config::CacheConfig;
use super::keys::IndexPageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_INDEX_CACHE_HIT: &str = "yatube_index_cache_hit_total";
pub const METRIC_INDEX_CACHE_MISS: &str = "yatube_index_cache_miss_total";
pub const METRIC_INDEX_CACHE_EXPIRED: &str = "yatube_index_cache_expired_total";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

pub struct PageCache {
    ttl: Duration,
    entries: RwLock<LruCache<IndexPageKey, Entry>>,
    /// Last index page seen on a render; 0 until the first one.
    last_page: AtomicU32,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.index_ttl(),
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
            last_page: AtomicU32::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A live entry for `key`. Expired entries are dropped and reported as misses.
    pub fn get(&self, key: &IndexPageKey) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                counter!(METRIC_INDEX_CACHE_HIT).increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!(METRIC_INDEX_CACHE_EXPIRED).increment(1);
            debug!(%key, "index page entry expired");
        }
        counter!(METRIC_INDEX_CACHE_MISS).increment(1);
        None
    }

    pub fn set(&self, key: IndexPageKey, response: CachedResponse) {
        let entry = Entry {
            response,
            stored_at: Instant::now(),
        };
        if let Some((evicted, _)) = rw_write(&self.entries, SOURCE, "set").push(key, entry)
            && evicted != key
        {
            debug!(%evicted, "index page entry evicted");
        }
    }

    pub fn last_page(&self) -> Option<PageNumber> {
        PageNumber::new(self.last_page.load(Ordering::Relaxed))
    }

    pub fn record_last_page(&self, last_page: PageNumber) {
        self.last_page.store(last_page.get(), Ordering::Relaxed);
    }

    /// Drop every entry immediately.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.last_page.store(0, Ordering::Relaxed);
        debug!("index page cache cleared");
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
