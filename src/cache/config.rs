//! Page cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_INDEX_TTL_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve the index listing from the page cache.
    pub enabled: bool,
    /// Lifetime of a cached index page.
    pub index_ttl_seconds: u64,
    /// Maximum number of cached index pages across all viewers.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_ttl_seconds: DEFAULT_INDEX_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            index_ttl_seconds: settings.index_ttl.as_secs(),
            max_entries: settings.max_entries.get(),
        }
    }
}

impl CacheConfig {
    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_seconds)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
