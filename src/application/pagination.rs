//! Page-number pagination over ordered post listings.
//!
//! Listings are paged with a fixed page size. The requested page comes from
//! an untrusted query parameter, so it is parsed leniently into a
//! [`PageNumber`] and then clamped against the number of available pages
//! by [`PageWindow::resolve`]. Out-of-range requests never fail.

use std::num::NonZeroU32;

use serde::Serialize;

/// Number of posts shown on every listing page.
pub const POSTS_PER_PAGE: u32 = 10;

/// A 1-based page number requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(NonZeroU32::MIN);

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Parse the raw `page` query value. Missing, non-numeric and non-positive
    /// input resolves to the first page.
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(|value| u32::try_from(value).ok())
            .and_then(Self::new)
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Resolved position of one page inside a listing of `total_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub per_page: u32,
}

impl PageWindow {
    /// Clamp `requested` into `1..=total_pages`. An empty listing still has one
    /// (empty) page.
    pub fn resolve(total_items: u64, per_page: NonZeroU32, requested: PageNumber) -> Self {
        let per_page = per_page.get();
        let pages = total_items.div_ceil(u64::from(per_page)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let number = requested.get().min(total_pages);

        Self {
            number,
            total_pages,
            total_items,
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    /// Number of items that belong on this page.
    pub fn len(&self) -> u64 {
        self.total_items
            .saturating_sub(self.offset())
            .min(u64::from(self.per_page))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }
}

/// A fetched page of items together with its window.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}

pub fn posts_per_page() -> NonZeroU32 {
    NonZeroU32::new(POSTS_PER_PAGE).unwrap_or(NonZeroU32::MIN)
}
