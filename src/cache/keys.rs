//! Page cache keys.

use std::fmt;

use crate::application::pagination::{PageNumber, PageWindow};

/// Fixed prefix every index page entry is stored under.
pub const INDEX_PAGE_PREFIX: &str = "index_page";

/// One rendered index page. The page chrome differs per signed-in user, so
/// the viewer is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexPageKey {
    pub page: PageNumber,
    pub viewer: Option<i64>,
}

impl IndexPageKey {
    pub fn new(page: PageNumber, viewer: Option<i64>) -> Self {
        Self { page, viewer }
    }

    /// Key for a raw request query string, using the same `page` parsing as
    /// the listing handlers.
    pub fn from_query(query: Option<&str>, viewer: Option<i64>) -> Self {
        let raw = query.and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == "page")
                .map(|(_, value)| value.into_owned())
        });
        Self::new(PageNumber::from_query(raw.as_deref()), viewer)
    }

    /// Same key with the page clamped to `last_page`, so out-of-range requests
    /// share the entry of the page they render.
    pub fn clamped_to(self, last_page: PageNumber) -> Self {
        Self {
            page: self.page.min(last_page),
            ..self
        }
    }
}

/// Page an index response actually rendered after clamping. The handler puts
/// it in the response extensions; the cache stores the entry under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedIndexPage {
    pub page: PageNumber,
    pub last_page: PageNumber,
}

impl RenderedIndexPage {
    pub fn from_window(window: &PageWindow) -> Self {
        Self {
            page: PageNumber::new(window.number).unwrap_or_default(),
            last_page: PageNumber::new(window.total_pages).unwrap_or_default(),
        }
    }
}

impl fmt::Display for IndexPageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INDEX_PAGE_PREFIX}:page={}", self.page.get())?;
        match self.viewer {
            Some(id) => write!(f, ":viewer={id}"),
            None => f.write_str(":viewer=anon"),
        }
    }
}
