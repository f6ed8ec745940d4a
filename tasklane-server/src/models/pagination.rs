//! Pagination types for list endpoints

use serde::Serialize;

/// Default page number
pub const DEFAULT_PAGE: u32 = 1;

/// Default items per page
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page
    pub per_page: u32,
}

impl PageRequest {
    /// Create pagination, falling back to the defaults for values below 1.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: if page < 1 { DEFAULT_PAGE } else { page },
            per_page: if per_page < 1 { DEFAULT_PER_PAGE } else { per_page },
        }
    }

    /// Parse raw query-string values.
    ///
    /// Anything missing, unparsable or below 1 silently becomes the default;
    /// list requests are never rejected over pagination.
    pub fn from_query(page: Option<&str>, per_page: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            per_page: parse_positive(per_page).unwrap_or(DEFAULT_PER_PAGE),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n >= 1)
}

/// Pagination block of the list envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

impl PaginationMeta {
    /// Meta for `total_items` matches; zero items always means zero pages.
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total_pages: total_pages(total_items, request.per_page),
            total_items,
        }
    }

    /// Meta reported when the requested page came back empty.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(request, 0)
    }
}

/// Ceiling division of `total_items` by `per_page`.
pub fn total_pages(total_items: u64, per_page: u32) -> u64 {
    if total_items == 0 || per_page == 0 {
        return 0;
    }
    total_items.div_ceil(u64::from(per_page))
}

/// One page of records plus its meta
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
