//! Pagination metadata and fetched pages.

use serde::{Deserialize, Serialize};

/// `meta.pagination` of a CMS collection response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u32,
}

impl Pagination {
    /// True when `page` is the last page (or past it).
    pub fn is_last_page(&self) -> bool {
        self.page >= self.page_count
    }

    /// The page after this one, if there is one.
    pub fn next_page(&self) -> Option<u32> {
        (!self.is_last_page()).then_some(self.page + 1)
    }
}

/// Result of one load: the data plus pagination when the response carried it.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded<T> {
    pub data: T,
    pub pagination: Option<Pagination>,
}

impl<T> Loaded<T> {
    /// A load without pagination metadata.
    pub fn unpaged(data: T) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        Loaded {
            data: f(self.data),
            pagination: self.pagination,
        }
    }
}
