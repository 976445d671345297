//! Paged list consumption.
//!
//! List endpoints return one page per call as `{list, page, rows, total}`.
//! A single call never advances; [`collect_pages`] walks the cursor for
//! callers that want more than one page.

use crate::error::TerraError;
use crate::types::ListQuery;
use serde::Deserialize;
use std::future::Future;
use tracing::debug;

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    /// Page number, 1-based.
    #[serde(default)]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub rows: u32,
    /// Total number of items across all pages.
    #[serde(default)]
    pub total: u64,
}

impl<T> Page<T> {
    /// Cursor describing this page.
    pub fn cursor(&self) -> PaginationCursor {
        PaginationCursor {
            page: self.page,
            rows: self.rows,
            total: self.total,
        }
    }

    /// Returns true if another page follows.
    pub fn has_more(&self) -> bool {
        self.cursor().next_page().is_some()
    }
}

/// Position within a paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Current page, 1-based.
    pub page: u32,
    /// Page size.
    pub rows: u32,
    /// Total number of items.
    pub total: u64,
}

impl PaginationCursor {
    /// Returns true once `page * rows` covers `total`.
    pub fn is_exhausted(&self) -> bool {
        self.rows == 0 || u64::from(self.page) * u64::from(self.rows) >= self.total
    }

    /// Number of the following page, if any.
    pub fn next_page(&self) -> Option<u32> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.page + 1)
        }
    }
}

/// Fetch pages sequentially until all are consumed or `limit` items are
/// collected.
///
/// Starts at the query's page (or 1). An empty page ends the walk even if
/// `total` claims more.
pub async fn collect_pages<T, Q, F, Fut>(
    mut query: Q,
    limit: Option<usize>,
    fetch: F,
) -> Result<Vec<T>, TerraError>
where
    Q: ListQuery,
    F: Fn(Q) -> Fut,
    Fut: Future<Output = Result<Page<T>, TerraError>>,
{
    let mut items = Vec::new();
    let mut page_number = query.current_page().unwrap_or(1);

    loop {
        query.set_page(page_number);
        let page = fetch(query.clone()).await?;
        let cursor = page.cursor();
        let received = page.list.len();
        items.extend(page.list);

        debug!(
            page = cursor.page,
            rows = cursor.rows,
            total = cursor.total,
            received = received,
            "Fetched page"
        );

        if let Some(limit) = limit {
            if items.len() >= limit {
                items.truncate(limit);
                break;
            }
        }

        match cursor.next_page() {
            Some(next) if received > 0 => page_number = next,
            _ => break,
        }
    }

    Ok(items)
}
