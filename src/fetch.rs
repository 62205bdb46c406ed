//! Full-table scans in fixed windows.

use tracing::debug;

use crate::error::EngineError;
use crate::store::{Record, Store};

/// Default window size, the store's own cap on a single response.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Walks a table with `query_range` until a page comes back empty.
///
/// A short page is not taken as the end: stores may cap responses below the
/// requested window, so only an empty page proves exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginatedFetcher {
    page_size: usize,
}

impl Default for PaginatedFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginatedFetcher {
    /// A zero page size is bumped to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Every row of `table`. Any failing page aborts the scan.
    pub async fn fetch_all<S: Store>(&self, store: &S, table: &str) -> Result<Vec<Record>, EngineError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .query_range(table, offset, self.page_size)
                .await
                .map_err(EngineError::read)?;
            if page.is_empty() {
                break;
            }
            debug!(table, offset, rows = page.len(), "page fetched");
            offset += page.len();
            rows.extend(page);
        }
        Ok(rows)
    }
}
