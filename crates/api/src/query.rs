//! Query parameter types for API handlers.

use serde::Deserialize;

use satellite_core::backfill::DEFAULT_PAGE_SIZE;

/// Backfill paging (`?pageSize=`). Defaults to [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Deserialize)]
pub struct BackfillParams {
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
