//! Listing request parameters as they arrive from a query string.

use serde::Deserialize;

use super::limit::{normalize_limit, overfetch_limit, LimitBounds};
use super::offset::calculate_offset;

/// `?cursor=...&limit=...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CursorQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl CursorQuery {
    /// Page size after normalization.
    pub fn limit(&self, bounds: &LimitBounds) -> u32 {
        normalize_limit(self.limit, bounds)
    }

    /// Rows to request from the data source, one more than the page size.
    pub fn fetch_limit(&self, bounds: &LimitBounds) -> u32 {
        overfetch_limit(self.limit(bounds))
    }

    /// The cursor, ignoring empty strings.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// `?page=...&limit=...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OffsetQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl OffsetQuery {
    /// Requested page, defaulting to 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self, bounds: &LimitBounds) -> u32 {
        normalize_limit(self.limit, bounds)
    }

    pub fn offset(&self, bounds: &LimitBounds) -> u64 {
        calculate_offset(self.page(), self.limit(bounds))
    }
}
