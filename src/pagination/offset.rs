//! Offset-style pages backed by a total row count.

use serde::Serialize;

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u64,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_more: bool,
    pub has_previous: bool,
}

impl<T> OffsetPage<T> {
    /// Convert each item, keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> OffsetPage<U>
    where
        F: FnMut(T) -> U,
    {
        OffsetPage {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_count: self.total_count,
            total_pages: self.total_pages,
            has_more: self.has_more,
            has_previous: self.has_previous,
        }
    }
}

/// Rows to skip to reach `page`. Pages below 1 are treated as page 1.
pub fn calculate_offset(page: i64, limit: u32) -> u64 {
    clamp_page(page)
        .saturating_sub(1)
        .saturating_mul(u64::from(limit))
}

/// Wrap one page of rows with its position in the full result set.
///
/// Pages below 1 are reported as page 1 and a `limit` of zero as one.
pub fn build_offset_page<T>(items: Vec<T>, page: i64, limit: u32, total_count: u64) -> OffsetPage<T> {
    let page = clamp_page(page);
    let limit = limit.max(1);
    let total_pages = total_count.div_ceil(u64::from(limit));

    OffsetPage {
        items,
        page,
        limit,
        total_count,
        total_pages,
        has_more: page < total_pages,
        has_previous: page > 1,
    }
}

fn clamp_page(page: i64) -> u64 {
    u64::try_from(page.max(1)).unwrap_or(1)
}
