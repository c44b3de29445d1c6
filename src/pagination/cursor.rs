//! Cursor-style pages built from an overfetched result set.

use serde::Serialize;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    /// Cursor of the last returned item, present only when `has_more`
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<T> CursorPage<T> {
    /// Convert each item, keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> CursorPage<U>
    where
        F: FnMut(T) -> U,
    {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
            total_count: self.total_count,
        }
    }
}

/// Shape up to `limit + 1` rows into a page of at most `limit` items.
///
/// The extra row only signals that another page exists; it is dropped. A
/// `limit` of zero is treated as one.
pub fn build_cursor_page<T, F>(
    mut items: Vec<T>,
    limit: u32,
    cursor_of: F,
    total_count: Option<u64>,
) -> CursorPage<T>
where
    F: Fn(&T) -> String,
{
    let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
    let has_more = items.len() > limit;
    if has_more {
        items.truncate(limit);
    }

    let next_cursor = if has_more {
        items.last().map(|item| cursor_of(item))
    } else {
        None
    };

    CursorPage {
        items,
        next_cursor,
        has_more,
        total_count,
    }
}
