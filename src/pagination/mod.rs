//! Pure pagination math.
//!
//! Nothing here touches a data source. Callers fetch rows themselves (either
//! `limit + 1` rows for cursor pages or a page plus a total count for offset
//! pages) and hand them over to be shaped into a uniform envelope.

mod cursor;
mod limit;
mod offset;
mod query;

pub use cursor::{build_cursor_page, CursorPage};
pub use limit::{normalize_limit, overfetch_limit, LimitBounds};
pub use offset::{build_offset_page, calculate_offset, OffsetPage};
pub use query::{CursorQuery, OffsetQuery};
