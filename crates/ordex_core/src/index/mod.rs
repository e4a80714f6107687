//! Secondary index engine: mutations, cursors and bulk loading.

mod bulk;
mod cursor;
mod secondary;

pub use cursor::{Cursor, DistinctCursor, EmptyCursor, RangeCursor};
pub use secondary::{ColumnPredicate, SecondaryIndex};
