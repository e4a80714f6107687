//! Lazy cursors over index keys.
//!
//! Both cursor variants produce a forward-only, non-restartable sequence of
//! matching rows over a single consistent snapshot. Rows are synthesized
//! from keys; the full row is fetched from primary storage only when first
//! asked for, so skip-scans never pay for materialization.

use crate::descriptor::IndexDescriptor;
use crate::error::{IndexError, IndexResult};
use crate::key::IndexKey;
use crate::map::{RowStore, TransactionMap};
use crate::row::Row;
use crate::types::{CancelToken, RowId};
use std::cmp::Ordering;
use std::sync::Arc;

/// How many rows a scan processes between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 128;

/// A lazy, forward-only cursor over matching rows.
///
/// `advance` positions the cursor on the next row and returns false once the
/// sequence is exhausted; a terminated cursor never yields again.
pub trait Cursor: Send {
    /// Moves to the next matching row. Returns false at the end.
    fn advance(&mut self) -> IndexResult<bool>;

    /// Returns the current partial row decoded from the index key.
    fn search_row(&self) -> Option<&Row>;

    /// Returns the current full row, fetching it from primary storage on
    /// first access. `None` when the cursor is unpositioned or the row has
    /// vanished from primary storage.
    fn row(&mut self) -> IndexResult<Option<Row>>;
}

/// Current cursor position with deferred full-row materialization.
struct Position {
    search: Row,
    full: Option<Row>,
    fetched: bool,
}

impl Position {
    fn new(search: Row) -> Self {
        Self {
            search,
            full: None,
            fetched: false,
        }
    }

    fn full_row(&mut self, rows: &dyn RowStore) -> IndexResult<Option<Row>> {
        if !self.fetched {
            self.full = rows.fetch_row(self.search.id())?;
            self.fetched = true;
        }
        Ok(self.full.clone())
    }
}

/// Shared cancellation bookkeeping for scans.
struct ScanBudget {
    cancel: Option<CancelToken>,
    scanned: usize,
}

impl ScanBudget {
    fn new(cancel: Option<CancelToken>) -> Self {
        Self { cancel, scanned: 0 }
    }

    fn check(&mut self) -> IndexResult<()> {
        if self.scanned % CANCEL_CHECK_INTERVAL == 0 {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    return Err(IndexError::Cancelled);
                }
            }
        }
        self.scanned += 1;
        Ok(())
    }
}

/// Cursor over a key range.
///
/// Wraps a map key-iterator seeded at the lower bound; the optional upper
/// bound is compared by indexed-column order (the trailing row ID breaks no
/// ties here, matching how bounds cover whole duplicate groups).
pub struct RangeCursor {
    descriptor: Arc<IndexDescriptor>,
    rows: Arc<dyn RowStore>,
    iter: Box<dyn Iterator<Item = IndexKey> + Send>,
    last: Option<Row>,
    position: Option<Position>,
    budget: ScanBudget,
    done: bool,
}

impl RangeCursor {
    /// Creates a cursor over `iter`, terminating past `last` if set.
    pub fn new(
        descriptor: Arc<IndexDescriptor>,
        rows: Arc<dyn RowStore>,
        iter: Box<dyn Iterator<Item = IndexKey> + Send>,
        last: Option<Row>,
        cancel: Option<CancelToken>,
    ) -> Self {
        Self {
            descriptor,
            rows,
            iter,
            last,
            position: None,
            budget: ScanBudget::new(cancel),
            done: false,
        }
    }

    /// Creates a cursor over a fixed key list (used for extremal lookups).
    pub fn from_keys(
        descriptor: Arc<IndexDescriptor>,
        rows: Arc<dyn RowStore>,
        keys: Vec<IndexKey>,
    ) -> Self {
        Self::new(descriptor, rows, Box::new(keys.into_iter()), None, None)
    }
}

impl Cursor for RangeCursor {
    fn advance(&mut self) -> IndexResult<bool> {
        if self.done {
            return Ok(false);
        }
        self.budget.check().inspect_err(|_| {
            self.done = true;
            self.position = None;
        })?;
        let Some(key) = self.iter.next() else {
            self.done = true;
            self.position = None;
            return Ok(false);
        };
        let search = self.descriptor.row_from_key(&key)?;
        if let Some(last) = &self.last {
            if self.descriptor.compare_rows(&search, last) == Ordering::Greater {
                self.done = true;
                self.position = None;
                return Ok(false);
            }
        }
        self.position = Some(Position::new(search));
        Ok(true)
    }

    fn search_row(&self) -> Option<&Row> {
        self.position.as_ref().map(|p| &p.search)
    }

    fn row(&mut self) -> IndexResult<Option<Row>> {
        match &mut self.position {
            Some(position) => position.full_row(self.rows.as_ref()),
            None => Ok(None),
        }
    }
}

/// Cursor yielding one row per distinct indexed-column combination.
///
/// Each step probes the map for the key strictly greater than a ceiling key:
/// the previous group's column values with the trailing row ID forced to the
/// maximum sentinel. One logarithmic probe skips a whole duplicate group.
pub struct DistinctCursor {
    descriptor: Arc<IndexDescriptor>,
    rows: Arc<dyn RowStore>,
    map: Arc<dyn TransactionMap>,
    ceiling: Option<IndexKey>,
    position: Option<Position>,
    budget: ScanBudget,
    done: bool,
}

impl DistinctCursor {
    /// Creates a distinct cursor over the map's whole key space.
    pub fn new(
        descriptor: Arc<IndexDescriptor>,
        rows: Arc<dyn RowStore>,
        map: Arc<dyn TransactionMap>,
        cancel: Option<CancelToken>,
    ) -> Self {
        Self {
            descriptor,
            rows,
            map,
            ceiling: None,
            position: None,
            budget: ScanBudget::new(cancel),
            done: false,
        }
    }
}

impl Cursor for DistinctCursor {
    fn advance(&mut self) -> IndexResult<bool> {
        if self.done {
            return Ok(false);
        }
        self.budget.check().inspect_err(|_| {
            self.done = true;
            self.position = None;
        })?;
        let next = match &self.ceiling {
            None => self.map.first_key(),
            Some(ceiling) => self.map.higher_key(ceiling),
        };
        let Some(key) = next else {
            self.done = true;
            self.position = None;
            return Ok(false);
        };
        self.ceiling = Some(key.with_row_id(RowId::MAX));
        self.position = Some(Position::new(self.descriptor.row_from_key(&key)?));
        Ok(true)
    }

    fn search_row(&self) -> Option<&Row> {
        self.position.as_ref().map(|p| &p.search)
    }

    fn row(&mut self) -> IndexResult<Option<Row>> {
        match &mut self.position {
            Some(position) => position.full_row(self.rows.as_ref()),
            None => Ok(None),
        }
    }
}

/// A cursor over nothing.
pub struct EmptyCursor;

impl Cursor for EmptyCursor {
    fn advance(&mut self) -> IndexResult<bool> {
        Ok(false)
    }

    fn search_row(&self) -> Option<&Row> {
        None
    }

    fn row(&mut self) -> IndexResult<Option<Row>> {
        Ok(None)
    }
}
