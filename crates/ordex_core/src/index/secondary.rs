//! The secondary index engine.
//!
//! A [`SecondaryIndex`] is stateless across calls: all state lives in the
//! injected transactional map and the caller's transaction context. Add and
//! remove never block a worker thread; their outcomes arrive through
//! completion futures, because a single logical insert drives the primary
//! and every secondary index concurrently and none may wait on the others.

use crate::descriptor::IndexDescriptor;
use crate::error::{IndexError, IndexResult};
use crate::future::{completion, OpFuture};
use crate::index::cursor::{Cursor, DistinctCursor, EmptyCursor, RangeCursor};
use crate::map::{RowStore, TransactionMap, TransactionStore};
use crate::row::Row;
use crate::types::{CancelToken, ColumnId, MutationStatus, TransactionId};
use crate::value::Value;
use std::sync::Arc;
use tracing::debug;

/// Fixed cost offset so tiny indexes never look free to the planner.
const COST_ROW_OFFSET: f64 = 1000.0;

/// Predicate shape the planner holds against one indexed column, in index
/// column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPredicate {
    /// No usable predicate.
    None,
    /// Equality comparison.
    Equality,
    /// Range bound (either or both ends).
    Range,
}

/// A transactional secondary index over an injected MVCC sorted map.
pub struct SecondaryIndex {
    descriptor: Arc<IndexDescriptor>,
    store: Arc<dyn TransactionStore>,
    rows: Arc<dyn RowStore>,
    map: Arc<dyn TransactionMap>,
}

impl SecondaryIndex {
    /// Opens the index, creating its backing map if needed.
    pub fn open(
        store: Arc<dyn TransactionStore>,
        rows: Arc<dyn RowStore>,
        descriptor: IndexDescriptor,
    ) -> IndexResult<Self> {
        let map = store.open_map(descriptor.name(), descriptor.comparator())?;
        debug!(index = descriptor.name(), unique = descriptor.is_unique(), "index opened");
        Ok(Self {
            descriptor: Arc::new(descriptor),
            store,
            rows,
            map,
        })
    }

    /// Returns the index descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    pub(crate) fn descriptor_arc(&self) -> Arc<IndexDescriptor> {
        Arc::clone(&self.descriptor)
    }

    pub(crate) fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    pub(crate) fn base_map(&self) -> &Arc<dyn TransactionMap> {
        &self.map
    }

    /// Returns the map scoped to `txn`, or the base committed view.
    fn map_for(&self, txn: Option<TransactionId>) -> Arc<dyn TransactionMap> {
        match txn {
            Some(txn) => self.map.view(txn),
            None => Arc::clone(&self.map),
        }
    }

    /// Adds a row to the index.
    ///
    /// Completes asynchronously. A present key resolves the future with
    /// [`IndexError::DuplicateKey`] carrying the rendered key. For a unique
    /// index the map's key identity already collapses non-null prefix
    /// duplicates, so a concurrent transaction's uncommitted insert of the
    /// same value collides here too, inside the map's own conflict
    /// bookkeeping. The same logical duplicate may simultaneously be
    /// reported by the primary index, and detecting it on either side is
    /// correct.
    pub fn add(&self, txn: Option<TransactionId>, row: &Row) -> OpFuture<MutationStatus> {
        let key = match self.descriptor.key_for_row(row) {
            Ok(key) => key,
            Err(e) => return OpFuture::failed(e),
        };
        let rendered = key.to_string();
        let (promise, future) = completion();
        self.map_for(txn)
            .insert_if_absent(key)
            .forward_into(promise, move |result| match result {
                Ok(status) => Ok(status),
                Err(IndexError::StorageClosed) => Err(IndexError::StorageClosed),
                Err(_) => Err(IndexError::duplicate_key(rendered)),
            });
        future
    }

    /// Updates a row.
    ///
    /// Instant success unless a changed column participates in this index;
    /// otherwise degrades to remove(old) followed by add(new), chained
    /// through the completion future.
    pub fn update(
        &self,
        txn: Option<TransactionId>,
        old_row: &Row,
        new_row: &Row,
        changed_columns: &[ColumnId],
        locked_by_self: bool,
    ) -> OpFuture<MutationStatus> {
        if !changed_columns
            .iter()
            .any(|c| self.descriptor.contains_column(*c))
        {
            return OpFuture::succeeded(MutationStatus::Complete);
        }
        let new_key = match self.descriptor.key_for_row(new_row) {
            Ok(key) => key,
            Err(e) => return OpFuture::failed(e),
        };
        let rendered = new_key.to_string();
        let view = self.map_for(txn);
        let (promise, future) = completion();
        self.remove(txn, old_row, locked_by_self)
            .on_complete(move |removed| match removed {
                Ok(_) => {
                    view.insert_if_absent(new_key)
                        .forward_into(promise, move |result| match result {
                            Ok(status) => Ok(status),
                            Err(IndexError::StorageClosed) => Err(IndexError::StorageClosed),
                            Err(_) => Err(IndexError::duplicate_key(rendered)),
                        });
                }
                Err(e) => promise.fail(e.clone()),
            });
        future
    }

    /// Removes a row from the index.
    ///
    /// When the entry is locked by a different transaction and the caller
    /// does not hold the row's lock, the returned future stays pending until
    /// the lock holder's transaction resolves; the map layer then retries
    /// the removal. Otherwise the removal is attempted directly and the
    /// result reflects whether it actually happened.
    pub fn remove(
        &self,
        txn: Option<TransactionId>,
        row: &Row,
        locked_by_self: bool,
    ) -> OpFuture<MutationStatus> {
        let key = match self.descriptor.key_for_row(row) {
            Ok(key) => key,
            Err(e) => return OpFuture::failed(e),
        };
        let view = self.map_for(txn);
        match view.version_descriptor(&key) {
            Some(descriptor) if !locked_by_self && view.is_locked(&descriptor) => {
                view.wait_for_lock(&key, &descriptor)
            }
            Some(descriptor) => {
                OpFuture::ready(view.try_remove(&key, Some(descriptor), locked_by_self))
            }
            None => OpFuture::ready(view.try_remove(&key, None, locked_by_self)),
        }
    }

    /// Opens a range cursor over `[first, last]` (both bounds optional and
    /// inclusive). The lower bound's trailing row ID is forced to the
    /// minimum sentinel so every duplicate of the bound prefix is included.
    pub fn find(
        &self,
        txn: Option<TransactionId>,
        first: Option<&Row>,
        last: Option<&Row>,
        cancel: Option<CancelToken>,
    ) -> IndexResult<Box<dyn Cursor>> {
        let view = self.map_for(txn);
        let lower = match first {
            Some(row) => Some(self.descriptor.lower_bound(row)?),
            None => None,
        };
        let iter = view.key_iterator(lower.as_ref(), true);
        Ok(Box::new(RangeCursor::new(
            Arc::clone(&self.descriptor),
            Arc::clone(&self.rows),
            iter,
            last.cloned(),
            cancel,
        )))
    }

    /// Returns a one-row cursor over the minimal (`first = true`) or maximal
    /// key, skipping leading-NULL bookkeeping keys. Empty cursor when no
    /// real key exists.
    pub fn find_first_or_last(
        &self,
        txn: Option<TransactionId>,
        first: bool,
    ) -> IndexResult<Box<dyn Cursor>> {
        let view = self.map_for(txn);
        let mut key = if first {
            view.first_key()
        } else {
            view.last_key()
        };
        loop {
            let Some(candidate) = key else {
                return Ok(Box::new(EmptyCursor));
            };
            let leading_null = candidate
                .column_values()
                .first()
                .is_some_and(Value::is_null);
            if !leading_null {
                return Ok(Box::new(RangeCursor::from_keys(
                    Arc::clone(&self.descriptor),
                    Arc::clone(&self.rows),
                    vec![candidate],
                )));
            }
            key = if first {
                view.higher_key(&candidate)
            } else {
                view.lower_key(&candidate)
            };
        }
    }

    /// Opens a cursor yielding one row per distinct indexed-column
    /// combination.
    pub fn find_distinct(
        &self,
        txn: Option<TransactionId>,
        cancel: Option<CancelToken>,
    ) -> Box<dyn Cursor> {
        Box::new(DistinctCursor::new(
            Arc::clone(&self.descriptor),
            Arc::clone(&self.rows),
            self.map_for(txn),
            cancel,
        ))
    }

    /// Estimates the cost of a scan given per-column predicate shapes (in
    /// index column order) and whether the requested sort order matches the
    /// index order. Lower is cheaper.
    pub fn estimated_cost(
        &self,
        predicates: &[ColumnPredicate],
        sort_matches: bool,
    ) -> IndexResult<f64> {
        let rows = self.map.approximate_len()? as f64 + COST_ROW_OFFSET;
        let mut cost = rows;
        for (i, predicate) in self.descriptor.columns().iter().zip(predicates).enumerate() {
            match predicate.1 {
                ColumnPredicate::Equality => {
                    if self.descriptor.is_unique() && i + 1 == self.descriptor.columns().len() {
                        cost = 3.0;
                        break;
                    }
                    cost = (cost / 10.0).max(1.0);
                }
                ColumnPredicate::Range => {
                    cost = (cost / 3.0).max(1.0);
                    break;
                }
                ColumnPredicate::None => break,
            }
        }
        if sort_matches {
            cost *= 0.8;
        }
        Ok(10.0 * (2.0 + cost))
    }

    /// Exact row count within the transaction's view.
    pub fn row_count(&self, txn: Option<TransactionId>) -> IndexResult<u64> {
        self.map_for(txn).len()
    }

    /// Approximate row count, independent of any transaction.
    pub fn row_count_estimate(&self) -> IndexResult<u64> {
        self.map.approximate_len()
    }

    /// Bytes the backing map uses on disk.
    pub fn disk_usage(&self) -> IndexResult<u64> {
        self.map.disk_usage()
    }

    /// Bytes the backing map uses in memory.
    pub fn memory_usage(&self) -> IndexResult<u64> {
        self.map.memory_usage()
    }

    /// Returns true when the index holds no rows and must be rebuilt from
    /// the table.
    pub fn needs_rebuild(&self) -> IndexResult<bool> {
        Ok(self.map.approximate_len()? == 0)
    }

    /// Removes every entry.
    pub fn truncate(&self, txn: Option<TransactionId>) {
        self.map_for(txn).clear();
    }

    /// Drops the index's backing map.
    pub fn drop_index(&self) {
        if !self.map.is_closed() {
            debug!(index = self.descriptor.name(), "dropping index map");
            self.map.drop_map();
        }
    }
}
