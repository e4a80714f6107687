//! Contract of the injected transactional map.
//!
//! The index engine does not implement MVCC storage. It consumes an
//! externally supplied sorted map with snapshot isolation, per-transaction
//! views and lock bookkeeping, expressed by the traits here. Within one
//! transaction's view, reads observe that transaction's own uncommitted
//! writes plus everything committed before its snapshot was taken.

use crate::error::IndexResult;
use crate::future::OpFuture;
use crate::key::{IndexKey, KeyComparator};
use crate::row::Row;
use crate::types::{MutationStatus, RowId, TransactionId};
use crate::value::Value;
use std::any::Any;
use std::sync::Arc;

/// Opaque per-entry version bookkeeping handle.
///
/// The engine never inspects it; it only passes it back into
/// [`TransactionMap::is_locked`], [`TransactionMap::wait_for_lock`] and
/// [`TransactionMap::try_remove`]. Map implementations downcast.
pub type VersionDescriptor = Arc<dyn Any + Send + Sync>;

/// A sorted MVCC map scoped to (at most) one transaction.
///
/// The base map obtained from [`TransactionStore::open_map`] reads committed
/// state; [`TransactionMap::view`] scopes it to a transaction so reads
/// include that transaction's own uncommitted writes.
pub trait TransactionMap: Send + Sync {
    /// Returns the map's name.
    fn name(&self) -> &str;

    /// Returns a view of the same map scoped to the given transaction.
    fn view(&self, txn: TransactionId) -> Arc<dyn TransactionMap>;

    /// Inserts the key unless it is already present.
    ///
    /// Completes asynchronously; the future fails when the key exists,
    /// whether from this view's own transaction or a concurrently committing
    /// one. The stored value is the unit placeholder.
    fn insert_if_absent(&self, key: IndexKey) -> OpFuture<MutationStatus>;

    /// Returns the stored value for a visible key.
    fn get(&self, key: &IndexKey) -> Option<Value>;

    /// Returns the version descriptor of the key's current entry, if any.
    fn version_descriptor(&self, key: &IndexKey) -> Option<VersionDescriptor>;

    /// Returns true if the entry is locked by a transaction other than this
    /// view's own.
    fn is_locked(&self, descriptor: &VersionDescriptor) -> bool;

    /// Registers a waiting removal against a locked entry.
    ///
    /// The future stays pending until the lock holder's transaction
    /// resolves; the map layer then retries the removal and completes the
    /// future with the retried outcome.
    fn wait_for_lock(&self, key: &IndexKey, descriptor: &VersionDescriptor)
        -> OpFuture<MutationStatus>;

    /// Attempts a direct removal.
    ///
    /// Returns [`MutationStatus::AlreadyAbsent`] when the target was
    /// concurrently removed already.
    fn try_remove(
        &self,
        key: &IndexKey,
        descriptor: Option<VersionDescriptor>,
        own_lock: bool,
    ) -> IndexResult<MutationStatus>;

    /// Unconditional committed write, bypassing conflict bookkeeping.
    ///
    /// Bulk-load path only; never used during normal transaction isolation.
    fn put_committed(&self, key: IndexKey);

    /// Returns the smallest visible key.
    fn first_key(&self) -> Option<IndexKey>;

    /// Returns the largest visible key.
    fn last_key(&self) -> Option<IndexKey>;

    /// Returns the smallest visible key strictly greater than `key`.
    fn higher_key(&self, key: &IndexKey) -> Option<IndexKey>;

    /// Returns the largest visible key strictly less than `key`.
    fn lower_key(&self, key: &IndexKey) -> Option<IndexKey>;

    /// Returns a lazy sequence of visible keys starting at `from`.
    ///
    /// `None` starts at the beginning. The sequence observes one consistent
    /// snapshot for its whole lifetime.
    fn key_iterator(
        &self,
        from: Option<&IndexKey>,
        inclusive: bool,
    ) -> Box<dyn Iterator<Item = IndexKey> + Send>;

    /// Exact visible entry count.
    fn len(&self) -> IndexResult<u64>;

    /// Approximate entry count, cheap and independent of any snapshot.
    ///
    /// Fails with [`crate::IndexError::StorageClosed`] when the map has been
    /// closed concurrently.
    fn approximate_len(&self) -> IndexResult<u64>;

    /// Bytes used on disk.
    fn disk_usage(&self) -> IndexResult<u64>;

    /// Bytes used in memory.
    fn memory_usage(&self) -> IndexResult<u64>;

    /// Removes all entries.
    fn clear(&self);

    /// Drops the whole map.
    fn drop_map(&self);

    /// Returns true once the map has been closed or dropped.
    fn is_closed(&self) -> bool;
}

/// Factory for transactional maps, keyed by name.
pub trait TransactionStore: Send + Sync {
    /// Opens (or creates) the named map ordered by `comparator`.
    fn open_map(
        &self,
        name: &str,
        comparator: KeyComparator,
    ) -> IndexResult<Arc<dyn TransactionMap>>;
}

/// Primary row storage, consulted only for lazy full-row materialization.
pub trait RowStore: Send + Sync {
    /// Fetches the full row for a locator, `None` if it no longer exists.
    fn fetch_row(&self, id: RowId) -> IndexResult<Option<Row>>;
}
