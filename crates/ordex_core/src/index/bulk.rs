//! Bulk index building.
//!
//! An out-of-band rebuild runs N parallel workers, each writing one
//! pre-sorted temporary map of encoded keys. The loader merges them into
//! the destination map with an external k-way merge, re-validating
//! uniqueness during the merge, and writes through the committed path since
//! the whole operation runs outside normal transaction isolation.

use crate::error::{IndexError, IndexResult};
use crate::index::secondary::SecondaryIndex;
use crate::key::{IndexKey, KeyComparator};
use crate::map::TransactionMap;
use crate::row::Row;
use crate::types::RowId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One merge input: the front key of a temporary map plus a source ordinal
/// used as tie-break. Scoped to a single bulk-build call.
struct MergeSource {
    key: IndexKey,
    iter: Box<dyn Iterator<Item = IndexKey> + Send>,
    ordinal: usize,
    comparator: KeyComparator,
}

impl PartialEq for MergeSource {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeSource {}

impl PartialOrd for MergeSource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeSource {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ordinal tie-break keeps output deterministic when two sources
        // carry equal keys; correctly partitioned workers never produce
        // that, but it must not crash or drop a key if they do.
        self.comparator
            .compare(&self.key, &other.key)
            .then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

impl SecondaryIndex {
    /// Writes encoded keys for `rows` into the named temporary map.
    ///
    /// Worker-side half of a bulk build; writes are committed directly.
    pub fn buffer_rows(&self, rows: &[Row], buffer_name: &str) -> IndexResult<()> {
        let map = self
            .store()
            .open_map(buffer_name, self.descriptor().comparator())?;
        for row in rows {
            map.put_committed(self.descriptor().key_for_row(row)?);
        }
        Ok(())
    }

    /// Merges the named pre-sorted temporary maps into the index.
    ///
    /// Unique indexes re-validate every merged key against the destination
    /// map (rows holding NULL in any indexed column are exempt). All
    /// temporary maps are dropped on every exit path, success or failure.
    pub fn bulk_load(&self, buffer_names: &[String]) -> IndexResult<()> {
        let result = self.merge_buffers(buffer_names);
        for name in buffer_names {
            match self.store().open_map(name, self.descriptor().comparator()) {
                Ok(map) => map.drop_map(),
                Err(e) => warn!(
                    index = self.descriptor().name(),
                    buffer = name.as_str(),
                    error = %e,
                    "temporary map left behind"
                ),
            }
        }
        if let Err(e) = &result {
            warn!(index = self.descriptor().name(), error = %e, "bulk load failed");
        }
        result
    }

    fn merge_buffers(&self, buffer_names: &[String]) -> IndexResult<()> {
        let comparator = self.descriptor().comparator();
        let destination = Arc::clone(self.base_map());

        let mut heap = BinaryHeap::with_capacity(buffer_names.len());
        for (ordinal, name) in buffer_names.iter().enumerate() {
            let map = self.store().open_map(name, comparator.clone())?;
            let mut iter = map.key_iterator(None, true);
            if let Some(key) = iter.next() {
                heap.push(Reverse(MergeSource {
                    key,
                    iter,
                    ordinal,
                    comparator: comparator.clone(),
                }));
            }
        }
        debug!(
            index = self.descriptor().name(),
            sources = heap.len(),
            "bulk merge started"
        );

        let mut merged = 0u64;
        while let Some(Reverse(mut source)) = heap.pop() {
            let key = source.key.clone();
            if self.descriptor().is_unique() && !key.contains_null() {
                self.check_unique(destination.as_ref(), &key)?;
            }
            destination.put_committed(key);
            merged += 1;
            if let Some(next) = source.iter.next() {
                source.key = next;
                heap.push(Reverse(source));
            }
        }
        debug!(index = self.descriptor().name(), merged, "bulk merge finished");
        Ok(())
    }

    /// Scans the destination map forward from the key's column prefix and
    /// fails when a duplicate belonging to a different row already exists.
    ///
    /// Merge-path only: `put_committed` bypasses the map's conflict
    /// bookkeeping (and would silently replace a prefix-equal key under
    /// unique key identity), so the merge validates before every write.
    fn check_unique(&self, destination: &dyn TransactionMap, key: &IndexKey) -> IndexResult<()> {
        let descriptor = self.descriptor_arc();
        let row = descriptor.row_from_key(key)?;
        let own_id = key.row_id()?;
        let probe = key.with_row_id(RowId::MIN);
        for candidate in destination.key_iterator(Some(&probe), true) {
            let other = descriptor.row_from_key(&candidate)?;
            if descriptor.compare_rows(&row, &other) != Ordering::Equal {
                break;
            }
            if candidate.row_id()? != own_id
                && destination.get(&candidate).is_some()
                && !candidate.contains_null()
            {
                return Err(IndexError::duplicate_key(candidate.to_string()));
            }
        }
        Ok(())
    }
}
