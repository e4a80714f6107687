//! Test fixtures: in-memory row storage and pre-wired index harnesses.

use crate::mem_map::MemoryStore;
use ordex_core::{
    ColumnId, IndexColumn, IndexDescriptor, IndexResult, MutationStatus, Row, RowId, RowStore,
    SecondaryIndex, TransactionId, Value, ValueType,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory primary row storage.
#[derive(Default)]
pub struct MemoryRowStore {
    rows: RwLock<HashMap<i64, Row>>,
}

impl MemoryRowStore {
    /// Creates an empty row store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row under its ID, replacing any previous version.
    pub fn insert(&self, row: Row) {
        self.rows.write().insert(row.id().as_i64(), row);
    }

    /// Removes a row.
    pub fn remove(&self, id: RowId) {
        self.rows.write().remove(&id.as_i64());
    }

    /// Returns the stored row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true when no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl RowStore for MemoryRowStore {
    fn fetch_row(&self, id: RowId) -> IndexResult<Option<Row>> {
        Ok(self.rows.read().get(&id.as_i64()).cloned())
    }
}

/// A fully wired index over in-memory storage.
pub struct IndexHarness {
    /// The transactional store backing the index map.
    pub store: Arc<MemoryStore>,
    /// Primary row storage the cursors materialize from.
    pub rows: Arc<MemoryRowStore>,
    /// The index under test.
    pub index: SecondaryIndex,
}

impl IndexHarness {
    /// Opens an index over fresh in-memory storage.
    ///
    /// # Panics
    ///
    /// Panics when the descriptor is invalid or the map cannot open; fixtures
    /// fail loudly.
    #[must_use]
    pub fn open(descriptor: IndexDescriptor) -> Self {
        let store = Arc::new(MemoryStore::new());
        let rows = Arc::new(MemoryRowStore::new());
        let index = SecondaryIndex::open(
            Arc::clone(&store) as Arc<_>,
            Arc::clone(&rows) as Arc<_>,
            descriptor,
        )
        .expect("harness index must open");
        Self { store, rows, index }
    }

    /// Stores the row in primary storage and adds it to the index, waiting
    /// for the outcome.
    pub fn insert_row(
        &self,
        txn: Option<TransactionId>,
        row: &Row,
    ) -> IndexResult<MutationStatus> {
        self.rows.insert(row.clone());
        self.index.add(txn, row).wait()
    }

    /// Drains a cursor into the IDs of the rows it yields.
    ///
    /// # Panics
    ///
    /// Panics when the cursor reports an error.
    pub fn drain_ids(cursor: &mut dyn ordex_core::Cursor) -> Vec<i64> {
        let mut ids = Vec::new();
        while cursor.advance().expect("cursor advance") {
            let row = cursor.search_row().expect("positioned cursor has a row");
            ids.push(row.id().as_i64());
        }
        ids
    }
}

/// Descriptor over a single ascending `Long` column 0 of a two-column table.
///
/// # Panics
///
/// Panics when descriptor validation fails, which it cannot here.
#[must_use]
pub fn long_index(name: &str) -> IndexDescriptor {
    IndexDescriptor::new(
        name,
        vec![IndexColumn::ascending(ColumnId::new(0), ValueType::Long)],
        2,
    )
    .expect("fixture descriptor")
}

/// Descriptor over ascending `Text` column 0 of a two-column table.
///
/// # Panics
///
/// Panics when descriptor validation fails, which it cannot here.
#[must_use]
pub fn text_index(name: &str) -> IndexDescriptor {
    IndexDescriptor::new(
        name,
        vec![IndexColumn::ascending(ColumnId::new(0), ValueType::Text)],
        2,
    )
    .expect("fixture descriptor")
}

/// A two-column row holding a `Long` in column 0.
#[must_use]
pub fn long_row(id: i64, value: i64) -> Row {
    let mut row = Row::new(RowId::new(id), 2);
    row.set(ColumnId::new(0), Value::Long(value));
    row.set(ColumnId::new(1), Value::Text(format!("payload-{id}")));
    row
}

/// A two-column row holding SQL NULL in column 0.
#[must_use]
pub fn null_row(id: i64) -> Row {
    let mut row = Row::new(RowId::new(id), 2);
    row.set(ColumnId::new(0), Value::Null);
    row.set(ColumnId::new(1), Value::Text(format!("payload-{id}")));
    row
}

/// A two-column row holding text in column 0.
#[must_use]
pub fn text_row(id: i64, value: &str) -> Row {
    let mut row = Row::new(RowId::new(id), 2);
    row.set(ColumnId::new(0), Value::Text(value.to_string()));
    row.set(ColumnId::new(1), Value::Text(format!("payload-{id}")));
    row
}
