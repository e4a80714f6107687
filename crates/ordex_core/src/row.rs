//! Row views exchanged with the table layer.

use crate::types::{ColumnId, RowId};
use crate::value::Value;

/// A row, or a partial row-shaped view.
///
/// The index only ever sees column values, never payload bytes. A slot of
/// `None` means "not set" (used by search bounds covering a column prefix),
/// which is distinct from `Some(Value::Null)`, a stored SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    values: Vec<Option<Value>>,
}

impl Row {
    /// Creates a row with all column slots unset.
    #[must_use]
    pub fn new(id: RowId, column_count: usize) -> Self {
        Self {
            id,
            values: vec![None; column_count],
        }
    }

    /// Creates a row from fully materialized column values.
    #[must_use]
    pub fn with_values(id: RowId, values: Vec<Value>) -> Self {
        Self {
            id,
            values: values.into_iter().map(Some).collect(),
        }
    }

    /// Returns the row's locator.
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Returns the value of a column, or `None` when the slot is unset.
    #[must_use]
    pub fn get(&self, column: ColumnId) -> Option<&Value> {
        self.values.get(column.as_usize()).and_then(Option::as_ref)
    }

    /// Sets a column value, growing the slot vector if needed.
    pub fn set(&mut self, column: ColumnId, value: Value) {
        let idx = column.as_usize();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    /// Returns the number of column slots.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.values.len()
    }
}
