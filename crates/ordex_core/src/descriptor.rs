//! Index descriptors and the row/key codec.
//!
//! An [`IndexDescriptor`] is immutable after construction: the ordered list
//! of (column, direction) pairs, the uniqueness flag and the compare mode.
//! Rebuilding an index recreates its descriptor. The codec lives here too:
//! projecting a row into its [`IndexKey`] and back.

use crate::error::{IndexError, IndexResult};
use crate::key::{IndexKey, KeyComparator};
use crate::row::Row;
use crate::types::{ColumnId, CompareMode, RowId, SortDirection};
use crate::value::{Value, ValueType};
use std::cmp::Ordering;

/// One indexed column: position in the table, declared type and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumn {
    /// Position of the column in the table's column list.
    pub column: ColumnId,
    /// Declared type; row values are converted to it when keys are encoded.
    pub value_type: ValueType,
    /// Declared sort direction.
    pub direction: SortDirection,
}

impl IndexColumn {
    /// Creates an ascending index column.
    #[must_use]
    pub const fn ascending(column: ColumnId, value_type: ValueType) -> Self {
        Self {
            column,
            value_type,
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending index column.
    #[must_use]
    pub const fn descending(column: ColumnId, value_type: ValueType) -> Self {
        Self {
            column,
            value_type,
            direction: SortDirection::Descending,
        }
    }
}

/// Immutable description of a secondary index.
#[derive(Debug, Clone)]
pub struct IndexDescriptor {
    name: String,
    columns: Vec<IndexColumn>,
    table_width: usize,
    unique: bool,
    compare_mode: CompareMode,
}

impl IndexDescriptor {
    /// Creates a descriptor over the given columns.
    ///
    /// `table_width` is the owning table's column count, used to shape the
    /// partial rows decoded from keys. Fails with
    /// [`IndexError::InvalidDescriptor`] when the column list is empty,
    /// repeats a column, or references a column outside the table.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<IndexColumn>,
        table_width: usize,
    ) -> IndexResult<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(IndexError::invalid_descriptor(format!(
                "index {name} has no columns"
            )));
        }
        for (i, col) in columns.iter().enumerate() {
            if col.column.as_usize() >= table_width {
                return Err(IndexError::invalid_descriptor(format!(
                    "index {name} references {} outside table width {table_width}",
                    col.column
                )));
            }
            if columns[..i].iter().any(|c| c.column == col.column) {
                return Err(IndexError::invalid_descriptor(format!(
                    "index {name} repeats {}",
                    col.column
                )));
            }
        }
        Ok(Self {
            name,
            columns,
            table_width,
            unique: false,
            compare_mode: CompareMode::default(),
        })
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the compare mode used for text ordering.
    #[must_use]
    pub fn with_compare_mode(mut self, mode: CompareMode) -> Self {
        self.compare_mode = mode;
        self
    }

    /// Returns the index name (also the backing map's name).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed columns in declared order.
    #[must_use]
    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    /// Returns true if the index enforces uniqueness.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the compare mode.
    #[must_use]
    pub fn compare_mode(&self) -> CompareMode {
        self.compare_mode
    }

    /// Returns the key arity: indexed columns plus the trailing row ID.
    #[must_use]
    pub fn key_arity(&self) -> usize {
        self.columns.len() + 1
    }

    /// Returns true if `column` participates in this index.
    #[must_use]
    pub fn contains_column(&self, column: ColumnId) -> bool {
        self.columns.iter().any(|c| c.column == column)
    }

    /// Builds the comparator combining per-column directions with the
    /// compare mode. The trailing row ID always compares ascending. For a
    /// unique index the comparator applies unique key identity, so the
    /// backing map itself rejects a second non-null key with an equal
    /// column prefix.
    #[must_use]
    pub fn comparator(&self) -> KeyComparator {
        let directions: Vec<SortDirection> = self.columns.iter().map(|c| c.direction).collect();
        let comparator = KeyComparator::new(directions, self.compare_mode);
        if self.unique {
            comparator.unique()
        } else {
            comparator
        }
    }

    /// Encodes a row into its index key.
    ///
    /// Each indexed value is converted to the column's declared type; unset
    /// slots encode as NULL. Fails with [`IndexError::TypeConversion`] when
    /// a value cannot be converted.
    pub fn key_for_row(&self, row: &Row) -> IndexResult<IndexKey> {
        let mut values = Vec::with_capacity(self.key_arity());
        for col in &self.columns {
            match row.get(col.column) {
                Some(v) => values.push(v.convert_to(col.value_type)?),
                None => values.push(Value::Null),
            }
        }
        Ok(IndexKey::new(values, row.id()))
    }

    /// Encodes an inclusive lower search bound.
    ///
    /// The trailing row ID is forced to the minimum sentinel so a range scan
    /// starting here includes every duplicate of the bound's column prefix.
    pub fn lower_bound(&self, row: &Row) -> IndexResult<IndexKey> {
        Ok(self.key_for_row(row)?.with_row_id(RowId::MIN))
    }

    /// Decodes a key back into a partial row: the row ID plus the indexed
    /// column values, everything else unset.
    pub fn row_from_key(&self, key: &IndexKey) -> IndexResult<Row> {
        if key.arity() != self.key_arity() {
            return Err(IndexError::internal(format!(
                "key arity {} does not match index {} arity {}",
                key.arity(),
                self.name,
                self.key_arity()
            )));
        }
        let mut row = Row::new(key.row_id()?, self.table_width);
        for (col, value) in self.columns.iter().zip(key.column_values()) {
            row.set(col.column, value.clone());
        }
        Ok(row)
    }

    /// Compares two rows by indexed-column order.
    ///
    /// An unset column on either side ends the comparison as equal; search
    /// bounds set only a column prefix and match every continuation of it.
    /// The row ID is never consulted.
    #[must_use]
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for col in &self.columns {
            let (Some(x), Some(y)) = (a.get(col.column), b.get(col.column)) else {
                return Ordering::Equal;
            };
            let ord = x.compare(y, self.compare_mode);
            if ord != Ordering::Equal {
                return if col.direction.is_descending() {
                    ord.reverse()
                } else {
                    ord
                };
            }
        }
        Ordering::Equal
    }

    /// Returns true if the row holds NULL (or no value) in any indexed
    /// column. Such rows are exempt from uniqueness rejection.
    #[must_use]
    pub fn row_has_null_indexed(&self, row: &Row) -> bool {
        self.columns
            .iter()
            .any(|c| row.get(c.column).is_none_or(Value::is_null))
    }
}
