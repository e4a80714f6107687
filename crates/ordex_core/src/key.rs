//! Composite index keys and their ordering.
//!
//! An [`IndexKey`] is an ordered, fixed-arity tuple: one value per indexed
//! column followed by exactly one trailing `Long` holding the owning row's
//! ID. The trailing component keeps structurally different rows from ever
//! colliding on key identity, even when every indexed column is equal (or
//! NULL), and it always sorts ascending so duplicate groups enumerate in
//! stable row-ID order.

use crate::error::{IndexError, IndexResult};
use crate::types::{CompareMode, RowId, SortDirection};
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A composite index key: k indexed values plus the trailing row ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    values: Vec<Value>,
}

impl IndexKey {
    /// Builds a key from indexed-column values and the owning row's ID.
    #[must_use]
    pub fn new(mut column_values: Vec<Value>, row_id: RowId) -> Self {
        column_values.push(Value::Long(row_id.as_i64()));
        Self {
            values: column_values,
        }
    }

    /// Wraps an already-complete component list (trailing row ID included).
    pub fn from_components(values: Vec<Value>) -> IndexResult<Self> {
        match values.last() {
            Some(Value::Long(_)) => Ok(Self { values }),
            _ => Err(IndexError::internal(
                "index key must end in a Long row identifier",
            )),
        }
    }

    /// Returns all components, trailing row ID included.
    #[must_use]
    pub fn components(&self) -> &[Value] {
        &self.values
    }

    /// Returns the indexed-column components (everything but the row ID).
    #[must_use]
    pub fn column_values(&self) -> &[Value] {
        &self.values[..self.values.len() - 1]
    }

    /// Returns the number of components, trailing row ID included.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Returns the owning row's ID.
    pub fn row_id(&self) -> IndexResult<RowId> {
        match self.values.last() {
            Some(Value::Long(id)) => Ok(RowId::new(*id)),
            other => Err(IndexError::internal(format!(
                "index key trailing component is not a row identifier: {other:?}"
            ))),
        }
    }

    /// Returns a copy with the trailing row ID replaced.
    ///
    /// Used to derive search bounds (`RowId::MIN`) and distinct-scan
    /// ceilings (`RowId::MAX`) from a real key.
    #[must_use]
    pub fn with_row_id(&self, row_id: RowId) -> Self {
        let mut values = self.values.clone();
        let last = values.len() - 1;
        values[last] = Value::Long(row_id.as_i64());
        Self { values }
    }

    /// Returns true if any indexed-column component is NULL.
    #[must_use]
    pub fn contains_null(&self) -> bool {
        self.column_values().iter().any(Value::is_null)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.column_values().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        match self.row_id() {
            Ok(id) => write!(f, ") {id}"),
            Err(_) => f.write_str(") row:?"),
        }
    }
}

/// Pure ordering function over index keys.
///
/// Combines the per-column sort directions with a compare mode. The trailing
/// row ID always compares ascending regardless of declared directions. In
/// unique mode two keys with equal non-null column prefixes compare equal
/// outright: key identity then IS the uniqueness constraint, so a duplicate
/// collides inside the map's own insert path instead of needing an advisory
/// scan. Keys holding NULL keep the row-ID tie-break, which is what lets a
/// unique index hold any number of NULLs.
#[derive(Debug, Clone)]
pub struct KeyComparator {
    directions: Arc<[SortDirection]>,
    mode: CompareMode,
    unique: bool,
}

impl KeyComparator {
    /// Creates a comparator for `directions.len()` indexed columns.
    #[must_use]
    pub fn new(directions: impl Into<Arc<[SortDirection]>>, mode: CompareMode) -> Self {
        Self {
            directions: directions.into(),
            mode,
            unique: false,
        }
    }

    /// Switches to unique key identity: non-null prefix-equal keys compare
    /// equal regardless of their trailing row ID.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the compare mode.
    #[must_use]
    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    /// Returns true when this comparator applies unique key identity.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Total order over keys: indexed columns first (respecting directions
    /// and compare mode), then the trailing row ID ascending. Unique mode
    /// stops at the prefix for non-null keys.
    #[must_use]
    pub fn compare(&self, a: &IndexKey, b: &IndexKey) -> Ordering {
        match self.compare_prefix(a, b) {
            Ordering::Equal => {
                if self.unique && !a.contains_null() && !b.contains_null() {
                    return Ordering::Equal;
                }
                let ra = a.components().last().unwrap_or(&Value::Null);
                let rb = b.components().last().unwrap_or(&Value::Null);
                ra.compare(rb, CompareMode::Binary)
            }
            ord => ord,
        }
    }

    /// Compares only the indexed-column components, ignoring the row ID.
    #[must_use]
    pub fn compare_prefix(&self, a: &IndexKey, b: &IndexKey) -> Ordering {
        let av = a.column_values();
        let bv = b.column_values();
        for (i, direction) in self.directions.iter().enumerate() {
            let (Some(x), Some(y)) = (av.get(i), bv.get(i)) else {
                break;
            };
            let ord = x.compare(y, self.mode);
            if ord != Ordering::Equal {
                return if direction.is_descending() {
                    ord.reverse()
                } else {
                    ord
                };
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(values: Vec<Value>, row: i64) -> IndexKey {
        IndexKey::new(values, RowId::new(row))
    }

    #[test]
    fn arity_is_columns_plus_one() {
        let k = key(vec![Value::Long(1), Value::Text("a".into())], 7);
        assert_eq!(k.arity(), 3);
        assert_eq!(k.row_id().unwrap(), RowId::new(7));
    }

    #[test]
    fn trailing_id_sorts_ascending_under_descending_column() {
        let cmp = KeyComparator::new(vec![SortDirection::Descending], CompareMode::Binary);
        let a = key(vec![Value::Long(5)], 1);
        let b = key(vec![Value::Long(5)], 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
        // The column itself still honours the declared direction
        let c = key(vec![Value::Long(6)], 0);
        assert_eq!(cmp.compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn prefix_compare_ignores_row_id() {
        let cmp = KeyComparator::new(vec![SortDirection::Ascending], CompareMode::Binary);
        let a = key(vec![Value::Long(5)], 1);
        let b = key(vec![Value::Long(5)], 99);
        assert_eq!(cmp.compare_prefix(&a, &b), Ordering::Equal);
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn with_row_id_replaces_only_trailing() {
        let k = key(vec![Value::Long(5)], 10);
        let bound = k.with_row_id(RowId::MIN);
        assert_eq!(bound.column_values(), k.column_values());
        assert_eq!(bound.row_id().unwrap(), RowId::MIN);
    }

    #[test]
    fn null_detection_skips_row_id() {
        let k = key(vec![Value::Null, Value::Long(1)], 3);
        assert!(k.contains_null());
        let k2 = key(vec![Value::Long(1)], 3);
        assert!(!k2.contains_null());
    }

    #[test]
    fn unique_identity_collapses_non_null_prefix_duplicates() {
        let cmp =
            KeyComparator::new(vec![SortDirection::Ascending], CompareMode::Binary).unique();
        let a = key(vec![Value::Long(5)], 1);
        let b = key(vec![Value::Long(5)], 2);
        assert_eq!(cmp.compare(&a, &b), Ordering::Equal);
        // NULL keys keep the row-ID tie-break
        let n1 = key(vec![Value::Null], 1);
        let n2 = key(vec![Value::Null], 2);
        assert_eq!(cmp.compare(&n1, &n2), Ordering::Less);
        // Distinct values still order by value
        let c = key(vec![Value::Long(6)], 0);
        assert_eq!(cmp.compare(&a, &c), Ordering::Less);
    }

    #[test]
    fn render_is_human_readable() {
        let k = key(vec![Value::Text("ada".into()), Value::Null], 4);
        assert_eq!(k.to_string(), "('ada', NULL) row:4");
    }
}
