//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random index keys, comparators and
//! row batches that maintain required invariants.

use ordex_core::{CompareMode, IndexKey, KeyComparator, Row, RowId, SortDirection, Value};
use proptest::prelude::*;

/// Strategy for generating indexable values of mixed types.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        3 => any::<i64>().prop_map(Value::Long),
        2 => prop::string::string_regex("[a-zA-Z]{0,8}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for generating a sort direction.
pub fn direction_strategy() -> impl Strategy<Value = SortDirection> {
    prop_oneof![
        Just(SortDirection::Ascending),
        Just(SortDirection::Descending),
    ]
}

/// Strategy for generating an index key of the given column arity.
pub fn key_strategy(columns: usize) -> impl Strategy<Value = IndexKey> {
    (
        prop::collection::vec(value_strategy(), columns),
        any::<i64>(),
    )
        .prop_map(|(values, row)| IndexKey::new(values, RowId::new(row)))
}

/// Strategy for generating a comparator over the given column arity.
pub fn comparator_strategy(columns: usize) -> impl Strategy<Value = KeyComparator> {
    (
        prop::collection::vec(direction_strategy(), columns),
        prop_oneof![Just(CompareMode::Binary), Just(CompareMode::CaseInsensitive)],
    )
        .prop_map(|(directions, mode)| KeyComparator::new(directions, mode))
}

/// Strategy for generating a batch of two-column rows with distinct IDs.
///
/// Column 0 carries a `Long` drawn from a small domain so duplicates are
/// common; the row ID is the batch position.
pub fn long_row_batch_strategy(max_rows: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(-8i64..8, 0..max_rows).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let mut row = Row::new(RowId::new(i as i64), 2);
                row.set(ordex_core::ColumnId::new(0), Value::Long(v));
                row
            })
            .collect()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_keys_carry_row_id(key in key_strategy(2)) {
            prop_assert_eq!(key.arity(), 3);
            prop_assert!(key.row_id().is_ok());
        }

        #[test]
        fn generated_batches_have_distinct_ids(rows in long_row_batch_strategy(32)) {
            let mut ids: Vec<i64> = rows.iter().map(|r| r.id().as_i64()).collect();
            ids.dedup();
            prop_assert_eq!(ids.len(), rows.len());
        }
    }
}
