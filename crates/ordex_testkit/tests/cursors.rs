//! Integration tests for range, distinct and extremal cursors.

use ordex_core::{CancelToken, ColumnId, IndexError, Row, RowId, Value};
use ordex_testkit::prelude::*;

fn prefix(value: i64) -> Row {
    let mut row = Row::new(RowId::new(0), 2);
    row.set(ColumnId::new(0), Value::Long(value));
    row
}

fn seeded_harness(name: &str, values: &[i64]) -> IndexHarness {
    let h = IndexHarness::open(long_index(name));
    for (i, v) in values.iter().enumerate() {
        h.insert_row(None, &long_row(i as i64 + 1, *v)).unwrap();
    }
    h
}

#[test]
fn unbounded_scan_yields_index_order() {
    let h = seeded_harness("idx_scan_all", &[5, 1, 3, 2, 4]);
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    let ids = IndexHarness::drain_ids(cursor.as_mut());
    // Sorted by indexed value: 1, 2, 3, 4, 5 carried by rows 2, 4, 3, 5, 1
    assert_eq!(ids, vec![2, 4, 3, 5, 1]);
}

#[test]
fn bounded_scan_includes_every_duplicate_of_the_bounds() {
    let h = seeded_harness("idx_scan_range", &[1, 2, 2, 3, 5]);
    let lower = prefix(2);
    let upper = prefix(3);
    let mut cursor = h
        .index
        .find(None, Some(&lower), Some(&upper), None)
        .unwrap();
    let ids = IndexHarness::drain_ids(cursor.as_mut());
    // Both rows holding 2, then the row holding 3; 5 is past the bound
    assert_eq!(ids, vec![2, 3, 4]);
}

#[test]
fn duplicates_enumerate_in_row_id_order() {
    let h = IndexHarness::open(long_index("idx_scan_dup_order"));
    for id in [9, 4, 7] {
        h.insert_row(None, &long_row(id, 2)).unwrap();
    }
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert_eq!(IndexHarness::drain_ids(cursor.as_mut()), vec![4, 7, 9]);
}

#[test]
fn scan_over_empty_index_terminates() {
    let h = IndexHarness::open(long_index("idx_scan_empty"));
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(!cursor.advance().unwrap());
    assert!(cursor.search_row().is_none());
    assert!(cursor.row().unwrap().is_none());
}

#[test]
fn full_row_is_fetched_lazily_from_primary_storage() {
    let h = seeded_harness("idx_scan_lazy", &[5]);
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(cursor.advance().unwrap());
    // The search row decoded from the key has no payload column
    assert!(cursor.search_row().unwrap().get(ColumnId::new(1)).is_none());
    let full = cursor.row().unwrap().unwrap();
    assert_eq!(
        full.get(ColumnId::new(1)),
        Some(&Value::Text("payload-1".into()))
    );
}

#[test]
fn vanished_primary_row_materializes_as_none() {
    let h = seeded_harness("idx_scan_vanished", &[5]);
    h.rows.remove(RowId::new(1));
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(cursor.advance().unwrap());
    assert!(cursor.search_row().is_some());
    assert!(cursor.row().unwrap().is_none());
}

#[test]
fn distinct_yields_one_row_per_value_group() {
    let h = seeded_harness("idx_distinct", &[1, 2, 2, 2, 3]);
    let mut cursor = h.index.find_distinct(None, None);
    let mut values = Vec::new();
    let mut ids = Vec::new();
    while cursor.advance().unwrap() {
        let row = cursor.search_row().unwrap();
        values.push(row.get(ColumnId::new(0)).cloned().unwrap());
        ids.push(row.id().as_i64());
    }
    assert_eq!(values, vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
    // The representative of a group is its smallest row ID
    assert_eq!(ids, vec![1, 2, 5]);
}

#[test]
fn distinct_treats_null_as_its_own_group() {
    let h = IndexHarness::open(long_index("idx_distinct_null"));
    h.insert_row(None, &null_row(1)).unwrap();
    h.insert_row(None, &null_row(2)).unwrap();
    h.insert_row(None, &long_row(3, 7)).unwrap();
    let mut cursor = h.index.find_distinct(None, None);
    let mut values = Vec::new();
    while cursor.advance().unwrap() {
        values.push(cursor.search_row().unwrap().get(ColumnId::new(0)).cloned());
    }
    assert_eq!(values, vec![Some(Value::Null), Some(Value::Long(7))]);
}

#[test]
fn extremal_lookup_skips_null_keys() {
    let h = IndexHarness::open(long_index("idx_extremal"));
    h.insert_row(None, &null_row(1)).unwrap();
    h.insert_row(None, &long_row(2, 5)).unwrap();
    h.insert_row(None, &long_row(3, 9)).unwrap();

    let mut first = h.index.find_first_or_last(None, true).unwrap();
    assert!(first.advance().unwrap());
    assert_eq!(
        first.search_row().unwrap().get(ColumnId::new(0)),
        Some(&Value::Long(5))
    );
    assert!(!first.advance().unwrap());

    let mut last = h.index.find_first_or_last(None, false).unwrap();
    assert!(last.advance().unwrap());
    assert_eq!(
        last.search_row().unwrap().get(ColumnId::new(0)),
        Some(&Value::Long(9))
    );
}

#[test]
fn extremal_lookup_over_all_null_index_is_empty() {
    let h = IndexHarness::open(long_index("idx_extremal_null"));
    h.insert_row(None, &null_row(1)).unwrap();
    h.insert_row(None, &null_row(2)).unwrap();
    let mut cursor = h.index.find_first_or_last(None, true).unwrap();
    assert!(!cursor.advance().unwrap());
}

#[test]
fn cancelled_token_aborts_range_scan() {
    let h = seeded_harness("idx_cancel_range", &[1, 2, 3]);
    let token = CancelToken::new();
    token.cancel();
    let mut cursor = h.index.find(None, None, None, Some(token)).unwrap();
    let err = cursor.advance().unwrap_err();
    assert!(matches!(err, IndexError::Cancelled));
    // A cancelled cursor stays terminated
    assert!(!cursor.advance().unwrap());
}

#[test]
fn cancelled_token_aborts_distinct_scan() {
    let h = seeded_harness("idx_cancel_distinct", &[1, 2, 3]);
    let token = CancelToken::new();
    token.cancel();
    let mut cursor = h.index.find_distinct(None, Some(token));
    assert!(matches!(cursor.advance(), Err(IndexError::Cancelled)));
}

#[test]
fn transactional_view_sees_own_uncommitted_rows() {
    let h = seeded_harness("idx_scan_txn", &[1]);
    let txn = h.store.begin();
    h.insert_row(Some(txn), &long_row(2, 2)).unwrap();

    let mut own = h.index.find(Some(txn), None, None, None).unwrap();
    assert_eq!(IndexHarness::drain_ids(own.as_mut()), vec![1, 2]);

    let mut committed = h.index.find(None, None, None, None).unwrap();
    assert_eq!(IndexHarness::drain_ids(committed.as_mut()), vec![1]);
}
