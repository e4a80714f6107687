//! Integration tests for index mutations: add, update, remove and the
//! asynchronous conflict paths.

use ordex_core::{ColumnId, IndexError, MutationStatus, Row, RowId, Value};
use ordex_testkit::prelude::*;

#[test]
fn add_rows_and_count() {
    let h = IndexHarness::open(long_index("idx_add"));
    for i in 1..=3 {
        let status = h.insert_row(None, &long_row(i, i * 10)).unwrap();
        assert_eq!(status, MutationStatus::Complete);
    }
    assert_eq!(h.index.row_count(None).unwrap(), 3);
}

#[test]
fn adding_same_row_twice_fails() {
    let h = IndexHarness::open(long_index("idx_dup"));
    let row = long_row(1, 5);
    h.insert_row(None, &row).unwrap();
    let err = h.index.add(None, &row).wait().unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn non_unique_index_accepts_equal_values() {
    let h = IndexHarness::open(long_index("idx_multi"));
    h.insert_row(None, &long_row(1, 7)).unwrap();
    h.insert_row(None, &long_row(2, 7)).unwrap();
    assert_eq!(h.index.row_count(None).unwrap(), 2);
}

#[test]
fn unique_index_rejects_second_row_with_equal_value() {
    let h = IndexHarness::open(long_index("idx_uni").unique());
    h.insert_row(None, &long_row(1, 7)).unwrap();
    let err = h.index.add(None, &long_row(2, 7)).wait().unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(h.index.row_count(None).unwrap(), 1);
}

#[test]
fn concurrent_transactions_cannot_both_add_a_unique_value() {
    let h = IndexHarness::open(long_index("idx_uni_race").unique());
    let t1 = h.store.begin();
    let t2 = h.store.begin();
    h.index.add(Some(t1), &long_row(1, 7)).wait().unwrap();
    // The first transaction's insert is still uncommitted, but the second
    // one must collide with it rather than slip past a committed-only check
    let err = h.index.add(Some(t2), &long_row(2, 7)).wait().unwrap_err();
    assert!(err.is_duplicate_key());
    h.store.commit(t1);
    h.store.rollback(t2);
    assert_eq!(h.index.row_count(None).unwrap(), 1);
}

#[test]
fn concurrent_update_into_a_unique_value_conflicts() {
    let h = IndexHarness::open(long_index("idx_uni_upd_race").unique());
    h.insert_row(None, &long_row(1, 5)).unwrap();
    h.insert_row(None, &long_row(2, 9)).unwrap();
    let t1 = h.store.begin();
    let t2 = h.store.begin();
    h.index.add(Some(t1), &long_row(3, 7)).wait().unwrap();
    // Moving row 2 onto value 7 collides with the uncommitted insert
    let err = h
        .index
        .update(
            Some(t2),
            &long_row(2, 9),
            &long_row(2, 7),
            &[ColumnId::new(0)],
            false,
        )
        .wait()
        .unwrap_err();
    assert!(err.is_duplicate_key());
    h.store.rollback(t2);
    h.store.commit(t1);
    assert_eq!(h.index.row_count(None).unwrap(), 3);
}

#[test]
fn unique_index_exempts_null_values() {
    let h = IndexHarness::open(long_index("idx_uni_null").unique());
    h.insert_row(None, &null_row(1)).unwrap();
    h.insert_row(None, &null_row(2)).unwrap();
    assert_eq!(h.index.row_count(None).unwrap(), 2);
}

#[test]
fn type_conversion_failure_fails_the_future() {
    let h = IndexHarness::open(long_index("idx_conv"));
    let mut row = Row::new(RowId::new(1), 2);
    row.set(ColumnId::new(0), Value::Text("not a number".into()));
    let err = h.index.add(None, &row).wait().unwrap_err();
    assert!(matches!(err, IndexError::TypeConversion { .. }));
}

#[test]
fn update_without_indexed_change_resolves_instantly() {
    let h = IndexHarness::open(long_index("idx_upd_noop"));
    let old = long_row(1, 5);
    h.insert_row(None, &old).unwrap();
    let mut new = old.clone();
    new.set(ColumnId::new(1), Value::Text("edited".into()));
    let future = h
        .index
        .update(None, &old, &new, &[ColumnId::new(1)], false);
    assert_eq!(future.poll().unwrap().unwrap(), MutationStatus::Complete);
}

#[test]
fn update_moves_the_key() {
    let h = IndexHarness::open(long_index("idx_upd"));
    let old = long_row(1, 5);
    h.insert_row(None, &old).unwrap();
    let new = long_row(1, 9);
    h.index
        .update(None, &old, &new, &[ColumnId::new(0)], false)
        .wait()
        .unwrap();
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(cursor.advance().unwrap());
    let found = cursor.search_row().unwrap();
    assert_eq!(found.get(ColumnId::new(0)), Some(&Value::Long(9)));
    assert!(!cursor.advance().unwrap());
}

#[test]
fn update_to_duplicate_value_fails_on_unique_index() {
    let h = IndexHarness::open(long_index("idx_upd_uni").unique());
    h.insert_row(None, &long_row(1, 5)).unwrap();
    h.insert_row(None, &long_row(2, 9)).unwrap();
    let err = h
        .index
        .update(
            None,
            &long_row(2, 9),
            &long_row(2, 5),
            &[ColumnId::new(0)],
            false,
        )
        .wait()
        .unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn transactional_update_is_invisible_until_commit() {
    let h = IndexHarness::open(long_index("idx_upd_txn"));
    let old = long_row(1, 5);
    h.insert_row(None, &old).unwrap();
    let txn = h.store.begin();
    h.index
        .update(Some(txn), &old, &long_row(1, 9), &[ColumnId::new(0)], false)
        .wait()
        .unwrap();

    // Committed readers still see the old key
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(cursor.advance().unwrap());
    assert_eq!(
        cursor.search_row().unwrap().get(ColumnId::new(0)),
        Some(&Value::Long(5))
    );
    assert!(!cursor.advance().unwrap());

    h.store.commit(txn);
    let mut cursor = h.index.find(None, None, None, None).unwrap();
    assert!(cursor.advance().unwrap());
    assert_eq!(
        cursor.search_row().unwrap().get(ColumnId::new(0)),
        Some(&Value::Long(9))
    );
    assert!(!cursor.advance().unwrap());
}

#[test]
fn remove_of_missing_row_reports_already_absent() {
    let h = IndexHarness::open(long_index("idx_rm_missing"));
    let status = h
        .index
        .remove(None, &long_row(1, 5), false)
        .wait()
        .unwrap();
    assert_eq!(status, MutationStatus::AlreadyAbsent);
}

#[test]
fn contended_remove_stays_pending_until_holder_commits() {
    let h = IndexHarness::open(long_index("idx_rm_wait"));
    let row = long_row(1, 5);
    let t1 = h.store.begin();
    h.index.add(Some(t1), &row).wait().unwrap();

    let t2 = h.store.begin();
    let pending = h.index.remove(Some(t2), &row, false);
    assert!(pending.poll().is_none());

    h.store.commit(t1);
    assert_eq!(pending.wait().unwrap(), MutationStatus::Complete);
    assert_eq!(h.index.row_count(None).unwrap(), 0);
}

#[test]
fn contended_remove_resolves_absent_when_holder_rolls_back() {
    let h = IndexHarness::open(long_index("idx_rm_rollback"));
    let row = long_row(1, 5);
    let t1 = h.store.begin();
    h.index.add(Some(t1), &row).wait().unwrap();

    let t2 = h.store.begin();
    let pending = h.index.remove(Some(t2), &row, false);
    assert!(pending.poll().is_none());

    h.store.rollback(t1);
    assert_eq!(pending.wait().unwrap(), MutationStatus::AlreadyAbsent);
    assert_eq!(h.index.row_count(None).unwrap(), 0);
}

#[test]
fn remove_with_own_lock_applies_directly() {
    let h = IndexHarness::open(long_index("idx_rm_own"));
    let row = long_row(1, 5);
    let t1 = h.store.begin();
    h.index.add(Some(t1), &row).wait().unwrap();
    // Same transaction holds the lock; the removal must not wait
    let status = h.index.remove(Some(t1), &row, true).wait().unwrap();
    assert_eq!(status, MutationStatus::Complete);
    h.store.commit(t1);
    assert_eq!(h.index.row_count(None).unwrap(), 0);
}
