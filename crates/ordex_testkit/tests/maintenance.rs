//! Integration tests for index maintenance and planner surfaces.

use ordex_core::{ColumnPredicate, IndexError};
use ordex_testkit::prelude::*;

#[test]
fn fresh_index_needs_rebuild_until_populated() {
    let h = IndexHarness::open(long_index("idx_rebuild"));
    assert!(h.index.needs_rebuild().unwrap());
    h.insert_row(None, &long_row(1, 5)).unwrap();
    assert!(!h.index.needs_rebuild().unwrap());
}

#[test]
fn truncate_empties_the_index() {
    let h = IndexHarness::open(long_index("idx_truncate"));
    for i in 1..=4 {
        h.insert_row(None, &long_row(i, i)).unwrap();
    }
    h.index.truncate(None);
    assert_eq!(h.index.row_count(None).unwrap(), 0);
    assert!(h.index.needs_rebuild().unwrap());
}

#[test]
fn drop_index_closes_the_backing_map() {
    let h = IndexHarness::open(long_index("idx_drop"));
    h.insert_row(None, &long_row(1, 5)).unwrap();
    h.index.drop_index();
    assert!(matches!(
        h.index.row_count_estimate(),
        Err(IndexError::StorageClosed)
    ));
    // Dropping twice is harmless
    h.index.drop_index();
}

#[test]
fn equality_on_unique_index_is_cheapest() {
    let unique = IndexHarness::open(long_index("idx_cost_uni").unique());
    let plain = IndexHarness::open(long_index("idx_cost_plain"));
    let eq = [ColumnPredicate::Equality];
    let unique_cost = unique.index.estimated_cost(&eq, false).unwrap();
    let plain_cost = plain.index.estimated_cost(&eq, false).unwrap();
    assert!(unique_cost < plain_cost);
}

#[test]
fn tighter_predicates_cost_less() {
    let h = IndexHarness::open(long_index("idx_cost_shape"));
    let none = h.index.estimated_cost(&[ColumnPredicate::None], false).unwrap();
    let range = h.index.estimated_cost(&[ColumnPredicate::Range], false).unwrap();
    let eq = h
        .index
        .estimated_cost(&[ColumnPredicate::Equality], false)
        .unwrap();
    assert!(eq < range);
    assert!(range < none);
}

#[test]
fn matching_sort_order_discounts_cost() {
    let h = IndexHarness::open(long_index("idx_cost_sort"));
    let unsorted = h.index.estimated_cost(&[ColumnPredicate::Range], false).unwrap();
    let sorted = h.index.estimated_cost(&[ColumnPredicate::Range], true).unwrap();
    assert!(sorted < unsorted);
}

#[test]
fn usage_accessors_answer_on_open_index() {
    let h = IndexHarness::open(long_index("idx_usage"));
    for i in 1..=3 {
        h.insert_row(None, &long_row(i, i)).unwrap();
    }
    assert_eq!(h.index.row_count_estimate().unwrap(), 3);
    assert!(h.index.memory_usage().unwrap() > 0);
    h.index.disk_usage().unwrap();
}
