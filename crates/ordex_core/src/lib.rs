//! # Ordex Core
//!
//! Transactional secondary-index engine: a sorted mapping from composite
//! index keys to row locators, maintained on top of an injected MVCC
//! transactional sorted map.
//!
//! This crate provides:
//! - Composite key encoding with SQL null/duplicate semantics
//! - Non-blocking add/remove/update with asynchronous conflict reporting
//! - Range and distinct scans via lazy cursors
//! - A bulk-build path merging pre-sorted partial indexes
//!
//! The MVCC map itself is an injected collaborator; its contract lives in
//! [`map`]. Persistence layout and lock-manager internals belong to that
//! collaborator, not to this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod future;
pub mod index;
pub mod key;
pub mod map;
pub mod row;
pub mod types;
pub mod value;

pub use descriptor::{IndexColumn, IndexDescriptor};
pub use error::{IndexError, IndexResult};
pub use future::{completion, OpFuture, OpPromise};
pub use index::{ColumnPredicate, Cursor, SecondaryIndex};
pub use key::{IndexKey, KeyComparator};
pub use map::{RowStore, TransactionMap, TransactionStore, VersionDescriptor};
pub use row::Row;
pub use types::{
    CancelToken, ColumnId, CompareMode, MutationStatus, RowId, SortDirection, TransactionId,
};
pub use value::{Value, ValueType};
