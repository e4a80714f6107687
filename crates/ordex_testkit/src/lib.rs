//! # Ordex Testkit
//!
//! Test utilities for Ordex.
//!
//! This crate provides:
//! - An in-memory MVCC transactional map and store
//! - In-memory primary row storage and pre-wired index harnesses
//! - Property-based test generators using proptest
//! - Cross-crate integration test helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ordex_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_index() {
//!     let h = IndexHarness::open(long_index("idx_test"));
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mem_map;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mem_map::*;
}

pub use fixtures::*;
pub use generators::*;
pub use mem_map::*;
