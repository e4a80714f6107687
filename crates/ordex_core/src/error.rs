//! Error types for the Ordex index engine.

use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in index operations.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// A unique index rejected a duplicate key.
    ///
    /// Carries a rendered form of the offending composite key. Both the
    /// primary and a secondary index may report this for the same logical
    /// row; neither report is suppressed.
    #[error("duplicate key in unique index: {key}")]
    DuplicateKey {
        /// Human-readable rendering of the offending key.
        key: String,
    },

    /// A row value could not be converted to its indexed column's type.
    ///
    /// Surfaced at index construction/validation time, fatal to that call.
    #[error("cannot convert value {value} to {expected}")]
    TypeConversion {
        /// Rendering of the value that failed to convert.
        value: String,
        /// Name of the target type.
        expected: &'static str,
    },

    /// The underlying map was closed concurrently with a size/cost query.
    ///
    /// Distinguishable from an empty index; the caller may retry.
    #[error("underlying storage map is closed")]
    StorageClosed,

    /// A long scan was aborted by its cancellation token.
    #[error("scan cancelled")]
    Cancelled,

    /// An index descriptor failed structural validation.
    #[error("invalid index descriptor: {message}")]
    InvalidDescriptor {
        /// Description of the problem.
        message: String,
    },

    /// Invariant violation; a programming defect, not recoverable.
    #[error("internal inconsistency: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl IndexError {
    /// Creates a duplicate-key error from a rendered key.
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Creates a type-conversion error.
    pub fn type_conversion(value: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeConversion {
            value: value.into(),
            expected,
        }
    }

    /// Creates an invalid-descriptor error.
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
        }
    }

    /// Creates an internal-inconsistency error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a duplicate-key failure.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}
