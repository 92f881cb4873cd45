//! # Core Error Types
//!
//! Errors raised while creating or reseeding frame-state buffers.
//! Nothing inside a dispatch returns these.

use thiserror::Error;

/// Errors that can occur when building frame-state buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The record type cannot be stored as a run of 32-bit words.
    #[error("record layout of {size} bytes is not a whole number of 32-bit words")]
    UnsupportedRecordLayout {
        /// Size of the record in bytes.
        size: usize,
    },

    /// A per-batch slice did not match the number of batches.
    #[error("expected {expected} per-batch values, got {actual}")]
    BatchCountMismatch {
        /// Number of batches in the buffer.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
