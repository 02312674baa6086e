//! Error types for the Pilum library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`PilumError`] enum.
//!
//! # Examples
//!
//! ```
//! use pilum::error::{PilumError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PilumError::invalid_document("field name must not be empty"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Pilum operations.
///
/// Variants map one-to-one to the failure kinds callers are expected to
/// handle differently: local validation failures, writer contention, bad
/// queries, corrupt on-disk data and I/O failures from the storage layer.
#[derive(Error, Debug)]
pub enum PilumError {
    /// A document failed validation; nothing from it was applied.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Another writer currently holds the index write lock.
    #[error("Writer lock held: {0}")]
    WriterLockHeld(String),

    /// The query text could not be turned into at least one term.
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    /// A segment or commit file failed its structural or checksum checks.
    #[error("Corrupt segment: {0}")]
    CorruptSegment(String),

    /// I/O errors propagated from the storage collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage-related errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Index-related errors (closed writer, bad arguments, ...).
    #[error("Index error: {0}")]
    Index(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with PilumError.
pub type Result<T> = std::result::Result<T, PilumError>;

impl PilumError {
    /// Create a new invalid document error.
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        PilumError::InvalidDocument(msg.into())
    }

    /// Create a new writer-lock contention error.
    pub fn writer_lock_held<S: Into<String>>(msg: S) -> Self {
        PilumError::WriterLockHeld(msg.into())
    }

    /// Create a new query syntax error.
    pub fn query_syntax<S: Into<String>>(msg: S) -> Self {
        PilumError::QuerySyntax(msg.into())
    }

    /// Create a new corrupt segment error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        PilumError::CorruptSegment(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PilumError::Storage(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PilumError::Index(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PilumError::Index(format!("Invalid argument: {}", msg.into()))
    }

    /// Whether this error reports on-disk corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, PilumError::CorruptSegment(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = PilumError::invalid_document("empty field name");
        assert_eq!(error.to_string(), "Invalid document: empty field name");

        let error = PilumError::query_syntax("no terms");
        assert_eq!(error.to_string(), "Query syntax error: no terms");

        let error = PilumError::corrupt("_0.dict checksum mismatch");
        assert!(error.is_corruption());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let pilum_error = PilumError::from(io_error);

        match pilum_error {
            PilumError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
