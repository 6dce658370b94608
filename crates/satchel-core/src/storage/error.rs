//! Storage error types

use thiserror::Error;

use crate::record::RecordId;

/// Errors that can occur during storage operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Opening or upgrading the database failed (version conflict, blocked
    /// open, or an environment without the storage capability)
    #[error("connection error: {0}")]
    Connection(String),

    /// Operation attempted after the connection was explicitly closed
    #[error("connection is closed")]
    Closed,

    /// Record not found; raised only by partial update on an absent id
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Lookup against an index that was not declared at schema-creation time
    #[error("index not declared: {0}")]
    IndexNotFound(String),

    /// Invalid record data, e.g. an `id` field that is not a non-negative
    /// integer
    #[error("invalid record data: {0}")]
    InvalidData(String),

    /// Storage backend error reported by the underlying engine
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
