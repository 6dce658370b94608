//! Error types for the IndexedDB storage backend

use satchel_core::{RecordId, StoreError};
use thiserror::Error;

/// Result type for IndexedDB operations
pub type Result<T> = std::result::Result<T, IndexedDbError>;

/// Errors that can occur during IndexedDB storage operations
#[derive(Debug, Error)]
pub enum IndexedDbError {
    /// IndexedDB is not available in this environment
    #[error("IndexedDB not available: {0}")]
    NotAvailable(String),

    /// Database open/upgrade error (includes version conflicts)
    #[error("IndexedDB open error: {0}")]
    Open(String),

    /// Open blocked by another connection holding an older version
    #[error("IndexedDB open blocked: {0}")]
    Blocked(String),

    /// Operation attempted after the connection was explicitly closed
    #[error("IndexedDB connection is closed")]
    Closed,

    /// Transaction error
    #[error("IndexedDB transaction error: {0}")]
    Transaction(String),

    /// Request error from an IDB operation
    #[error("IndexedDB request error: {0}")]
    Request(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record with the given id not found
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// Index not declared at schema-creation time
    #[error("index {0} not declared")]
    IndexNotFound(String),

    /// JavaScript value conversion error
    #[error("JS conversion error: {0}")]
    JsValue(String),
}

impl From<wasm_bindgen::JsValue> for IndexedDbError {
    fn from(val: wasm_bindgen::JsValue) -> Self {
        let msg = js_sys::JSON::stringify(&val)
            .map(String::from)
            .unwrap_or_else(|_| format!("{:?}", val));
        IndexedDbError::Request(msg)
    }
}

/// Convert IndexedDbError to StoreError for the storage contract
impl From<IndexedDbError> for StoreError {
    fn from(err: IndexedDbError) -> Self {
        match err {
            IndexedDbError::NotFound(id) => StoreError::NotFound(id),
            IndexedDbError::IndexNotFound(name) => StoreError::IndexNotFound(name),
            IndexedDbError::Json(e) => StoreError::Serialization(e.to_string()),
            IndexedDbError::Closed => StoreError::Closed,
            IndexedDbError::NotAvailable(msg) => {
                StoreError::Connection(format!("IndexedDB not available: {}", msg))
            }
            IndexedDbError::Open(msg) => StoreError::Connection(format!("IndexedDB open: {}", msg)),
            IndexedDbError::Blocked(msg) => {
                StoreError::Connection(format!("IndexedDB open blocked: {}", msg))
            }
            IndexedDbError::Transaction(msg) => {
                StoreError::Backend(format!("IndexedDB transaction: {}", msg))
            }
            IndexedDbError::Request(msg) => {
                StoreError::Backend(format!("IndexedDB request: {}", msg))
            }
            IndexedDbError::JsValue(msg) => StoreError::Backend(format!("IndexedDB JS: {}", msg)),
        }
    }
}
