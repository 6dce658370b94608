//! Storage trait definitions

use serde_json::Value;

use crate::record::{Record, RecordId};
use crate::storage::error::StoreResult;

/// Core storage operations for records.
///
/// This trait defines the minimal interface that all storage backends must
/// implement. It's designed to work across different platforms:
/// - Native/testing: In-memory
/// - Browser: IndexedDB (async equivalents in a separate crate)
pub trait RecordStore {
    /// Insert a record, or replace the record sharing its id.
    ///
    /// If the record carries no id, the store assigns the next autoincrement
    /// value. Returns the assigned or kept id.
    fn insert_or_update(&mut self, record: Record) -> StoreResult<RecordId>;

    /// Retrieve a record by id.
    ///
    /// Returns `None` if not found.
    fn get(&self, id: RecordId) -> StoreResult<Option<Record>>;

    /// Check if a record exists.
    fn exists(&self, id: RecordId) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Retrieve every record, in ascending id order.
    fn get_all(&self) -> StoreResult<Vec<Record>>;

    /// Delete a record by id. Deleting an absent id is a no-op success.
    fn delete(&mut self, id: RecordId) -> StoreResult<()>;

    /// Merge `patch` over the record at `id`.
    ///
    /// Returns `StoreError::NotFound` if no record exists at `id`. The
    /// identity field is never overwritten by the patch.
    fn update_fields(&mut self, id: RecordId, patch: Record) -> StoreResult<()>;

    /// Get the total record count.
    fn count(&self) -> StoreResult<usize> {
        Ok(self.get_all()?.len())
    }

    /// Remove every record. The collection itself remains defined.
    fn clear(&mut self) -> StoreResult<()>;

    /// Insert a batch of records as one atomic unit.
    ///
    /// Either every record is stored or none is. Returns the ids in input
    /// order.
    fn insert_all(&mut self, records: Vec<Record>) -> StoreResult<Vec<RecordId>>;

    /// Delete a batch of ids as one atomic unit.
    fn delete_all(&mut self, ids: &[RecordId]) -> StoreResult<()>;
}

/// Extended query operations for record retrieval.
///
/// Not all backends may implement these efficiently; the reference semantics
/// are full-scan-then-filter.
pub trait QueryStore: RecordStore {
    /// Look up at most one record whose `index` field equals `value`.
    ///
    /// Fails with `StoreError::IndexNotFound` if the index was not declared
    /// at schema-creation time.
    fn get_by_index(&self, index: &str, value: &Value) -> StoreResult<Option<Record>>;

    /// Retrieve every record matching `predicate`, in ascending id order.
    ///
    /// Runs against the full materialized set — O(collection size) per call.
    fn get_by_filter(&self, predicate: &dyn Fn(&Record) -> bool) -> StoreResult<Vec<Record>>;

    /// Retrieve records with `low <= id <= high`, in ascending id order.
    fn get_by_range(&self, low: RecordId, high: RecordId) -> StoreResult<Vec<Record>>;

    /// Get storage statistics.
    fn stats(&self) -> StoreResult<StoreStats>;
}

/// Storage statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub records: usize,
    pub indexes: usize,
}
