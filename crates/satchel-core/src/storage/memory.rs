//! In-memory storage backend
//!
//! A BTreeMap-based implementation for testing and development. Iteration
//! order is ascending id, matching the key order of the persistent backends.
//! Not suitable for production use due to lack of persistence.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::record::{IndexSpec, Record, RecordId, StoreConfig};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::traits::{QueryStore, RecordStore, StoreStats};

/// In-memory record store.
///
/// Stores records in a BTreeMap keyed by id. Useful for:
/// - Unit testing
/// - Development/prototyping
/// - Short-lived processes that don't need persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<RecordId, Record>,
    indexes: Vec<IndexSpec>,
    // Key generator state. Monotonic: ids are never reused after deletes,
    // and caller-supplied ids bump the counter past themselves.
    next_id: RecordId,
}

impl MemoryStore {
    /// Create a new empty memory store with no secondary indexes.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            indexes: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a memory store honoring the indexes declared in `config`.
    pub fn with_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            records: BTreeMap::new(),
            indexes: config.indexes.clone(),
            next_id: 1,
        })
    }

    /// Create a memory store with initial records.
    pub fn with_records(records: Vec<Record>) -> Self {
        let mut store = Self::new();
        for record in records {
            let _ = store.insert_or_update(record);
        }
        store
    }

    fn assign_id(&mut self, record: &mut Record) -> StoreResult<RecordId> {
        match record.checked_id()? {
            Some(id) => {
                if id >= self.next_id {
                    self.next_id = id + 1;
                }
                Ok(id)
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                record.set_id(id);
                Ok(id)
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn insert_or_update(&mut self, mut record: Record) -> StoreResult<RecordId> {
        let id = self.assign_id(&mut record)?;
        self.records.insert(id, record);
        Ok(id)
    }

    fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        Ok(self.records.get(&id).cloned())
    }

    fn get_all(&self) -> StoreResult<Vec<Record>> {
        Ok(self.records.values().cloned().collect())
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        self.records.remove(&id);
        Ok(())
    }

    fn update_fields(&mut self, id: RecordId, patch: Record) -> StoreResult<()> {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.merge(&patch);
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.records.clear();
        Ok(())
    }

    fn insert_all(&mut self, records: Vec<Record>) -> StoreResult<Vec<RecordId>> {
        // Validate every member before touching state so a malformed id
        // leaves the whole batch unapplied.
        for record in &records {
            record.checked_id()?;
        }
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.insert_or_update(record)?);
        }
        Ok(ids)
    }

    fn delete_all(&mut self, ids: &[RecordId]) -> StoreResult<()> {
        for id in ids {
            self.records.remove(id);
        }
        Ok(())
    }
}

impl QueryStore for MemoryStore {
    fn get_by_index(&self, index: &str, value: &Value) -> StoreResult<Option<Record>> {
        if !self.indexes.iter().any(|i| i.field == index) {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        Ok(self
            .records
            .values()
            .find(|r| r.get(index) == Some(value))
            .cloned())
    }

    fn get_by_filter(&self, predicate: &dyn Fn(&Record) -> bool) -> StoreResult<Vec<Record>> {
        Ok(self
            .records
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn get_by_range(&self, low: RecordId, high: RecordId) -> StoreResult<Vec<Record>> {
        if low > high {
            return Ok(Vec::new());
        }
        Ok(self.records.range(low..=high).map(|(_, r)| r.clone()).collect())
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            records: self.records.len(),
            indexes: self.indexes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_record(id: RecordId, name: &str) -> Record {
        Record::new().field("id", id).field("name", name)
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = MemoryStore::new();

        let id = store.insert_or_update(test_record(1, "Test Item")).unwrap();
        assert_eq!(id, 1);

        let retrieved = store.get(1).unwrap().unwrap();
        assert_eq!(retrieved.get("name"), Some(&json!("Test Item")));
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let mut store = MemoryStore::new();

        store.insert_or_update(test_record(1, "first")).unwrap();
        store.insert_or_update(test_record(1, "second")).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("name"), Some(&json!("second")));
    }

    #[test]
    fn test_autoincrement() {
        let mut store = MemoryStore::new();

        let mut ids = Vec::new();
        for i in 0..5 {
            let id = store
                .insert_or_update(Record::new().field("n", i))
                .unwrap();
            ids.push(id);
        }

        // Strictly increasing, distinct
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(store.count().unwrap(), 5);

        // Assigned id is written back into the stored record
        let first = store.get(ids[0]).unwrap().unwrap();
        assert_eq!(first.id(), Some(ids[0]));
    }

    #[test]
    fn test_insert_rejects_non_integer_id() {
        let mut store = MemoryStore::new();

        // A fractional id must fail, not be silently reassigned
        let result = store.insert_or_update(Record::new().field("id", 1.5).field("name", "x"));
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        let result = store.insert_or_update(Record::new().field("id", -1).field("name", "x"));
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        let result = store.insert_or_update(Record::new().field("id", "seven"));
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        assert_eq!(store.count().unwrap(), 0);

        // The key generator was not advanced by the rejected inserts
        let id = store.insert_or_update(Record::new().field("name", "ok")).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_bulk_insert_rejects_batch_with_bad_id() {
        let mut store = MemoryStore::new();

        let result = store.insert_all(vec![
            test_record(1, "good"),
            Record::new().field("id", 2.5).field("name", "bad"),
        ]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        // Nothing from the batch was applied
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_autoincrement_skips_explicit_ids() {
        let mut store = MemoryStore::new();

        store.insert_or_update(test_record(10, "explicit")).unwrap();
        let next = store
            .insert_or_update(Record::new().field("name", "generated"))
            .unwrap();
        assert_eq!(next, 11);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut store = MemoryStore::new();

        let a = store.insert_or_update(Record::new()).unwrap();
        store.delete(a).unwrap();
        let b = store.insert_or_update(Record::new()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_delete_idempotent() {
        let mut store = MemoryStore::new();
        store.insert_or_update(test_record(1, "x")).unwrap();

        store.delete(1).unwrap();
        store.delete(1).unwrap();
        assert!(!store.exists(1).unwrap());
    }

    #[test]
    fn test_clear() {
        let mut store = MemoryStore::new();
        for i in 1..=3 {
            store.insert_or_update(test_record(i, "x")).unwrap();
        }

        store.clear().unwrap();

        assert_eq!(store.get_all().unwrap(), Vec::new());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_fields_merges() {
        let mut store = MemoryStore::new();
        store
            .insert_or_update(Record::new().field("id", 1).field("name", "A").field("age", 1))
            .unwrap();

        store
            .update_fields(1, Record::new().field("age", 2))
            .unwrap();

        let record = store.get(1).unwrap().unwrap();
        assert_eq!(record.id(), Some(1));
        assert_eq!(record.get("name"), Some(&json!("A")));
        assert_eq!(record.get("age"), Some(&json!(2)));
    }

    #[test]
    fn test_update_fields_not_found() {
        let mut store = MemoryStore::new();
        let result = store.update_fields(999, Record::new().field("x", 1));
        assert!(matches!(result, Err(StoreError::NotFound(999))));
    }

    #[test]
    fn test_update_fields_never_overwrites_id() {
        let mut store = MemoryStore::new();
        store.insert_or_update(test_record(1, "A")).unwrap();

        store
            .update_fields(1, Record::new().field("id", 42).field("name", "B"))
            .unwrap();

        let record = store.get(1).unwrap().unwrap();
        assert_eq!(record.id(), Some(1));
        assert_eq!(record.get("name"), Some(&json!("B")));
        assert!(!store.exists(42).unwrap());
    }

    #[test]
    fn test_range_inclusive() {
        let mut store = MemoryStore::new();
        for i in 1..=5 {
            store.insert_or_update(test_record(i, "x")).unwrap();
        }

        let hits = store.get_by_range(2, 4).unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        assert!(store.get_by_range(4, 2).unwrap().is_empty());
    }

    #[test]
    fn test_filter_preserves_id_order() {
        let mut store = MemoryStore::new();
        for i in 1..=6 {
            store
                .insert_or_update(Record::new().field("id", i).field("even", i % 2 == 0))
                .unwrap();
        }

        let hits = store
            .get_by_filter(&|r| r.get("even") == Some(&json!(true)))
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, vec![2, 4, 6]);
    }

    #[test]
    fn test_get_by_index() {
        let config = StoreConfig::new("testDB", "testStore").index(IndexSpec::new("name"));
        let mut store = MemoryStore::with_config(&config).unwrap();

        store.insert_or_update(test_record(1, "alpha")).unwrap();
        store.insert_or_update(test_record(2, "beta")).unwrap();

        let hit = store.get_by_index("name", &json!("beta")).unwrap().unwrap();
        assert_eq!(hit.id(), Some(2));

        let miss = store.get_by_index("name", &json!("gamma")).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_get_by_index_undeclared() {
        let store = MemoryStore::new();
        let result = store.get_by_index("name", &json!("alpha"));
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
    }

    #[test]
    fn test_bulk_insert_and_delete() {
        let mut store = MemoryStore::new();

        let ids = store
            .insert_all(vec![test_record(10, "a"), test_record(11, "b")])
            .unwrap();
        assert_eq!(ids, vec![10, 11]);
        assert!(store.exists(10).unwrap());
        assert!(store.exists(11).unwrap());

        store.delete_all(&[10, 11, 12]).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let config = StoreConfig::new("testDB", "testStore")
            .index(IndexSpec::new("name"))
            .index(IndexSpec::new("email").unique());
        let mut store = MemoryStore::with_config(&config).unwrap();
        store.insert_or_update(test_record(1, "x")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.indexes, 2);
    }
}
