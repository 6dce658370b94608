//! Record model and store configuration
//!
//! A record is an open-ended JSON object. The only field with a role is the
//! numeric identity field `id`, which serves as the primary key; everything
//! else is an opaque payload to the store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::error::{StoreError, StoreResult};

/// Name of the identity field every stored record carries.
pub const ID_FIELD: &str = "id";

/// Primary key type. IndexedDB key generators produce integers starting at 1,
/// so ids fit a `u64` (JS numbers hold integers up to 2^53 exactly).
pub type RecordId = u64;

/// An open-ended record: a mapping from field name to JSON value.
///
/// A record passed to insert may omit `id`; the store assigns the next
/// autoincrement value and the stored copy carries it from then on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Builder-style field setter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The record's identity, if it carries one.
    ///
    /// Returns `None` when the `id` field is absent or not a non-negative
    /// integer.
    pub fn id(&self) -> Option<RecordId> {
        self.fields.get(ID_FIELD).and_then(Value::as_u64)
    }

    /// The record's identity, validated for storage.
    ///
    /// `Ok(None)` when the `id` field is absent (the store assigns one),
    /// `Ok(Some(id))` for a non-negative integer, and
    /// `StoreError::InvalidData` when the field is present but unusable as a
    /// key (fractional, negative, or non-numeric). Insert paths check this
    /// before writing so a malformed id is never stored or silently
    /// reassigned.
    pub fn checked_id(&self) -> StoreResult<Option<RecordId>> {
        match self.fields.get(ID_FIELD) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                StoreError::InvalidData(format!("id is not a non-negative integer: {}", value))
            }),
        }
    }

    /// Set the identity field, replacing any previous value.
    pub fn set_id(&mut self, id: RecordId) {
        self.fields.insert(ID_FIELD.to_string(), Value::from(id));
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Merge `patch` over this record, field by field.
    ///
    /// The identity field is never overwritten by a patch.
    pub fn merge(&mut self, patch: &Record) {
        for (name, value) in &patch.fields {
            if name == ID_FIELD {
                continue;
            }
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A secondary index declaration.
///
/// Indexes exist only if declared at schema-creation time; looking up an
/// undeclared index fails with `StoreError::IndexNotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Field the index covers. Also used as the index name.
    pub field: String,
    /// Whether the index enforces unique values.
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Configuration for one store: database name, collection name, schema
/// version, and the secondary indexes created on first upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_name: String,
    pub store_name: String,
    pub version: u32,
    pub indexes: Vec<IndexSpec>,
}

impl StoreConfig {
    /// Configuration with schema version 1 and no secondary indexes.
    pub fn new(db_name: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            store_name: store_name.into(),
            version: 1,
            indexes: Vec::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Check the configuration before a backend opens it.
    pub fn validate(&self) -> StoreResult<()> {
        if self.db_name.is_empty() {
            return Err(StoreError::Connection("database name is empty".into()));
        }
        if self.store_name.is_empty() {
            return Err(StoreError::Connection("store name is empty".into()));
        }
        if self.version == 0 {
            return Err(StoreError::Connection(
                "schema version must be a positive integer".into(),
            ));
        }
        Ok(())
    }

    /// Whether an index on `field` was declared.
    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.iter().any(|i| i.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_accessor() {
        let record = Record::new().field("id", 7).field("name", "x");
        assert_eq!(record.id(), Some(7));

        let record = Record::new().field("name", "x");
        assert_eq!(record.id(), None);

        // A non-integer id does not count as an identity
        let record = Record::new().field("id", "seven");
        assert_eq!(record.id(), None);
    }

    #[test]
    fn test_checked_id() {
        assert_eq!(Record::new().checked_id().unwrap(), None);
        assert_eq!(Record::new().field("id", 7).checked_id().unwrap(), Some(7));

        // Present but unusable as a key
        assert!(Record::new().field("id", 1.5).checked_id().is_err());
        assert!(Record::new().field("id", -1).checked_id().is_err());
        assert!(Record::new().field("id", "seven").checked_id().is_err());
    }

    #[test]
    fn test_merge_preserves_id() {
        let mut record = Record::new().field("id", 1).field("name", "A").field("age", 1);
        let patch = Record::new().field("id", 99).field("age", 2);

        record.merge(&patch);

        assert_eq!(record.id(), Some(1));
        assert_eq!(record.get("name"), Some(&json!("A")));
        assert_eq!(record.get("age"), Some(&json!(2)));
    }

    #[test]
    fn test_config_validate() {
        assert!(StoreConfig::new("testDB", "testStore").validate().is_ok());
        assert!(StoreConfig::new("", "testStore").validate().is_err());
        assert!(StoreConfig::new("testDB", "").validate().is_err());
        assert!(StoreConfig::new("testDB", "testStore")
            .version(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_indexes() {
        let config = StoreConfig::new("testDB", "testStore")
            .index(IndexSpec::new("name"))
            .index(IndexSpec::new("email").unique());

        assert!(config.has_index("name"));
        assert!(config.has_index("email"));
        assert!(!config.has_index("age"));
        assert!(config.indexes[1].unique);
    }
}
