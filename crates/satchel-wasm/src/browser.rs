//! Browser WASM bindings using wasm-bindgen and IndexedDB storage
//!
//! Provides browser-compatible functions for storing and retrieving records
//! using IndexedDB. The store is registered explicitly via [`init_store`] —
//! there is no module-load side effect on the global object.
//!
//! Records cross the boundary as JSON strings matching their stored shape;
//! ids cross as JS numbers.

use satchel_core::{IndexSpec, Record, RecordId, StoreConfig};
use satchel_indexeddb::{convert, IndexedDbStore};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Global store instance (initialized via init_store)
/// Using Rc<RefCell<>> because WASM is single-threaded and we need to share across async boundaries
thread_local! {
    static STORE: RefCell<Option<Rc<IndexedDbStore>>> = RefCell::new(None);
}

/// Default database name for browser IndexedDB storage
const DEFAULT_DB_NAME: &str = "satchel";

/// Default object store name
const DEFAULT_STORE_NAME: &str = "records";

/// Initialize the IndexedDB store. Must be called before any storage operations.
/// Returns a Promise that resolves when initialization is complete.
///
/// `indexes_json` is an optional JSON array of `{"field": "...", "unique": bool}`
/// entries declaring the secondary indexes created on first schema upgrade.
#[wasm_bindgen]
pub async fn init_store(
    db_name: Option<String>,
    store_name: Option<String>,
    version: Option<u32>,
    indexes_json: Option<String>,
) -> Result<(), JsValue> {
    // Route Rust panics to console.error instead of "RuntimeError: unreachable"
    console_error_panic_hook::set_once();

    let mut config = StoreConfig::new(
        db_name.unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
        store_name.unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
    );
    if let Some(version) = version {
        config = config.version(version);
    }
    if let Some(json) = indexes_json {
        let specs: Vec<IndexSpec> = serde_json::from_str(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid indexes JSON: {}", e)))?;
        for spec in specs {
            config = config.index(spec);
        }
    }

    let store = IndexedDbStore::open(config)
        .await
        .map_err(|e| JsValue::from_str(&format!("Failed to open IndexedDB: {:?}", e)))?;

    STORE.with(|s| {
        let mut s = s.borrow_mut();
        if s.is_some() {
            return Err(JsValue::from_str("Store already initialized"));
        }
        *s = Some(Rc::new(store));
        Ok(())
    })
}

/// Close the store and drop the registration. A later `init_store` may
/// register a fresh one.
#[wasm_bindgen]
pub fn close_store() {
    STORE.with(|s| {
        if let Some(store) = s.borrow_mut().take() {
            store.close();
        }
    });
}

/// Get a clone of the store Rc. Panics if not initialized.
fn get_store() -> Rc<IndexedDbStore> {
    STORE.with(|s| {
        s.borrow()
            .as_ref()
            .expect("Store not initialized. Call init_store() first.")
            .clone()
    })
}

fn parse_id(id: f64) -> Result<RecordId, JsValue> {
    if id < 0.0 || id.fract() != 0.0 {
        return Err(JsValue::from_str(&format!(
            "Invalid id: {} is not a non-negative integer",
            id
        )));
    }
    Ok(id as RecordId)
}

// ============================================================================
// Storage operations
// ============================================================================

/// Insert a record, or replace the record sharing its id.
/// Returns a Promise that resolves to the assigned or kept id.
#[wasm_bindgen]
pub async fn insert_or_update(record_json: &str) -> Result<f64, JsValue> {
    let record: Record = serde_json::from_str(record_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid JSON: {}", e)))?;

    let store = get_store();
    let id = store
        .insert_or_update(record)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    Ok(id as f64)
}

/// Retrieve a record by id.
/// Returns a Promise that resolves to the JSON-serialized record or null if not found.
#[wasm_bindgen]
pub async fn get_by_id(id: f64) -> Result<Option<String>, JsValue> {
    let store = get_store();
    let result = store
        .get(parse_id(id)?)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    match result {
        Some(record) => {
            let json = serde_json::to_string(&record)
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;
            Ok(Some(json))
        }
        None => Ok(None),
    }
}

/// Retrieve every record, in ascending id order.
/// Returns a Promise that resolves to a JSON array.
#[wasm_bindgen]
pub async fn get_all() -> Result<String, JsValue> {
    let store = get_store();
    let records = store
        .get_all()
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    serde_json::to_string(&records)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Delete a record by id. Deleting an absent id is a no-op success.
#[wasm_bindgen]
pub async fn delete_by_id(id: f64) -> Result<(), JsValue> {
    let store = get_store();
    store
        .delete(parse_id(id)?)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))
}

/// Remove every record. The collection itself remains defined.
#[wasm_bindgen]
pub async fn clear() -> Result<(), JsValue> {
    let store = get_store();
    store
        .clear()
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))
}

/// Check if a record exists.
#[wasm_bindgen]
pub async fn exists(id: f64) -> Result<bool, JsValue> {
    let store = get_store();
    store
        .exists(parse_id(id)?)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))
}

/// Get the total record count.
#[wasm_bindgen]
pub async fn count() -> Result<f64, JsValue> {
    let store = get_store();
    let n = store
        .count()
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;
    Ok(n as f64)
}

/// Merge a JSON patch over the record at `id`.
/// Rejects if no record exists at `id`. The id field is never overwritten.
#[wasm_bindgen]
pub async fn update_fields(id: f64, patch_json: &str) -> Result<(), JsValue> {
    let patch: Record = serde_json::from_str(patch_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid JSON: {}", e)))?;

    let store = get_store();
    store
        .update_fields(parse_id(id)?, patch)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))
}

/// Look up at most one record whose indexed field equals the given JSON value.
/// Returns a Promise that resolves to the JSON-serialized record or null.
#[wasm_bindgen]
pub async fn get_by_index(index: &str, value_json: &str) -> Result<Option<String>, JsValue> {
    let value: serde_json::Value = serde_json::from_str(value_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid JSON: {}", e)))?;

    let store = get_store();
    let result = store
        .get_by_index(index, &value)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    match result {
        Some(record) => {
            let json = serde_json::to_string(&record)
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;
            Ok(Some(json))
        }
        None => Ok(None),
    }
}

/// Retrieve every record the JS predicate accepts, in ascending id order.
/// The predicate receives each record as a JS object and returns truthy/falsy.
#[wasm_bindgen]
pub async fn get_by_filter(predicate: js_sys::Function) -> Result<String, JsValue> {
    let store = get_store();
    let records = store
        .get_by_filter(|record| {
            let js_val = match convert::record_to_js(record) {
                Ok(v) => v,
                Err(_) => return false,
            };
            predicate
                .call1(&JsValue::UNDEFINED, &js_val)
                .map(|v| v.is_truthy())
                .unwrap_or(false)
        })
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    serde_json::to_string(&records)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Retrieve records with `low <= id <= high` (inclusive), in ascending id order.
#[wasm_bindgen]
pub async fn get_by_range(low: f64, high: f64) -> Result<String, JsValue> {
    let store = get_store();
    let records = store
        .get_by_range(parse_id(low)?, parse_id(high)?)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    serde_json::to_string(&records)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Insert a JSON array of records as one atomic transaction.
/// Returns a Promise that resolves to the array of assigned ids.
#[wasm_bindgen]
pub async fn insert_all(records_json: &str) -> Result<Vec<f64>, JsValue> {
    let records: Vec<Record> = serde_json::from_str(records_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid JSON: {}", e)))?;

    let store = get_store();
    let ids = store
        .insert_all(records)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))?;

    Ok(ids.into_iter().map(|id| id as f64).collect())
}

/// Delete a batch of ids as one atomic transaction.
#[wasm_bindgen]
pub async fn delete_all(ids: Vec<f64>) -> Result<(), JsValue> {
    let ids = ids
        .into_iter()
        .map(parse_id)
        .collect::<Result<Vec<RecordId>, JsValue>>()?;

    let store = get_store();
    store
        .delete_all(&ids)
        .await
        .map_err(|e| JsValue::from_str(&format!("Store error: {:?}", e)))
}
