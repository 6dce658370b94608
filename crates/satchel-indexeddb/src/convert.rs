//! Record <-> JS value conversion
//!
//! Records are open-ended JSON objects, so the whole conversion goes through
//! the JSON boundary: `JSON.parse` on the way in (IndexedDB needs a real JS
//! object for the `id` keyPath to apply), `JSON.stringify` on the way out.

use satchel_core::{Record, RecordId};
use serde_json::Value;
use wasm_bindgen::JsValue;

use crate::error::{IndexedDbError, Result};

/// Convert a record to a JS object for IndexedDB storage.
pub fn record_to_js(record: &Record) -> Result<JsValue> {
    let json = serde_json::to_string(record)?;
    js_sys::JSON::parse(&json)
        .map_err(|e| IndexedDbError::JsValue(format!("JSON.parse: {:?}", e)))
}

/// Convert a JS object from IndexedDB back to a record.
pub fn js_to_record(val: &JsValue) -> Result<Record> {
    let json = js_sys::JSON::stringify(val)
        .map_err(|e| IndexedDbError::JsValue(format!("JSON.stringify: {:?}", e)))?;
    let json = String::from(json);
    Ok(serde_json::from_str(&json)?)
}

/// Convert a JSON value (index lookup key, etc.) to a JS value.
pub fn value_to_js(value: &Value) -> Result<JsValue> {
    let json = serde_json::to_string(value)?;
    js_sys::JSON::parse(&json)
        .map_err(|e| IndexedDbError::JsValue(format!("JSON.parse: {:?}", e)))
}

/// Convert a record id to an IndexedDB key.
pub fn id_to_js(id: RecordId) -> JsValue {
    JsValue::from_f64(id as f64)
}

/// Read a record id back from an IndexedDB key (e.g. a put request's result).
pub fn js_to_id(val: &JsValue) -> Result<RecordId> {
    let key = val
        .as_f64()
        .ok_or_else(|| IndexedDbError::JsValue(format!("key is not a number: {:?}", val)))?;
    if key < 0.0 || key.fract() != 0.0 {
        return Err(IndexedDbError::JsValue(format!(
            "key is not a non-negative integer: {}",
            key
        )));
    }
    Ok(key as RecordId)
}
