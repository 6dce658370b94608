//! Browser integration tests for IndexedDbStore
//!
//! Run with `wasm-pack test --headless --chrome` (or firefox). Each test uses
//! its own database name and deletes it up front, so runs are independent.

#![cfg(target_arch = "wasm32")]

use satchel_core::{IndexSpec, Record, StoreConfig, StoreError};
use satchel_indexeddb::IndexedDbStore;
use serde_json::json;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

async fn fresh_store(db_name: &str) -> IndexedDbStore {
    IndexedDbStore::delete_database(db_name).await.unwrap();
    IndexedDbStore::open(StoreConfig::new(db_name, "testStore"))
        .await
        .unwrap()
}

fn test_record(id: u64, name: &str) -> Record {
    Record::new().field("id", id).field("name", name)
}

#[wasm_bindgen_test]
async fn test_insert_get_clear_scenario() {
    let store = fresh_store("satchel-test-scenario").await;

    let id = store
        .insert_or_update(test_record(1, "Test Item"))
        .await
        .unwrap();
    assert_eq!(id, 1);

    let retrieved = store.get(1).await.unwrap().unwrap();
    assert_eq!(retrieved.get("name"), Some(&json!("Test Item")));

    store.clear().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
}

#[wasm_bindgen_test]
async fn test_insert_same_id_replaces() {
    let store = fresh_store("satchel-test-replace").await;

    store.insert_or_update(test_record(1, "first")).await.unwrap();
    store.insert_or_update(test_record(1, "second")).await.unwrap();

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("name"), Some(&json!("second")));
}

#[wasm_bindgen_test]
async fn test_autoincrement() {
    let store = fresh_store("satchel-test-autoincrement").await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let id = store
            .insert_or_update(Record::new().field("n", i))
            .await
            .unwrap();
        ids.push(id);
    }

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert_eq!(store.count().await.unwrap(), 5);
}

#[wasm_bindgen_test]
async fn test_insert_rejects_fractional_id() {
    let store = fresh_store("satchel-test-bad-id").await;

    // Rejected before the transaction opens; nothing may commit under a key
    // unreachable through the u64 API
    let result = store
        .insert_or_update(Record::new().field("id", 1.5).field("name", "x"))
        .await;
    assert!(matches!(result, Err(StoreError::InvalidData(_))));

    let result = store
        .insert_or_update(Record::new().field("id", "seven"))
        .await;
    assert!(matches!(result, Err(StoreError::InvalidData(_))));

    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.get_all().await.unwrap().is_empty());
}

#[wasm_bindgen_test]
async fn test_bulk_insert_rejects_batch_with_bad_id() {
    let store = fresh_store("satchel-test-bulk-bad-id").await;

    let result = store
        .insert_all(vec![
            test_record(1, "good"),
            Record::new().field("id", 2.5).field("name", "bad"),
        ])
        .await;
    assert!(matches!(result, Err(StoreError::InvalidData(_))));

    // Nothing from the batch was applied
    assert_eq!(store.count().await.unwrap(), 0);
}

#[wasm_bindgen_test]
async fn test_open_blocked_by_older_version_connection() {
    let db_name = "satchel-test-blocked";
    IndexedDbStore::delete_database(db_name).await.unwrap();

    let first = IndexedDbStore::open(StoreConfig::new(db_name, "testStore"))
        .await
        .unwrap();

    // The held v1 connection blocks a v2 open; the call must reject rather
    // than hang
    let result = IndexedDbStore::open(StoreConfig::new(db_name, "testStore").version(2)).await;
    assert!(matches!(result, Err(StoreError::Connection(_))));

    first.close();
}

#[wasm_bindgen_test]
async fn test_delete_idempotent() {
    let store = fresh_store("satchel-test-delete").await;
    store.insert_or_update(test_record(1, "x")).await.unwrap();

    store.delete(1).await.unwrap();
    store.delete(1).await.unwrap();
    assert!(!store.exists(1).await.unwrap());
}

#[wasm_bindgen_test]
async fn test_clear_totality() {
    let store = fresh_store("satchel-test-clear").await;
    for i in 1..=3 {
        store.insert_or_update(test_record(i, "x")).await.unwrap();
    }

    store.clear().await.unwrap();

    assert!(store.get_all().await.unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[wasm_bindgen_test]
async fn test_update_fields_merges() {
    let store = fresh_store("satchel-test-update").await;
    store
        .insert_or_update(Record::new().field("id", 1).field("name", "A").field("age", 1))
        .await
        .unwrap();

    store
        .update_fields(1, Record::new().field("age", 2))
        .await
        .unwrap();

    let record = store.get(1).await.unwrap().unwrap();
    assert_eq!(record.id(), Some(1));
    assert_eq!(record.get("name"), Some(&json!("A")));
    assert_eq!(record.get("age"), Some(&json!(2)));
}

#[wasm_bindgen_test]
async fn test_update_fields_not_found() {
    let store = fresh_store("satchel-test-update-missing").await;

    let result = store.update_fields(999, Record::new().field("x", 1)).await;
    assert!(matches!(result, Err(StoreError::NotFound(999))));
}

#[wasm_bindgen_test]
async fn test_range_inclusive() {
    let store = fresh_store("satchel-test-range").await;
    for i in 1..=5 {
        store.insert_or_update(test_record(i, "x")).await.unwrap();
    }

    let hits = store.get_by_range(2, 4).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|r| r.id().unwrap()).collect();
    assert_eq!(ids, vec![2, 3, 4]);
}

#[wasm_bindgen_test]
async fn test_bulk_insert_visible_after_resolution() {
    let store = fresh_store("satchel-test-bulk").await;

    let ids = store
        .insert_all(vec![test_record(10, "a"), test_record(11, "b")])
        .await
        .unwrap();
    assert_eq!(ids, vec![10, 11]);

    assert!(store.exists(10).await.unwrap());
    assert!(store.exists(11).await.unwrap());
    assert_eq!(store.get_all().await.unwrap().len(), 2);

    store.delete_all(&[10, 11]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

#[wasm_bindgen_test]
async fn test_get_by_filter() {
    let store = fresh_store("satchel-test-filter").await;
    for i in 1..=6u64 {
        store
            .insert_or_update(Record::new().field("id", i).field("even", i % 2 == 0))
            .await
            .unwrap();
    }

    let hits = store
        .get_by_filter(|r| r.get("even") == Some(&json!(true)))
        .await
        .unwrap();
    let ids: Vec<_> = hits.iter().map(|r| r.id().unwrap()).collect();
    assert_eq!(ids, vec![2, 4, 6]);
}

#[wasm_bindgen_test]
async fn test_get_by_index() {
    let db_name = "satchel-test-index";
    IndexedDbStore::delete_database(db_name).await.unwrap();
    let store = IndexedDbStore::open(
        StoreConfig::new(db_name, "testStore").index(IndexSpec::new("name")),
    )
    .await
    .unwrap();

    store.insert_or_update(test_record(1, "alpha")).await.unwrap();
    store.insert_or_update(test_record(2, "beta")).await.unwrap();

    let hit = store
        .get_by_index("name", &json!("beta"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.id(), Some(2));

    let miss = store.get_by_index("name", &json!("gamma")).await.unwrap();
    assert!(miss.is_none());
}

#[wasm_bindgen_test]
async fn test_get_by_index_undeclared() {
    let store = fresh_store("satchel-test-index-undeclared").await;

    let result = store.get_by_index("name", &json!("alpha")).await;
    assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
}

#[wasm_bindgen_test]
async fn test_lazy_open_on_first_operation() {
    let db_name = "satchel-test-lazy";
    IndexedDbStore::delete_database(db_name).await.unwrap();

    let store = IndexedDbStore::new(StoreConfig::new(db_name, "testStore")).unwrap();
    let id = store
        .insert_or_update(Record::new().field("name", "lazy"))
        .await
        .unwrap();
    assert!(store.exists(id).await.unwrap());
}

#[wasm_bindgen_test]
async fn test_close_then_use_fails_fast() {
    let store = fresh_store("satchel-test-close").await;
    store.insert_or_update(test_record(1, "x")).await.unwrap();

    store.close();

    let result = store.get(1).await;
    assert!(matches!(result, Err(StoreError::Closed)));
    let result = store.insert_or_update(test_record(2, "y")).await;
    assert!(matches!(result, Err(StoreError::Closed)));
}
