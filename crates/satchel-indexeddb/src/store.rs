//! IndexedDB storage backend implementing the same contract as RecordStore and QueryStore.
//!
//! Because IndexedDB is inherently async, the methods here are async
//! equivalents of the synchronous `RecordStore` and `QueryStore` trait methods
//! from `satchel-core`. The method signatures and semantics match exactly —
//! same inputs, same outputs, same errors.
//!
//! Every public operation maps to one transaction scoped to the single object
//! store, opened in the minimum required mode. The only exception is
//! `update_fields`, which reads in one readonly transaction and writes in a
//! second readwrite one, as a merge needs the existing record first.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use satchel_core::{Record, RecordId, StoreConfig, StoreError, StoreResult};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use web_sys::{IdbDatabase, IdbIndex, IdbTransactionMode};

use crate::convert;
use crate::error::IndexedDbError;
use crate::idb;

/// Connection lifecycle. `Opening` publishes the in-flight open as a promise
/// so concurrent first operations share one open/upgrade sequence.
enum ConnState {
    Unopened,
    Opening(Promise),
    Open(IdbDatabase),
    Closed,
    Failed(String),
}

/// IndexedDB-backed record store for browser WASM.
///
/// One instance owns one logical connection, parameterized by database name,
/// store name, schema version, and the secondary indexes created on first
/// upgrade. The connection opens lazily before the first operation (or
/// eagerly via [`IndexedDbStore::open`]); every operation awaits an in-flight
/// open rather than racing it.
///
/// All methods are async because IndexedDB is callback-based. `Rc<RefCell>`
/// is enough for the shared state: WASM is single-threaded and the state is
/// only touched between await points.
pub struct IndexedDbStore {
    config: StoreConfig,
    state: Rc<RefCell<ConnState>>,
}

impl IndexedDbStore {
    /// Create a store that opens its connection lazily on first use.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Rc::new(RefCell::new(ConnState::Unopened)),
        })
    }

    /// Create a store and open the connection eagerly.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config)?;
        store.ensure_open().await.map_err(StoreError::from)?;
        Ok(store)
    }

    /// Close the connection. Terminal: later operations fail fast with
    /// `StoreError::Closed`.
    pub fn close(&self) {
        let prev = self.state.replace(ConnState::Closed);
        if let ConnState::Open(db) = prev {
            db.close();
        }
    }

    /// Delete a database by name (for testing/cleanup).
    pub async fn delete_database(db_name: &str) -> StoreResult<()> {
        idb::delete_database(db_name).await.map_err(StoreError::from)
    }

    /// The configuration this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Resolve the connection handle, opening it if necessary.
    ///
    /// Transitions: `Unopened` triggers the open; `Opening` awaits the shared
    /// promise and re-checks; `Closed` and `Failed` reject immediately.
    async fn ensure_open(&self) -> crate::Result<IdbDatabase> {
        loop {
            let pending = match &*self.state.borrow() {
                ConnState::Open(db) => return Ok(db.clone()),
                ConnState::Closed => return Err(IndexedDbError::Closed),
                ConnState::Failed(msg) => return Err(IndexedDbError::Open(msg.clone())),
                ConnState::Opening(gate) => Some(gate.clone()),
                ConnState::Unopened => None,
            };
            match pending {
                Some(gate) => {
                    // The gate always resolves (never rejects); the loop
                    // re-reads the state it guards.
                    let _ = wasm_bindgen_futures::JsFuture::from(gate).await;
                }
                None => return self.do_open().await,
            }
        }
    }

    async fn do_open(&self) -> crate::Result<IdbDatabase> {
        // Publish a gate promise other operations can await, holding its
        // resolve function so we can release them once the open settles.
        let release: Rc<RefCell<Option<js_sys::Function>>> = Rc::new(RefCell::new(None));
        let release_slot = release.clone();
        let gate = Promise::new(&mut move |resolve, _reject| {
            *release_slot.borrow_mut() = Some(resolve);
        });
        *self.state.borrow_mut() = ConnState::Opening(gate);

        let result = idb::open_database(&self.config).await;

        *self.state.borrow_mut() = match &result {
            Ok(db) => ConnState::Open(db.clone()),
            Err(e) => ConnState::Failed(e.to_string()),
        };
        if let Some(resolve) = release.borrow_mut().take() {
            let _ = resolve.call0(&JsValue::UNDEFINED);
        }

        result
    }

    fn begin(
        &self,
        db: &IdbDatabase,
        mode: IdbTransactionMode,
    ) -> crate::Result<(web_sys::IdbTransaction, web_sys::IdbObjectStore)> {
        idb::begin_transaction(db, &self.config.store_name, mode)
    }

    // ========================================================================
    // RecordStore methods (async equivalents)
    // ========================================================================

    /// Insert a record, or replace the record sharing its id.
    ///
    /// If the record carries no id, IndexedDB assigns the next autoincrement
    /// value. Returns the assigned or kept id. An `id` field that is present
    /// but not a non-negative integer fails with `StoreError::InvalidData`
    /// before the transaction opens; it would otherwise commit under a key
    /// unreachable through this API.
    pub async fn insert_or_update(&self, record: Record) -> StoreResult<RecordId> {
        record.checked_id()?;
        let js_val = convert::record_to_js(&record).map_err(StoreError::from)?;

        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        let req = store
            .put(&js_val)
            .map_err(|e| StoreError::Backend(format!("IDB put: {:?}", e)))?;
        let key = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        convert::js_to_id(&key).map_err(StoreError::from)
    }

    /// Retrieve a record by id. Returns `None` if not found.
    pub async fn get(&self, id: RecordId) -> StoreResult<Option<Record>> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readonly)
            .map_err(StoreError::from)?;

        let req = store
            .get(&convert::id_to_js(id))
            .map_err(|e| StoreError::Backend(format!("IDB get: {:?}", e)))?;

        let result = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }

        let record = convert::js_to_record(&result).map_err(StoreError::from)?;
        Ok(Some(record))
    }

    /// Check if a record exists.
    pub async fn exists(&self, id: RecordId) -> StoreResult<bool> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readonly)
            .map_err(StoreError::from)?;

        let req = store
            .count_with_key(&convert::id_to_js(id))
            .map_err(|e| StoreError::Backend(format!("IDB count: {:?}", e)))?;

        let result = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        let count = result.as_f64().unwrap_or(0.0) as u32;
        Ok(count > 0)
    }

    /// Retrieve every record, in ascending id order.
    pub async fn get_all(&self) -> StoreResult<Vec<Record>> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readonly)
            .map_err(StoreError::from)?;

        let req = store
            .get_all()
            .map_err(|e| StoreError::Backend(format!("IDB getAll: {:?}", e)))?;

        let result = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        let array = js_sys::Array::from(&result);
        let mut records = Vec::with_capacity(array.length() as usize);
        for i in 0..array.length() {
            let js_val = array.get(i);
            records.push(convert::js_to_record(&js_val).map_err(StoreError::from)?);
        }
        Ok(records)
    }

    /// Delete a record by id. Deleting an absent id is a no-op success.
    pub async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        let req = store
            .delete(&convert::id_to_js(id))
            .map_err(|e| StoreError::Backend(format!("IDB delete: {:?}", e)))?;

        idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(())
    }

    /// Merge `patch` over the record at `id`.
    ///
    /// Returns `StoreError::NotFound` if no record exists at `id`. The
    /// identity field is never overwritten by the patch.
    pub async fn update_fields(&self, id: RecordId, patch: Record) -> StoreResult<()> {
        let mut record = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
        record.merge(&patch);

        let js_val = convert::record_to_js(&record).map_err(StoreError::from)?;

        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        let req = store
            .put(&js_val)
            .map_err(|e| StoreError::Backend(format!("IDB put: {:?}", e)))?;
        idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(())
    }

    /// Get the total record count.
    pub async fn count(&self) -> StoreResult<usize> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readonly)
            .map_err(StoreError::from)?;

        let req = store
            .count()
            .map_err(|e| StoreError::Backend(format!("IDB count: {:?}", e)))?;

        let result = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(result.as_f64().unwrap_or(0.0) as usize)
    }

    /// Remove every record. The collection itself remains defined.
    pub async fn clear(&self) -> StoreResult<()> {
        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        let req = store
            .clear()
            .map_err(|e| StoreError::Backend(format!("IDB clear: {:?}", e)))?;

        idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(())
    }

    /// Insert a batch of records inside one readwrite transaction.
    ///
    /// All puts are issued up front and the call resolves only when the whole
    /// transaction completes; a failed member aborts every write. Returns the
    /// ids in input order.
    pub async fn insert_all(&self, records: Vec<Record>) -> StoreResult<Vec<RecordId>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut js_vals = Vec::with_capacity(records.len());
        for record in &records {
            record.checked_id()?;
            js_vals.push(convert::record_to_js(record).map_err(StoreError::from)?);
        }

        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        // Queue every put and attach every completion handler before the
        // first await, so the transaction never auto-commits between members
        // and no success event fires unobserved.
        let mut futures = Vec::with_capacity(js_vals.len());
        for js_val in &js_vals {
            let req = store
                .put(js_val)
                .map_err(|e| StoreError::Backend(format!("IDB put: {:?}", e)))?;
            futures.push(idb::request_future(&req));
        }

        let mut ids = Vec::with_capacity(futures.len());
        for fut in futures {
            let key = fut
                .await
                .map_err(|e| StoreError::Backend(format!("IDB put: {:?}", e)))?;
            ids.push(convert::js_to_id(&key).map_err(StoreError::from)?);
        }
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(ids)
    }

    /// Delete a batch of ids inside one readwrite transaction.
    pub async fn delete_all(&self, ids: &[RecordId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readwrite)
            .map_err(StoreError::from)?;

        for id in ids {
            store
                .delete(&convert::id_to_js(*id))
                .map_err(|e| StoreError::Backend(format!("IDB delete: {:?}", e)))?;
        }
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        Ok(())
    }

    // ========================================================================
    // QueryStore methods (async equivalents)
    // ========================================================================

    /// Look up at most one record whose `index` field equals `value`.
    ///
    /// Fails with `StoreError::IndexNotFound` if the index was not declared
    /// in the `StoreConfig` this store was created with.
    pub async fn get_by_index(&self, index: &str, value: &Value) -> StoreResult<Option<Record>> {
        if !self.config.has_index(index) {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }

        let key = convert::value_to_js(value).map_err(StoreError::from)?;

        let db = self.ensure_open().await.map_err(StoreError::from)?;
        let (tx, store) = self
            .begin(&db, IdbTransactionMode::Readonly)
            .map_err(StoreError::from)?;

        let idx: IdbIndex = store
            .index(index)
            .map_err(|_| StoreError::IndexNotFound(index.to_string()))?;

        let req = idx
            .get(&key)
            .map_err(|e| StoreError::Backend(format!("IDB index get: {:?}", e)))?;

        let result = idb::await_request(&req).await.map_err(StoreError::from)?;
        idb::await_transaction(&tx).await.map_err(StoreError::from)?;

        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }

        let record = convert::js_to_record(&result).map_err(StoreError::from)?;
        Ok(Some(record))
    }

    /// Retrieve every record matching `predicate`, in ascending id order.
    ///
    /// Runs against the full materialized set — O(collection size) per call.
    pub async fn get_by_filter<P>(&self, predicate: P) -> StoreResult<Vec<Record>>
    where
        P: Fn(&Record) -> bool,
    {
        let all = self.get_all().await?;
        Ok(all.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Retrieve records with `low <= id <= high`, in ascending id order.
    ///
    /// Bounds are inclusive. Implemented as a full scan plus a local filter,
    /// not an index-accelerated key-range cursor.
    pub async fn get_by_range(&self, low: RecordId, high: RecordId) -> StoreResult<Vec<Record>> {
        if low > high {
            return Ok(Vec::new());
        }
        self.get_by_filter(|r| matches!(r.id(), Some(id) if id >= low && id <= high))
            .await
    }
}
