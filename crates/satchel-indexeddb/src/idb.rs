//! Low-level IndexedDB helpers using web-sys
//!
//! Wraps the callback-based IndexedDB API into Rust futures using
//! `wasm_bindgen_futures::JsFuture` and `js_sys::Promise`.

use js_sys::Promise;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbFactory, IdbObjectStore, IdbOpenDbRequest, IdbRequest, IdbTransaction,
    IdbTransactionMode,
};

use satchel_core::{StoreConfig, ID_FIELD};

use crate::error::{IndexedDbError, Result};

// Reject marker used by the onblocked handler so open_database can tell a
// blocked open apart from an ordinary open failure.
const BLOCKED_MARKER: &str = "__satchel_blocked__";

/// Type alias for upgrade closure to reduce complexity
type UpgradeClosure = Rc<RefCell<Option<Closure<dyn FnMut(web_sys::IdbVersionChangeEvent)>>>>;

/// Get the global IndexedDB factory.
pub fn idb_factory() -> Result<IdbFactory> {
    let global = js_sys::global();

    let idb: JsValue = js_sys::Reflect::get(&global, &"indexedDB".into())
        .map_err(|_| IndexedDbError::NotAvailable("no indexedDB on global".into()))?;

    if idb.is_undefined() || idb.is_null() {
        return Err(IndexedDbError::NotAvailable(
            "indexedDB is null/undefined".into(),
        ));
    }

    idb.dyn_into::<IdbFactory>()
        .map_err(|_| IndexedDbError::NotAvailable("indexedDB is not IdbFactory".into()))
}

/// Convert an IdbRequest into a JS Promise that resolves with the request's result.
fn request_to_promise(req: &IdbRequest) -> Promise {
    let req_success = req.clone();
    let req_error = req.clone();

    Promise::new(&mut move |resolve, reject| {
        // Store closures in Rc<RefCell> to manage their lifetime without leaking
        type ClosurePair = (
            Closure<dyn FnMut(web_sys::Event)>,
            Closure<dyn FnMut(web_sys::Event)>,
        );
        let closures: Rc<RefCell<Option<ClosurePair>>> = Rc::new(RefCell::new(None));

        let req_s = req_success.clone();
        let closures_for_success = closures.clone();
        let on_success = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let result = req_s.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::UNDEFINED, &result);
            *closures_for_success.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let req_e = req_error.clone();
        let closures_for_error = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = req_e
                .error()
                .map(|opt| {
                    opt.map(|e| JsValue::from(e.message()))
                        .unwrap_or_else(|| JsValue::from_str("unknown IDB error"))
                })
                .unwrap_or_else(|_| JsValue::from_str("unknown IDB error"));
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_error.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        req_success.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        req_error.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        // Keep both closures alive until one fires
        *closures.borrow_mut() = Some((on_success, on_error));
    })
}

/// Convert an IdbTransaction completion into a JS Promise.
///
/// Resolves on `complete`, rejects on `error` or `abort`. The abort handler
/// matters for bulk operations: an aborted transaction may fire `abort`
/// without a preceding `error` event.
fn transaction_to_promise(tx: &IdbTransaction) -> Promise {
    let tx_complete = tx.clone();
    let tx_error = tx.clone();
    let tx_abort = tx.clone();

    Promise::new(&mut move |resolve, reject| {
        type ClosureTriple = (
            Closure<dyn FnMut(web_sys::Event)>,
            Closure<dyn FnMut(web_sys::Event)>,
            Closure<dyn FnMut(web_sys::Event)>,
        );
        let closures: Rc<RefCell<Option<ClosureTriple>>> = Rc::new(RefCell::new(None));

        let closures_for_complete = closures.clone();
        let on_complete = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let _ = resolve.call0(&JsValue::UNDEFINED);
            *closures_for_complete.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let reject_for_abort = reject.clone();

        let tx_e = tx_error.clone();
        let closures_for_error = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = tx_e
                .error()
                .map(|e| JsValue::from(e.message()))
                .unwrap_or_else(|| JsValue::from_str("transaction error"));
            let _ = reject.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_error.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let tx_a = tx_abort.clone();
        let closures_for_abort = closures.clone();
        let on_abort = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let msg = tx_a
                .error()
                .map(|e| JsValue::from(e.message()))
                .unwrap_or_else(|| JsValue::from_str("transaction aborted"));
            let _ = reject_for_abort.call1(&JsValue::UNDEFINED, &msg);
            *closures_for_abort.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        tx_complete.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
        tx_error.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        tx_abort.set_onabort(Some(on_abort.as_ref().unchecked_ref()));

        *closures.borrow_mut() = Some((on_complete, on_error, on_abort));
    })
}

/// Open (or create) the database described by `config`.
///
/// On first open at the configured version the object store is created with
/// `id` as keyPath and autoIncrement enabled, along with every declared
/// secondary index. The upgrade hook runs at most once per (name, version).
pub async fn open_database(config: &StoreConfig) -> Result<IdbDatabase> {
    let factory = idb_factory()?;

    let open_req: IdbOpenDbRequest = factory
        .open_with_u32(&config.db_name, config.version)
        .map_err(|e| IndexedDbError::Open(format!("{:?}", e)))?;

    // Store upgrade closure to manage its lifetime without leaking
    let upgrade_closure: UpgradeClosure = Rc::new(RefCell::new(None));
    let upgrade_closure_for_drop = upgrade_closure.clone();

    // Handle upgradeneeded: create object store and declared indexes
    let schema = config.clone();
    let on_upgrade = Closure::wrap(Box::new(move |event: web_sys::IdbVersionChangeEvent| {
        let target = event.target().expect("upgrade event has target");
        let req: IdbOpenDbRequest = target.unchecked_into();
        let db: IdbDatabase = req.result().expect("result on upgrade").unchecked_into();

        if !db.object_store_names().contains(&schema.store_name) {
            let params = web_sys::IdbObjectStoreParameters::new();
            js_sys::Reflect::set(&params, &"keyPath".into(), &ID_FIELD.into())
                .expect("set keyPath");
            js_sys::Reflect::set(&params, &"autoIncrement".into(), &JsValue::TRUE)
                .expect("set autoIncrement");

            let store = db
                .create_object_store_with_optional_parameters(&schema.store_name, &params)
                .expect("create object store");

            for index in &schema.indexes {
                let index_params = web_sys::IdbIndexParameters::new();
                js_sys::Reflect::set(
                    &index_params,
                    &"unique".into(),
                    &JsValue::from_bool(index.unique),
                )
                .expect("set unique");

                store
                    .create_index_with_str_and_optional_parameters(
                        &index.field,
                        &index.field,
                        &index_params,
                    )
                    .expect("create index");
            }
        }
    }) as Box<dyn FnMut(web_sys::IdbVersionChangeEvent)>);

    open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

    // Keep the closure alive during the open request
    *upgrade_closure.borrow_mut() = Some(on_upgrade);

    // A blocked open (another connection holds an older version) never fires
    // success or error, so reject it explicitly with a marker the caller can
    // recognize.
    let blocked_closure: Rc<RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>> =
        Rc::new(RefCell::new(None));
    let blocked_closure_for_drop = blocked_closure.clone();
    let request_promise = request_to_promise(open_req.unchecked_ref());
    let open_promise = {
        // Race the open against a promise rejected from onblocked
        let blocked_promise = Promise::new(&mut |_, reject| {
            let on_blocked = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                let _ = reject.call1(&JsValue::UNDEFINED, &JsValue::from_str(BLOCKED_MARKER));
            }) as Box<dyn FnMut(web_sys::Event)>);
            open_req.set_onblocked(Some(on_blocked.as_ref().unchecked_ref()));
            *blocked_closure.borrow_mut() = Some(on_blocked);
        });
        Promise::race(&js_sys::Array::of2(&request_promise, &blocked_promise))
    };

    let settled = wasm_bindgen_futures::JsFuture::from(open_promise).await;

    // The blocked handler cannot fire once the race has settled
    *blocked_closure_for_drop.borrow_mut() = None;

    match settled {
        Ok(val) => {
            *upgrade_closure_for_drop.borrow_mut() = None;
            val.dyn_into::<IdbDatabase>()
                .map_err(|_| IndexedDbError::Open("result is not IdbDatabase".into()))
        }
        Err(e) if e.as_string().as_deref() == Some(BLOCKED_MARKER) => {
            // The call rejects, but the underlying open request stays
            // pending; if the blocking connection later closes, the open
            // runs its upgrade and succeeds with a handle nobody owns.
            // Keep the upgrade closure alive until the request settles and
            // close the stray handle on arrival. The settlement closure
            // itself is one-shot and leaked via forget().
            let upgrade_keepalive = upgrade_closure_for_drop.clone();
            let discard = Closure::wrap(Box::new(move |val: JsValue| {
                if let Ok(db) = val.dyn_into::<IdbDatabase>() {
                    db.close();
                }
                *upgrade_keepalive.borrow_mut() = None;
            }) as Box<dyn FnMut(JsValue)>);
            let _ = request_promise.then2(&discard, &discard);
            discard.forget();

            Err(IndexedDbError::Blocked(
                "another connection holds an older version open".into(),
            ))
        }
        Err(e) => {
            *upgrade_closure_for_drop.borrow_mut() = None;
            Err(IndexedDbError::Open(format!("{:?}", e)))
        }
    }
}

/// Start a transaction on the named store.
pub fn begin_transaction(
    db: &IdbDatabase,
    store_name: &str,
    mode: IdbTransactionMode,
) -> Result<(IdbTransaction, IdbObjectStore)> {
    let tx = db
        .transaction_with_str_and_mode(store_name, mode)
        .map_err(|e| IndexedDbError::Transaction(format!("{:?}", e)))?;
    let store = tx
        .object_store(store_name)
        .map_err(|e| IndexedDbError::Request(format!("{:?}", e)))?;
    Ok((tx, store))
}

/// Create a future for an IdbRequest without awaiting it.
///
/// Bulk operations use this to attach completion handlers to every queued
/// request before the first yield to the event loop; a handler attached after
/// an event already dispatched would wait forever.
pub fn request_future(req: &IdbRequest) -> wasm_bindgen_futures::JsFuture {
    wasm_bindgen_futures::JsFuture::from(request_to_promise(req))
}

/// Await an IdbRequest, resolving to its result JsValue.
pub async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    let promise = request_to_promise(req);
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::Request(format!("{:?}", e)))
}

/// Await an IdbTransaction to complete.
pub async fn await_transaction(tx: &IdbTransaction) -> Result<()> {
    let promise = transaction_to_promise(tx);
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::Transaction(format!("{:?}", e)))?;
    Ok(())
}

/// Delete an IndexedDB database by name.
pub async fn delete_database(db_name: &str) -> Result<()> {
    let factory = idb_factory()?;
    let req = factory
        .delete_database(db_name)
        .map_err(|e| IndexedDbError::Open(format!("delete db: {:?}", e)))?;
    let promise = request_to_promise(req.unchecked_ref());
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::Open(format!("delete db: {:?}", e)))?;
    Ok(())
}
