//! IndexedDB storage backend for satchel records (browser WASM)
//!
//! This crate provides a persistent IndexedDB implementation matching the
//! satchel-core store contract, enabling browser WASM to keep records in
//! IndexedDB.
//!
//! Because IndexedDB is inherently asynchronous, the `IndexedDbStore` provides
//! async methods that mirror the synchronous `RecordStore` and `QueryStore`
//! traits from satchel-core. Same method names, same inputs, same outputs,
//! same error semantics.
//!
//! # Schema
//!
//! Records are stored in a single object store with `id` as keyPath and
//! `autoIncrement` enabled, so records inserted without an id receive the
//! next generated key. Secondary indexes are created on first schema upgrade
//! from the `IndexSpec` list on `StoreConfig`; `get_by_index` against any
//! other field fails with `StoreError::IndexNotFound`.
//!
//! # Connection lifecycle
//!
//! The connection is a small state machine: `Unopened` → `Opening` → `Open`
//! or `Failed`, plus a terminal `Closed` entered by `close()`. Every
//! operation either waits for an in-flight open or triggers its own, so a
//! transaction is never issued against an unready handle. Operations after
//! `close()` fail fast with `StoreError::Closed`.
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_core::{Record, StoreConfig};
//! use satchel_indexeddb::IndexedDbStore;
//!
//! // Open (or create) the database
//! let store = IndexedDbStore::open(StoreConfig::new("testDB", "testStore")).await?;
//!
//! // Store and retrieve
//! let id = store
//!     .insert_or_update(Record::new().field("name", "Test Item"))
//!     .await?;
//! let retrieved = store.get(id).await?;
//! assert!(retrieved.is_some());
//! ```

pub mod convert;
pub mod error;
pub mod idb;
pub mod store;

pub use error::{IndexedDbError, Result};
pub use store::IndexedDbStore;
