//! satchel core
//!
//! This crate provides the storage contract for satchel: an open-ended JSON
//! record keyed by a numeric `id`, a synchronous `RecordStore`/`QueryStore`
//! trait pair, and an in-memory backend for testing and native development.
//!
//! Persistent backends live in separate crates. The browser IndexedDB backend
//! (`satchel-indexeddb`) implements async equivalents of the same methods —
//! same inputs, same outputs, same error semantics.
//!
//! # Example
//!
//! ```rust
//! use satchel_core::{MemoryStore, Record, RecordStore};
//!
//! let mut store = MemoryStore::new();
//!
//! let id = store
//!     .insert_or_update(Record::new().field("name", "Test Item"))
//!     .unwrap();
//!
//! let retrieved = store.get(id).unwrap();
//! assert!(retrieved.is_some());
//! ```

pub mod record;
pub mod storage;

// Re-export main types at crate root
pub use record::{IndexSpec, Record, RecordId, StoreConfig, ID_FIELD};
pub use storage::{MemoryStore, QueryStore, RecordStore, StoreError, StoreResult, StoreStats};
