//! Storage abstraction for records
//!
//! This module defines the `RecordStore` trait that abstracts over different
//! storage backends. Implementations exist for:
//!
//! - **Memory**: In-memory storage for testing (`MemoryStore`)
//! - **IndexedDB**: Browser storage via web-sys (separate crate, WASM only)
//!
//! # Example
//!
//! ```rust
//! use satchel_core::storage::{MemoryStore, RecordStore};
//! use satchel_core::Record;
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

pub mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{QueryStore, RecordStore, StoreStats};
