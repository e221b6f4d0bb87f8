//! Ownership-scoped record storage for shelf
//!
//! Records live behind the `RecordStore` trait, which can be implemented by
//! different backends. Every backend call on existing records carries an
//! `OwnerScope` or `RecordScope`, and `ResourceStore` exposes the catalog
//! operations on top of that.

pub mod adapters;
pub mod errors;
pub mod resources;
pub mod scope;
pub mod store;

pub use adapters::{open_record_store, InMemoryRecordStore, SqliteRecordStore};
pub use errors::{StoreError, StoreResult};
pub use resources::{Created, ResourceStore};
pub use scope::{OwnerScope, RecordScope, Scope};
pub use store::{RecordStore, RecordStoreRef};
