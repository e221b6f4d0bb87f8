use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shelf_core::{Resource, ResourcePatch};

use crate::errors::StoreResult;
use crate::scope::{OwnerScope, RecordScope};

/// Trait defining the interface for record store backends.
///
/// Apart from `insert`, every method takes a scope; a backend never sees a
/// request for records without also seeing whose records they must be.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Store a new record. Fails with `Conflict` if the id is already taken.
    async fn insert(&self, record: Resource) -> StoreResult<()>;

    /// All records inside the scope, in insertion order
    async fn select(&self, scope: &OwnerScope) -> StoreResult<Vec<Resource>>;

    /// The scoped record, if it exists and the scope owns it
    async fn fetch(&self, scope: &RecordScope) -> StoreResult<Option<Resource>>;

    /// Merge `patch` into the scoped record and return the result
    async fn update(
        &self,
        scope: &RecordScope,
        patch: &ResourcePatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Resource>>;

    /// Remove the scoped record. Returns false when nothing matched.
    async fn delete(&self, scope: &RecordScope) -> StoreResult<bool>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

/// Type alias for Arc-wrapped RecordStore trait objects
pub type RecordStoreRef = Arc<dyn RecordStore>;
