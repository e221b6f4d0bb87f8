//! Ownership-scoped resource operations
//!
//! `ResourceStore` is what the transport layer calls. Every operation takes
//! the caller's identity explicitly; the only one that accepts a missing
//! identity is `create`, which resolves or issues one before writing.

use chrono::Utc;
use shelf_core::identity::{resolve_or_issue_identity, ResolvedIdentity};
use shelf_core::{
    NewResource, RecordId, Resource, ResourcePatch, SessionId, ShelfError, ShelfResult,
};
use tracing::{debug, info};

use crate::scope::OwnerScope;
use crate::store::RecordStoreRef;

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub record_id: RecordId,
    pub identity: ResolvedIdentity,
}

/// Catalog operations restricted to the records a session owns
#[derive(Debug, Clone)]
pub struct ResourceStore {
    backend: RecordStoreRef,
}

impl ResourceStore {
    pub fn new(backend: RecordStoreRef) -> Self {
        Self { backend }
    }

    /// All records owned by `session`
    pub async fn list(&self, session: &SessionId) -> ShelfResult<Vec<Resource>> {
        let records = self.backend.select(&OwnerScope::new(*session)).await?;
        debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    /// One record owned by `session`. Missing and foreign records are both `NotFound`.
    pub async fn get_one(&self, session: &SessionId, id: &RecordId) -> ShelfResult<Resource> {
        let scope = OwnerScope::new(*session).record(*id);
        self.backend.fetch(&scope).await?.ok_or(ShelfError::NotFound)
    }

    /// Store a new record owned by the presented identity, minting one if
    /// the caller has none. The returned identity says whether it was issued.
    pub async fn create(
        &self,
        presented: Option<&str>,
        fields: NewResource,
    ) -> ShelfResult<Created> {
        let identity = resolve_or_issue_identity(presented);
        let record = Resource::new(identity.session_id, fields);
        let record_id = record.id;

        self.backend.insert(record).await?;
        info!(record_id = %record_id, issued = identity.issued, "Created record");

        Ok(Created {
            record_id,
            identity,
        })
    }

    /// Overwrite the supplied fields of a record owned by `session`.
    /// Fields left out of `patch` keep their stored value.
    pub async fn update(
        &self,
        session: &SessionId,
        id: &RecordId,
        patch: ResourcePatch,
    ) -> ShelfResult<Resource> {
        let scope = OwnerScope::new(*session).record(*id);
        let updated = self
            .backend
            .update(&scope, &patch, Utc::now())
            .await?
            .ok_or(ShelfError::NotFound)?;

        info!(record_id = %id, "Updated record");
        Ok(updated)
    }

    /// Permanently remove a record owned by `session`
    pub async fn delete(&self, session: &SessionId, id: &RecordId) -> ShelfResult<()> {
        let scope = OwnerScope::new(*session).record(*id);
        if !self.backend.delete(&scope).await? {
            return Err(ShelfError::NotFound);
        }

        info!(record_id = %id, "Deleted record");
        Ok(())
    }

    /// Check that the backend is reachable
    pub async fn health_check(&self) -> ShelfResult<()> {
        self.backend.health_check().await?;
        Ok(())
    }
}
