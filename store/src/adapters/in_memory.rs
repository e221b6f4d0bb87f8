use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shelf_core::{Resource, ResourcePatch};
use tracing::debug;

use crate::errors::{StoreError, StoreResult};
use crate::scope::{OwnerScope, RecordScope, Scope};
use crate::store::RecordStore;

/// In-memory implementation of RecordStore
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    /// Records in insertion order
    records: Arc<RwLock<Vec<Resource>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: Resource) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|e| {
            StoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Conflict(record.id.to_string()));
        }

        debug!(record_id = %record.id, "Inserted record");
        records.push(record);
        Ok(())
    }

    async fn select(&self, scope: &OwnerScope) -> StoreResult<Vec<Resource>> {
        let records = self.records.read().map_err(|e| {
            StoreError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.iter().filter(|r| scope.admits(r)).cloned().collect())
    }

    async fn fetch(&self, scope: &RecordScope) -> StoreResult<Option<Resource>> {
        let records = self.records.read().map_err(|e| {
            StoreError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.iter().find(|r| scope.admits(r)).cloned())
    }

    async fn update(
        &self,
        scope: &RecordScope,
        patch: &ResourcePatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Resource>> {
        let mut records = self.records.write().map_err(|e| {
            StoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(records.iter_mut().find(|r| scope.admits(r)).map(|record| {
            record.apply(patch, at);
            record.clone()
        }))
    }

    async fn delete(&self, scope: &RecordScope) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|e| {
            StoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let before = records.len();
        records.retain(|r| !scope.admits(r));
        Ok(records.len() < before)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.records
            .read()
            .map(|_| ())
            .map_err(|e| StoreError::Storage(format!("Record lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::{NewResource, SessionId};
    use tokio::test;

    fn book(title: &str) -> NewResource {
        NewResource {
            title: title.to_string(),
            author: "Author".to_string(),
            genre: "Genre".to_string(),
        }
    }

    #[test]
    async fn test_select_keeps_insertion_order() {
        let store = InMemoryRecordStore::new();
        let owner = SessionId::mint();

        for title in ["first", "second", "third"] {
            store.insert(Resource::new(owner, book(title))).await.unwrap();
        }

        let titles: Vec<String> = store
            .select(&OwnerScope::new(owner))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    async fn test_duplicate_id_conflicts() {
        let store = InMemoryRecordStore::new();
        let record = Resource::new(SessionId::mint(), book("dup"));

        store.insert(record.clone()).await.unwrap();
        let result = store.insert(record).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    async fn test_foreign_scope_cannot_touch_record() {
        let store = InMemoryRecordStore::new();
        let owner = SessionId::mint();
        let stranger = SessionId::mint();
        let record = Resource::new(owner, book("private"));
        let id = record.id;
        store.insert(record).await.unwrap();

        let foreign = RecordScope::new(stranger, id);
        let patch = ResourcePatch {
            title: Some("stolen".to_string()),
            ..Default::default()
        };

        assert!(store.fetch(&foreign).await.unwrap().is_none());
        assert!(store.update(&foreign, &patch, Utc::now()).await.unwrap().is_none());
        assert!(!store.delete(&foreign).await.unwrap());

        let kept = store.fetch(&RecordScope::new(owner, id)).await.unwrap().unwrap();
        assert_eq!(kept.title, "private");
    }

    #[test]
    async fn test_delete_removes_only_scoped_record() {
        let store = InMemoryRecordStore::new();
        let owner = SessionId::mint();
        let a = Resource::new(owner, book("a"));
        let b = Resource::new(owner, book("b"));
        let a_id = a.id;
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        assert!(store.delete(&RecordScope::new(owner, a_id)).await.unwrap());
        assert!(!store.delete(&RecordScope::new(owner, a_id)).await.unwrap());

        let remaining = store.select(&OwnerScope::new(owner)).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "b");
    }
}
