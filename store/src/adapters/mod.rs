mod in_memory;
mod sqlite;

pub use in_memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use std::sync::Arc;

use shelf_core::StorageConfig;
use tracing::info;

use crate::errors::StoreResult;
use crate::store::RecordStoreRef;

/// Build the backend selected by the storage configuration
pub async fn open_record_store(config: &StorageConfig) -> StoreResult<RecordStoreRef> {
    match config {
        StorageConfig::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StorageConfig::Sqlite {
            url,
            max_connections,
        } => Ok(Arc::new(
            SqliteRecordStore::connect(url, *max_connections).await?,
        )),
    }
}
