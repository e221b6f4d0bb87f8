use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shelf_core::{RecordId, Resource, ResourcePatch, SessionId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use crate::errors::{StoreError, StoreResult};
use crate::scope::{OwnerScope, RecordScope, Scope};
use crate::store::RecordStore;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    genre TEXT NOT NULL,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_resources_session_id ON resources (session_id);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, title, author, genre, session_id, created_at, updated_at FROM resources WHERE ";

/// SQLite-backed record store
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `url` and run the schema migration.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives only as long as its connection, and
        // unshared ones are private to it, so those are pinned to a single
        // connection that never gets recycled.
        let in_memory = is_in_memory_url(url);
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(opts).await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, max_connections, "Opened SQLite record store");
        Ok(store)
    }

    /// Create the resources table and its owner index if missing
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_scoped(&self, scope: &RecordScope) -> StoreResult<Option<Resource>> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        scope.push_predicate(&mut query);

        let row = query.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_resource).transpose()
    }
}

/// Whether `url` names an in-memory database, either as `:memory:` or
/// through the `mode=memory` query parameter.
fn is_in_memory_url(url: &str) -> bool {
    let url = url.strip_prefix("sqlite:").unwrap_or(url);
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    path.trim_start_matches('/') == ":memory:"
        || query.split('&').any(|pair| pair == "mode=memory")
}

fn row_to_resource(row: &SqliteRow) -> StoreResult<Resource> {
    let id: String = row.try_get("id")?;
    let session_id: String = row.try_get("session_id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Resource {
        id: RecordId::parse(&id).map_err(|e| StoreError::CorruptRow(e.to_string()))?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        genre: row.try_get("genre")?,
        session_id: SessionId::parse(&session_id)
            .map_err(|e| StoreError::CorruptRow(e.to_string()))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("bad timestamp {}: {}", raw, e)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: Resource) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO resources (id, title, author, genre, session_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.title)
        .bind(&record.author)
        .bind(&record.genre)
        .bind(record.session_id.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(record_id = %record.id, "Inserted record");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(record.id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn select(&self, scope: &OwnerScope) -> StoreResult<Vec<Resource>> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        scope.push_predicate(&mut query);
        query.push(" ORDER BY rowid");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_resource).collect()
    }

    async fn fetch(&self, scope: &RecordScope) -> StoreResult<Option<Resource>> {
        self.fetch_scoped(scope).await
    }

    async fn update(
        &self,
        scope: &RecordScope,
        patch: &ResourcePatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Resource>> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE resources SET title = COALESCE(");
        query.push_bind(patch.title.clone());
        query.push(", title), author = COALESCE(");
        query.push_bind(patch.author.clone());
        query.push(", author), genre = COALESCE(");
        query.push_bind(patch.genre.clone());
        query.push(", genre), updated_at = ");
        query.push_bind(at.to_rfc3339());
        query.push(" WHERE ");
        scope.push_predicate(&mut query);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_scoped(scope).await
    }

    async fn delete(&self, scope: &RecordScope) -> StoreResult<bool> {
        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM resources WHERE ");
        scope.push_predicate(&mut query);

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::NewResource;
    use tokio::test;

    async fn open() -> SqliteRecordStore {
        SqliteRecordStore::connect("sqlite::memory:", 4).await.unwrap()
    }

    fn book(title: &str) -> NewResource {
        NewResource {
            title: title.to_string(),
            author: "Author".to_string(),
            genre: "Genre".to_string(),
        }
    }

    #[test]
    async fn test_insert_and_select_round_trip() {
        let store = open().await;
        let owner = SessionId::mint();
        let record = Resource::new(owner, book("Round Trip"));
        store.insert(record.clone()).await.unwrap();

        let listed = store.select(&OwnerScope::new(owner)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
        assert_eq!(listed[0].title, "Round Trip");
        assert_eq!(listed[0].session_id, owner);
    }

    #[test]
    async fn test_select_is_partitioned_by_owner() {
        let store = open().await;
        let alice = SessionId::mint();
        let bob = SessionId::mint();
        store.insert(Resource::new(alice, book("a1"))).await.unwrap();
        store.insert(Resource::new(bob, book("b1"))).await.unwrap();
        store.insert(Resource::new(alice, book("a2"))).await.unwrap();

        let titles: Vec<String> = store
            .select(&OwnerScope::new(alice))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["a1", "a2"]);
    }

    #[test]
    async fn test_duplicate_id_conflicts() {
        let store = open().await;
        let record = Resource::new(SessionId::mint(), book("dup"));
        store.insert(record.clone()).await.unwrap();

        let result = store.insert(record).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    async fn test_update_merges_and_respects_owner() {
        let store = open().await;
        let owner = SessionId::mint();
        let record = Resource::new(owner, book("Original"));
        let id = record.id;
        store.insert(record).await.unwrap();

        let patch = ResourcePatch {
            author: Some("New Author".to_string()),
            ..Default::default()
        };
        let foreign = store
            .update(&RecordScope::new(SessionId::mint(), id), &patch, Utc::now())
            .await
            .unwrap();
        assert!(foreign.is_none());

        let updated = store
            .update(&RecordScope::new(owner, id), &patch, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Original");
        assert_eq!(updated.author, "New Author");
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    async fn test_delete_is_permanent_and_scoped() {
        let store = open().await;
        let owner = SessionId::mint();
        let record = Resource::new(owner, book("Gone"));
        let id = record.id;
        store.insert(record).await.unwrap();

        assert!(!store.delete(&RecordScope::new(SessionId::mint(), id)).await.unwrap());
        assert!(store.delete(&RecordScope::new(owner, id)).await.unwrap());
        assert!(store.fetch(&RecordScope::new(owner, id)).await.unwrap().is_none());
        store.health_check().await.unwrap();
    }

    #[test]
    async fn test_in_memory_url_forms() {
        assert!(is_in_memory_url("sqlite::memory:"));
        assert!(is_in_memory_url(":memory:"));
        assert!(is_in_memory_url("sqlite://shelf?mode=memory"));
        assert!(is_in_memory_url("sqlite://shelf?cache=shared&mode=memory"));
        assert!(!is_in_memory_url("sqlite://shelf.db"));
        assert!(!is_in_memory_url("sqlite://shelf.db?mode=rwc"));
    }

    #[test]
    async fn test_mode_memory_database_keeps_records_across_calls() {
        let url = format!("sqlite://shelf-{}?mode=memory", RecordId::mint());
        let store = SqliteRecordStore::connect(&url, 4).await.unwrap();
        let owner = SessionId::mint();
        let record = Resource::new(owner, book("Pinned"));
        let id = record.id;
        store.insert(record).await.unwrap();

        for _ in 0..8 {
            let listed = store.select(&OwnerScope::new(owner)).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert!(store.fetch(&RecordScope::new(owner, id)).await.unwrap().is_some());
        }
    }
}
