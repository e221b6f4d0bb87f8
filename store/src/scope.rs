//! Ownership scoping
//!
//! Every backend call that reads or changes existing records takes one of the
//! scope types below. A scope can only be built from the caller's `SessionId`,
//! and it is the only place the owner predicate is written down, once for
//! in-process filtering (`admits`) and once for SQL (`push_predicate`).

use shelf_core::{RecordId, Resource, SessionId};
use sqlx::{QueryBuilder, Sqlite};

/// Predicate that restricts a store operation to one owner's records
pub trait Scope: Send + Sync {
    /// Whether `record` is visible inside this scope
    fn admits(&self, record: &Resource) -> bool;

    /// Append the equivalent `WHERE` condition to a query
    fn push_predicate(&self, query: &mut QueryBuilder<'_, Sqlite>);
}

/// All records owned by one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerScope {
    owner: SessionId,
}

impl OwnerScope {
    pub fn new(owner: SessionId) -> Self {
        Self { owner }
    }

    /// Narrow the scope to a single record of the same owner
    pub fn record(&self, id: RecordId) -> RecordScope {
        RecordScope { owner: *self, id }
    }
}

impl Scope for OwnerScope {
    fn admits(&self, record: &Resource) -> bool {
        record.session_id == self.owner
    }

    fn push_predicate(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        query.push("session_id = ");
        query.push_bind(self.owner.to_string());
    }
}

/// One record, and only if the given session owns it.
/// The ownership half of the check is delegated to the wrapped `OwnerScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordScope {
    owner: OwnerScope,
    id: RecordId,
}

impl RecordScope {
    pub fn new(owner: SessionId, id: RecordId) -> Self {
        OwnerScope::new(owner).record(id)
    }
}

impl Scope for RecordScope {
    fn admits(&self, record: &Resource) -> bool {
        record.id == self.id && self.owner.admits(record)
    }

    fn push_predicate(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        query.push("id = ");
        query.push_bind(self.id.to_string());
        query.push(" AND ");
        self.owner.push_predicate(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::NewResource;

    fn record_for(owner: SessionId) -> Resource {
        Resource::new(
            owner,
            NewResource {
                title: "T".to_string(),
                author: "A".to_string(),
                genre: "G".to_string(),
            },
        )
    }

    #[test]
    fn test_owner_scope_admits_only_own_records() {
        let mine = SessionId::mint();
        let theirs = SessionId::mint();
        let scope = OwnerScope::new(mine);

        assert!(scope.admits(&record_for(mine)));
        assert!(!scope.admits(&record_for(theirs)));
    }

    #[test]
    fn test_record_scope_requires_id_and_owner() {
        let owner = SessionId::mint();
        let record = record_for(owner);

        assert!(RecordScope::new(owner, record.id).admits(&record));
        assert!(!RecordScope::new(SessionId::mint(), record.id).admits(&record));
        assert!(!RecordScope::new(owner, RecordId::mint()).admits(&record));
    }

    #[test]
    fn test_record_scope_narrows_owner_scope() {
        let owner = SessionId::mint();
        let scope = OwnerScope::new(owner);
        let own = record_for(owner);
        let foreign = record_for(SessionId::mint());

        // Anything the record scope admits, its owner scope admits too.
        for record in [&own, &foreign] {
            let narrowed = scope.record(record.id);
            assert_eq!(narrowed.admits(record), scope.admits(record));
        }
        assert!(!scope.record(foreign.id).admits(&own));
    }

    #[test]
    fn test_sql_predicate_binds_owner() {
        let owner = SessionId::mint();
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM resources WHERE ");
        OwnerScope::new(owner).record(RecordId::mint()).push_predicate(&mut query);

        assert_eq!(
            query.sql(),
            "SELECT id FROM resources WHERE id = ? AND session_id = ?"
        );
    }
}
