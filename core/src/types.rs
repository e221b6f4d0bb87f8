use crate::errors::{ShelfError, ShelfResult};
use crate::identity::{parse_canonical_uuid, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a record id taken from a request path
    pub fn parse(raw: &str) -> ShelfResult<Self> {
        parse_canonical_uuid(raw)
            .map(Self)
            .ok_or_else(|| ShelfError::InvalidInput(format!("invalid record id: {}", raw)))
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One catalog entry owned by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Owning session. Set once at creation, never reassigned.
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Build a new record for `owner` with a freshly minted id
    pub fn new(owner: SessionId, fields: NewResource) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::mint(),
            title: fields.title,
            author: fields.author,
            genre: fields.genre,
            session_id: owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the supplied fields of `patch` into this record.
    /// Fields absent from the patch keep their current value.
    pub fn apply(&mut self, patch: &ResourcePatch, at: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(author) = &patch.author {
            self.author = author.clone();
        }
        if let Some(genre) = &patch.genre {
            self.genre = genre.clone();
        }
        self.updated_at = at;
    }
}

/// Fields required to create a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    pub title: String,
    pub author: String,
    #[serde(alias = "genrer")]
    pub genre: String,
}

/// Fields a client may change on an existing record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, alias = "genrer")]
    pub genre: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> NewResource {
        NewResource {
            title: "Dom Casmurro".to_string(),
            author: "Machado de Assis".to_string(),
            genre: "Romance".to_string(),
        }
    }

    #[test]
    fn test_new_resource_is_owned_by_creator() {
        let owner = SessionId::mint();
        let record = Resource::new(owner, sample());

        assert_eq!(record.session_id, owner);
        assert_eq!(record.title, "Dom Casmurro");
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_apply_merges_supplied_fields_only() {
        let mut record = Resource::new(SessionId::mint(), sample());
        let later = record.updated_at + Duration::seconds(5);
        let patch = ResourcePatch {
            title: Some("Quincas Borba".to_string()),
            ..Default::default()
        };

        record.apply(&patch, later);

        assert_eq!(record.title, "Quincas Borba");
        assert_eq!(record.author, "Machado de Assis");
        assert_eq!(record.genre, "Romance");
        assert_eq!(record.updated_at, later);
    }

    #[test]
    fn test_record_id_rejects_malformed_input() {
        assert!(matches!(
            RecordId::parse("123"),
            Err(ShelfError::InvalidInput(_))
        ));
        let id = RecordId::mint();
        assert_eq!(RecordId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_record_id_rejects_non_hyphenated_renderings() {
        let canonical = RecordId::mint().to_string();

        for raw in [
            format!("urn:uuid:{}", canonical),
            format!("{{{}}}", canonical),
            canonical.replace('-', ""),
        ] {
            assert!(matches!(
                RecordId::parse(&raw),
                Err(ShelfError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_new_resource_accepts_legacy_genre_key() {
        let body = r#"{"title":"T","author":"A","genrer":"G"}"#;
        let parsed: NewResource = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.genre, "G");
    }

    #[test]
    fn test_new_resource_requires_all_fields() {
        let body = r#"{"title":"T","author":"A"}"#;
        assert!(serde_json::from_str::<NewResource>(body).is_err());
    }

    #[test]
    fn test_patch_fields_are_optional() {
        let patch: ResourcePatch = serde_json::from_str(r#"{"author":"B"}"#).unwrap();
        assert_eq!(patch.author.as_deref(), Some("B"));
        assert!(patch.title.is_none());
        assert!(patch.genre.is_none());
    }
}
