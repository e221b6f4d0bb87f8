//! Session identity management
//!
//! A session identity is an opaque random UUID handed to a client on its first
//! write and presented back on every later request. It is the ownership key for
//! records. Nothing here knows how the identity travels (cookie, header); the
//! transport layer passes in whatever token the client presented, if any.

use crate::errors::{ShelfError, ShelfResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Opaque identifier of one anonymous client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a new random session identifier
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a presented token. Only canonical UUID text is accepted.
    pub fn parse(token: &str) -> ShelfResult<Self> {
        parse_canonical_uuid(token)
            .map(Self)
            .ok_or_else(|| ShelfError::InvalidInput("malformed session token".to_string()))
    }
}

/// Parse the 36-character hyphenated 8-4-4-4-12 form and nothing else.
/// Simple, braced and `urn:uuid:` renderings are rejected.
pub(crate) fn parse_canonical_uuid(raw: &str) -> Option<Uuid> {
    let bytes = raw.as_bytes();
    if bytes.len() != 36 || [8, 13, 18, 23].iter().any(|&i| bytes[i] != b'-') {
        return None;
    }
    Uuid::try_parse(raw).ok()
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of resolving the identity for a creating request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub session_id: SessionId,
    /// True when `session_id` was minted for this request and must be
    /// persisted on the client before the response is sent.
    pub issued: bool,
}

impl ResolvedIdentity {
    /// The identity to hand back to the client, if one was minted
    pub fn issued_token(&self) -> Option<&SessionId> {
        if self.issued {
            Some(&self.session_id)
        } else {
            None
        }
    }
}

/// Require a previously issued identity.
///
/// Absent and malformed tokens are both `Unauthenticated`; the caller cannot
/// learn anything about the store from the difference.
pub fn require_identity(presented: Option<&str>) -> ShelfResult<SessionId> {
    let token = presented.ok_or(ShelfError::Unauthenticated)?;
    SessionId::parse(token).map_err(|_| {
        debug!("Rejecting malformed session token");
        ShelfError::Unauthenticated
    })
}

/// Return the presented identity, or mint a new one when there is none.
///
/// A malformed token is treated like a missing one so a client with a
/// corrupted cookie gets a fresh, usable identity.
pub fn resolve_or_issue_identity(presented: Option<&str>) -> ResolvedIdentity {
    if let Some(session_id) = presented.and_then(|token| SessionId::parse(token).ok()) {
        return ResolvedIdentity {
            session_id,
            issued: false,
        };
    }

    let session_id = SessionId::mint();
    debug!(session_id = %session_id, "Issued new session identity");
    ResolvedIdentity {
        session_id,
        issued: true,
    }
}
