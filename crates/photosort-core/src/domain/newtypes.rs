//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers the engine passes around.
//! Each newtype ensures data validity at construction time, so downstream
//! code never has to re-check for empty ids or cursors.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UserId
// ============================================================================

/// Identifier for a user of the application
///
/// Issued by the external authentication layer; the engine treats it as an
/// opaque scoping key for every persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new random UserId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a UserId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidUserId(format!("Invalid UUID: {e}")))
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// RemoteId
// ============================================================================

/// Provider-issued identifier for a remote file or folder
///
/// Opaque to the engine; only equality and persistence matter. The natural
/// key of every mirror row is `(UserId, RemoteId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a RemoteId, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the newtype, returning the inner string
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// PageCursor
// ============================================================================

/// Opaque change cursor / page token issued by the provider
///
/// Represents "all changes up to this point have been seen". Persisted
/// transactionally with the batch that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    /// Create a PageCursor, rejecting empty values
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidCursor(
                "Page cursor cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageCursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_id_rejects_garbage() {
        assert!(UserId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_remote_id_valid() {
        let id = RemoteId::new("1aBcD_efGh-42").unwrap();
        assert_eq!(id.as_str(), "1aBcD_efGh-42");
    }

    #[test]
    fn test_remote_id_rejects_empty() {
        assert!(RemoteId::new("").is_err());
        assert!(RemoteId::new("   ").is_err());
    }

    #[test]
    fn test_page_cursor_valid() {
        let cursor = PageCursor::new("token-123").unwrap();
        assert_eq!(cursor.as_str(), "token-123");
    }

    #[test]
    fn test_page_cursor_rejects_empty() {
        assert!(PageCursor::new("").is_err());
    }

    #[test]
    fn test_remote_id_serde_transparent() {
        let id = RemoteId::new("abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: RemoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
