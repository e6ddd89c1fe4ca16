//! Stored OAuth credential material
//!
//! Token bytes in a [`StoredCredential`] are always AEAD-sealed; plaintext
//! tokens exist only transiently inside the credential vault's boundary.
//! The `version` counter backs the compare-and-swap that prevents two
//! concurrent callers from racing a refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::UserId;

/// One user's sealed OAuth token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Owning user
    pub user_id: UserId,
    /// AEAD-sealed access token bytes
    pub access_token: Vec<u8>,
    /// AEAD-sealed refresh token bytes (None when the provider never issued one)
    pub refresh_token: Option<Vec<u8>>,
    /// Space-separated OAuth scope string granted with these tokens
    pub scope: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// Compare-and-swap counter, bumped on every successful write
    pub version: i64,
}

impl StoredCredential {
    /// Returns true if the access token expires within `margin` from now
    pub fn expires_within(&self, margin: chrono::Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cred(expires_at: DateTime<Utc>) -> StoredCredential {
        StoredCredential {
            user_id: UserId::new(),
            access_token: vec![1, 2, 3],
            refresh_token: Some(vec![4, 5, 6]),
            scope: "drive.readonly".to_string(),
            expires_at,
            version: 1,
        }
    }

    #[test]
    fn test_expires_within_margin() {
        let c = cred(Utc::now() + Duration::minutes(3));
        assert!(c.expires_within(Duration::minutes(5)));
    }

    #[test]
    fn test_not_expiring_outside_margin() {
        let c = cred(Utc::now() + Duration::hours(1));
        assert!(!c.expires_within(Duration::minutes(5)));
    }

    #[test]
    fn test_already_expired() {
        let c = cred(Utc::now() - Duration::minutes(1));
        assert!(c.expires_within(Duration::zero()));
    }
}
