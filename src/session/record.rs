use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slot used when the caller does not distinguish concurrent sessions.
pub const DEFAULT_SLOT: &str = "default";

/// The unit of server-side truth for one session.
///
/// Replaced wholesale (new `id`) on refresh, never mutated in place.
/// `expires_at` is the sole authority for access-token validity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub identity_id: String,
    pub role: String,
    pub slot: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Mint a record with a fresh id and `expires_at = now + validity`.
    #[must_use]
    pub fn new(identity_id: &str, role: &str, slot: &str, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            identity_id: identity_id.to_string(),
            role: role.to_string(),
            slot: slot.to_string(),
            created_at: now,
            expires_at: now + validity,
        }
    }

    /// Seconds until expiry; non-positive once the record has expired.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

/// What a successful create or refresh hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request-scoped view of an authenticated caller.
///
/// The middleware collaborator places this into request scope after
/// validation, instead of ambient keyed-context lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub session_id: String,
    pub identity_id: String,
    pub role: String,
}

impl From<&SessionRecord> for Identity {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_id: record.id.clone(),
            identity_id: record.identity_id.clone(),
            role: record.role.clone(),
        }
    }
}
