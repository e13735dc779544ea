//! Session orchestration: create, validate, refresh, invalidate.
//!
//! The manager is the only component aware of both codecs and the store.
//! Session state is never stored explicitly; it is inferred from store
//! presence — Active (record exists), Refreshed (replaced by a new record,
//! old id absent), Revoked (deleted).

mod record;

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::SessionConfig;
use crate::error::Error;
use crate::store::SessionStore;
use crate::token::{AccessClaims, AccessTokenCodec, RefreshClaims, RefreshTokenCodec};

pub use record::{Identity, SessionRecord, TokenPair, DEFAULT_SLOT};

/// Orchestrates the session lifecycle over a store and the two codecs.
///
/// Constructed once by the process entry point and passed by reference to
/// all callers; there is no process-wide singleton.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    access: AccessTokenCodec,
    refresh: RefreshTokenCodec,
    validity: Duration,
    issuer: String,
}

impl SessionManager {
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] if the configured encryption key
    /// material does not match the cipher.
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Result<Self, Error> {
        let access = AccessTokenCodec::new(config.signing_key);
        let refresh = RefreshTokenCodec::new(config.encryption_key, config.encryption_iv)?;
        Ok(Self {
            store,
            access,
            refresh,
            validity: config.validity,
            issuer: config.issuer,
        })
    }

    /// Mint a new session for `(identity_id, slot)` and return its tokens.
    ///
    /// A second create for the same slot supersedes the previous session in
    /// the index; the old record lives on until its TTL runs out, and its
    /// tokens can no longer be refreshed.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the write does not go through.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        identity_id: &str,
        role: &str,
        slot: Option<&str>,
    ) -> Result<TokenPair, Error> {
        let slot = slot.unwrap_or(DEFAULT_SLOT);
        let record = SessionRecord::new(identity_id, role, slot, self.validity);
        self.store.put(&record).await?;
        debug!(session_id = %record.id, "session created");
        self.issue(&record)
    }

    /// Check an access token and return the live record behind it.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::TokenExpired`], [`Error::TokenMalformed`] and
    /// [`Error::TokenInvalidSignature`] from verification. A verified token
    /// whose record is gone also yields [`Error::TokenExpired`]: the store
    /// is authoritative, a missing record means a retired session.
    #[instrument(skip_all)]
    pub async fn validate_access_token(&self, token: &str) -> Result<SessionRecord, Error> {
        let claims = self.access.verify(token, Utc::now().timestamp())?;
        let record = self.store.get_by_id(&claims.id).await?;
        record.ok_or(Error::TokenExpired)
    }

    /// Exchange a refresh token plus the access token it was issued with
    /// for a new session.
    ///
    /// The access token's expiry is deliberately not enforced — refresh
    /// exists to outlive it — but its signature must hold, and the session
    /// it names must be the one the refresh token's `(identity, slot)`
    /// currently points at. That cross-check is what stops a refresh token
    /// from being replayed against a superseded or foreign session.
    ///
    /// # Errors
    ///
    /// - [`Error::TokenMalformed`] — undecodable refresh token;
    /// - [`Error::TokenInvalidSignature`] / [`Error::TokenMalformed`] —
    ///   from the access-token signature check;
    /// - [`Error::RefreshKeyInvalid`] — no live session for the slot, or a
    ///   session-id mismatch between the two credentials;
    /// - [`Error::StoreUnavailable`] — store failure.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        access_token: &str,
    ) -> Result<TokenPair, Error> {
        let hint = self.refresh.decode(refresh_token)?;
        let claims = self.access.verify_signature_only(access_token)?;

        let current = self
            .store
            .get_by_identity_and_slot(&hint.identity_id, &hint.slot)
            .await?
            .ok_or(Error::RefreshKeyInvalid)?;
        if current.id != claims.id {
            debug!(slot = %hint.slot, "refresh rejected: session id mismatch");
            return Err(Error::RefreshKeyInvalid);
        }

        // Role comes from the stored record, the server-side truth; the
        // decrypted payload only selected the slot.
        let record = SessionRecord::new(
            &current.identity_id,
            &current.role,
            &current.slot,
            self.validity,
        );
        self.store.put(&record).await?;
        debug!(old_session_id = %current.id, session_id = %record.id, "session refreshed");
        self.issue(&record)
    }

    /// Revoke a single session. Returns `true` iff it was live.
    ///
    /// Also retires the slot's index entry (when it still points at this
    /// session), so the refresh window closes with the session.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] on store failure.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, session_id: &str) -> Result<bool, Error> {
        let record = self.store.get_by_id(session_id).await?;
        let removed = self.store.delete_by_id(session_id).await?;
        if let Some(record) = record {
            self.store
                .delete_slot(&record.identity_id, &record.slot, &record.id)
                .await?;
        }
        Ok(removed)
    }

    /// Revoke every session of an identity, across all slots. No-op when
    /// the identity has none.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] on store failure.
    #[instrument(skip(self))]
    pub async fn invalidate_all(&self, identity_id: &str) -> Result<(), Error> {
        let records = self.store.list_by_identity(identity_id).await?;
        if records.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = records.iter().map(|record| record.id.clone()).collect();

        self.store.delete_index(identity_id).await?;
        let removed = self.store.delete_many(&ids).await?;
        debug!(removed, "invalidated all sessions for identity");
        Ok(())
    }

    fn issue(&self, record: &SessionRecord) -> Result<TokenPair, Error> {
        let now = Utc::now().timestamp();
        let access_token = self.access.sign(&AccessClaims {
            id: record.id.clone(),
            role: record.role.clone(),
            exp: record.expires_at.timestamp(),
            iat: now,
            nbf: now,
            iss: self.issuer.clone(),
        })?;
        let refresh_token = self.refresh.encode(&RefreshClaims {
            identity_id: record.identity_id.clone(),
            role: record.role.clone(),
            slot: record.slot.clone(),
        })?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: record.expires_at,
        })
    }
}
