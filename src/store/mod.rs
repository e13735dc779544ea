//! Durable, TTL-governed storage of session records.
//!
//! Two access paths: by session id (TTL'd, authoritative for validation)
//! and by `(identity_id, slot)` through an index that outlives individual
//! sessions — the index is what makes refresh-after-expiry possible within
//! the inactivity window.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::SessionRecord;

pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;

/// Store-level failures. Surfaced to callers of the manager as
/// [`crate::Error::StoreUnavailable`]; "absent" is never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unreachable")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("record serialization failed")]
    Codec(#[from] serde_json::Error),
    #[error("transactional write conflict, retries exhausted")]
    TxConflict,
}

/// Persistence seam for session records.
///
/// Implementations must make [`put`](SessionStore::put) atomic across the
/// record write and the index update: a concurrent reader never observes
/// the new index entry pointing at a not-yet-written record, or the old
/// index entry after the new record is live.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a record under its id with TTL `expires_at - now` and point
    /// the `(identity_id, slot)` index entry at it, atomically.
    async fn put(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// `None` means confirmed non-existence or TTL expiry.
    async fn get_by_id(&self, id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Read the index entry for a slot. Not filtered by `expires_at`: the
    /// index is the refresh window and deliberately outlives the record.
    async fn get_by_identity_and_slot(
        &self,
        identity_id: &str,
        slot: &str,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// All index entries for an identity, one per slot.
    async fn list_by_identity(&self, identity_id: &str) -> Result<Vec<SessionRecord>, StoreError>;

    /// Returns `true` iff a record was removed.
    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    /// Remove the index entry for a slot, but only while it still points at
    /// `expected_id` — a concurrently-rotated slot must keep its new entry.
    async fn delete_slot(
        &self,
        identity_id: &str,
        slot: &str,
        expected_id: &str,
    ) -> Result<bool, StoreError>;

    /// Drop the whole `(identity_id, *)` index.
    async fn delete_index(&self, identity_id: &str) -> Result<bool, StoreError>;

    /// Bulk delete by session id, returning the number removed.
    async fn delete_many(&self, ids: &[String]) -> Result<u64, StoreError>;
}
