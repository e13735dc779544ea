//! Redis-backed session store.
//!
//! Key scheme: `sesio:sid:<session-id>` holds the serialized record with
//! TTL `expires_at - now`; `sesio:aid:<identity-id>` is a hash of
//! `slot -> record` with a long inactivity TTL so idle identities are
//! eventually garbage-collected even when their sessions expire faster.
//!
//! `put` is the only multi-key write and runs as WATCH on both keys plus a
//! MULTI/EXEC pipeline. A conflicting concurrent write aborts the EXEC and
//! the write is retried a bounded number of times; losers of a same-slot
//! race simply produce a session their stale access token can no longer
//! redeem.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use std::collections::HashMap;
use tracing::debug;

use super::{SessionStore, StoreError};
use crate::session::SessionRecord;

const KEY_PREFIX: &str = "sesio";
const INDEX_INACTIVITY_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const MAX_PUT_ATTEMPTS: usize = 3;

pub struct RedisSessionStore {
    client: redis::Client,
    conn: MultiplexedConnection,
    index_ttl_seconds: i64,
}

fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}:sid:{id}")
}

fn index_key(identity_id: &str) -> String {
    format!("{KEY_PREFIX}:aid:{identity_id}")
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(Box::new(err))
    }
}

impl RedisSessionStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1/`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(StoreError::from)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            client,
            conn,
            index_ttl_seconds: INDEX_INACTIVITY_TTL_SECONDS,
        })
    }

    /// Override the index inactivity TTL (defaults to 30 days).
    #[must_use]
    pub fn with_index_ttl_seconds(mut self, seconds: i64) -> Self {
        self.index_ttl_seconds = seconds;
        self
    }

    fn parse_record(raw: &str) -> Result<SessionRecord, StoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let rec_key = record_key(&record.id);
        let idx_key = index_key(&record.identity_id);
        let payload = serde_json::to_string(record)?;
        // SET EX requires a positive TTL; a record already at its expiry
        // gets the minimum so the write stays well-formed.
        let ttl = record.ttl_seconds().max(1) as u64;

        // WATCH is connection-local state, so the transaction runs on a
        // dedicated connection rather than the shared one.
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for attempt in 1..=MAX_PUT_ATTEMPTS {
            let () = redis::cmd("WATCH")
                .arg(&rec_key)
                .arg(&idx_key)
                .query_async(&mut conn)
                .await?;

            let response: Option<(i64,)> = redis::pipe()
                .atomic()
                .set_ex(&rec_key, &payload, ttl)
                .ignore()
                .hset(&idx_key, &record.slot, &payload)
                .ignore()
                .expire(&idx_key, self.index_ttl_seconds)
                .query_async(&mut conn)
                .await?;

            match response {
                Some(_) => return Ok(()),
                None => {
                    // EXEC aborted: a watched key changed under us.
                    debug!(attempt, session_id = %record.id, "session put lost watch race");
                }
            }
        }

        Err(StoreError::TxConflict)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(record_key(id)).await?;
        raw.as_deref().map(Self::parse_record).transpose()
    }

    async fn get_by_identity_and_slot(
        &self,
        identity_id: &str,
        slot: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(index_key(identity_id), slot).await?;
        raw.as_deref().map(Self::parse_record).transpose()
    }

    async fn list_by_identity(&self, identity_id: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let entries: HashMap<String, String> = conn.hgetall(index_key(identity_id)).await?;
        entries
            .values()
            .map(|raw| Self::parse_record(raw))
            .collect()
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(record_key(id)).await?;
        Ok(removed > 0)
    }

    async fn delete_slot(
        &self,
        identity_id: &str,
        slot: &str,
        expected_id: &str,
    ) -> Result<bool, StoreError> {
        let idx_key = index_key(identity_id);
        // Compare-then-delete under WATCH so a slot rotated between the
        // read and the delete keeps its new entry.
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        for attempt in 1..=MAX_PUT_ATTEMPTS {
            let () = redis::cmd("WATCH")
                .arg(&idx_key)
                .query_async(&mut conn)
                .await?;

            let raw: Option<String> = conn.hget(&idx_key, slot).await?;
            let points_here = match raw.as_deref().map(Self::parse_record).transpose()? {
                Some(record) => record.id == expected_id,
                None => false,
            };
            if !points_here {
                let () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                return Ok(false);
            }

            let response: Option<(i64,)> = redis::pipe()
                .atomic()
                .hdel(&idx_key, slot)
                .query_async(&mut conn)
                .await?;

            match response {
                Some((removed,)) => return Ok(removed > 0),
                None => {
                    debug!(attempt, slot, "slot delete lost watch race");
                }
            }
        }

        Err(StoreError::TxConflict)
    }

    async fn delete_index(&self, identity_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(index_key(identity_id)).await?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = ids.iter().map(|id| record_key(id)).collect();
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(keys).await?;
        Ok(removed.max(0) as u64)
    }
}
