//! In-process session store.
//!
//! Mirrors the Redis semantics closely enough for tests and embedded use:
//! the id path honours `expires_at` (lazy expiry standing in for TTL), the
//! index path does not — like its Redis counterpart it is the refresh
//! window and outlives individual records.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SessionStore, StoreError};
use crate::session::SessionRecord;

#[derive(Default)]
struct Inner {
    records: HashMap<String, SessionRecord>,
    index: HashMap<String, HashMap<String, SessionRecord>>,
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Inner>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .records
            .insert(record.id.clone(), record.clone());
        inner
            .index
            .entry(record.identity_id.clone())
            .or_default()
            .insert(record.slot.clone(), record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        // Lazy expiry stands in for the TTL the real backend applies.
        let expired = inner
            .records
            .get(id)
            .is_some_and(|record| record.expires_at <= Utc::now());
        if expired {
            inner.records.remove(id);
            return Ok(None);
        }
        Ok(inner.records.get(id).cloned())
    }

    async fn get_by_identity_and_slot(
        &self,
        identity_id: &str,
        slot: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .index
            .get(identity_id)
            .and_then(|slots| slots.get(slot))
            .cloned())
    }

    async fn list_by_identity(&self, identity_id: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .index
            .get(identity_id)
            .map(|slots| slots.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.records.remove(id).is_some())
    }

    async fn delete_slot(
        &self,
        identity_id: &str,
        slot: &str,
        expected_id: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(slots) = inner.index.get_mut(identity_id) else {
            return Ok(false);
        };
        if slots.get(slot).is_some_and(|record| record.id == expected_id) {
            slots.remove(slot);
            if slots.is_empty() {
                inner.index.remove(identity_id);
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_index(&self, identity_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.index.remove(identity_id).is_some())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0;
        for id in ids {
            if inner.records.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, identity: &str, slot: &str, validity_seconds: i64) -> SessionRecord {
        let mut record = SessionRecord::new(identity, "operator", slot, Duration::seconds(validity_seconds));
        record.id = id.to_string();
        record
    }

    #[tokio::test]
    async fn put_replaces_slot_entry() -> Result<(), StoreError> {
        let store = MemorySessionStore::new();
        store.put(&record("a", "u1", "default", 60)).await?;
        store.put(&record("b", "u1", "default", 60)).await?;

        let current = store.get_by_identity_and_slot("u1", "default").await?;
        assert_eq!(current.map(|r| r.id), Some("b".to_string()));

        // Both records still resolve by id; only the index moved.
        assert!(store.get_by_id("a").await?.is_some());
        assert!(store.get_by_id("b").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn expired_record_is_absent_by_id_but_indexed() -> Result<(), StoreError> {
        let store = MemorySessionStore::new();
        store.put(&record("a", "u1", "default", -5)).await?;

        assert!(store.get_by_id("a").await?.is_none());
        assert!(store
            .get_by_identity_and_slot("u1", "default")
            .await?
            .is_some());
        Ok(())
    }

    #[tokio::test]
    async fn delete_slot_only_when_pointing_at_expected_id() -> Result<(), StoreError> {
        let store = MemorySessionStore::new();
        store.put(&record("a", "u1", "default", 60)).await?;
        store.put(&record("b", "u1", "default", 60)).await?;

        // Index points at "b" now; a stale delete for "a" must not touch it.
        assert!(!store.delete_slot("u1", "default", "a").await?);
        assert!(store
            .get_by_identity_and_slot("u1", "default")
            .await?
            .is_some());

        assert!(store.delete_slot("u1", "default", "b").await?);
        assert!(store
            .get_by_identity_and_slot("u1", "default")
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn delete_many_counts_removals() -> Result<(), StoreError> {
        let store = MemorySessionStore::new();
        store.put(&record("a", "u1", "s1", 60)).await?;
        store.put(&record("b", "u1", "s2", 60)).await?;

        let removed = store
            .delete_many(&["a".to_string(), "b".to_string(), "missing".to_string()])
            .await?;
        assert_eq!(removed, 2);
        Ok(())
    }
}
