//! Session store: key-value contract and session record persistence.
//!
//! Layout: `session:{session_id}` holds the serialized record and
//! `user_sessions:{user_id}` is the set of session ids an owner ever wrote.
//! Both expire independently, so the set may list sessions that are gone.

use crate::error::BackendError;
use crate::model::{Metadata, SessionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

#[async_trait]
/// Key-value commands the session store relies on.
pub trait KeyValueStore: Send + Sync {
    /// Set `key` to `value`, expiring after `ttl_secs`.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError>;
    /// Read `key`; `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    /// Delete `key`, returning whether it existed.
    async fn del(&self, key: &str) -> Result<bool, BackendError>;
    /// Add `member` to the set at `key`.
    async fn sadd(&self, key: &str, member: &str) -> Result<(), BackendError>;
    /// Reset the expiration of `key`.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError>;
    /// List the members of the set at `key`.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError>;
}

/// Key holding a session record.
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Key holding the set of session ids for an owner.
pub fn owner_sessions_key(user_id: &str) -> String {
    format!("user_sessions:{user_id}")
}

/// Session persistence over a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

impl SessionStore {
    /// Create a store writing records with the given retention window.
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self { kv, ttl_secs }
    }

    /// Load a session record.
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, BackendError> {
        let Some(raw) = self.kv.get(&session_key(session_id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw).map_err(|err| {
            BackendError::Malformed(format!("session {session_id} is not a valid record: {err}"))
        })?;
        Ok(Some(record))
    }

    /// Write a record, reset its retention window and register it under its
    /// owner.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), BackendError> {
        let payload = serde_json::to_string(record)?;
        self.kv
            .set(&session_key(&record.session_id), &payload, self.ttl_secs)
            .await?;
        let owner_key = owner_sessions_key(&record.user_id);
        self.kv.sadd(&owner_key, &record.session_id).await?;
        self.kv.expire(&owner_key, self.ttl_secs).await?;
        debug!(
            "saved session (session_id={}, messages={}, bytes={})",
            record.session_id,
            record.messages.len(),
            payload.len()
        );
        Ok(())
    }

    /// Delete a record, returning whether it existed.
    pub async fn delete(&self, session_id: &str) -> Result<bool, BackendError> {
        self.kv.del(&session_key(session_id)).await
    }

    /// Session ids ever registered for an owner.
    pub async fn owner_sessions(&self, user_id: &str) -> Result<Vec<String>, BackendError> {
        self.kv.smembers(&owner_sessions_key(user_id)).await
    }

    /// Drop an owner's session-id set.
    pub async fn forget_owner(&self, user_id: &str) -> Result<bool, BackendError> {
        self.kv.del(&owner_sessions_key(user_id)).await
    }

    /// Merge context into an existing session. Returns `None` when absent.
    pub async fn merge_context(
        &self,
        session_id: &str,
        context: Metadata,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, BackendError> {
        let Some(mut record) = self.load(session_id).await? else {
            return Ok(None);
        };
        record.merge_context(context, now);
        self.save(&record).await?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, SessionStore, owner_sessions_key, session_key};
    use crate::error::BackendError;
    use crate::model::SessionRecord;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    #[derive(Default)]
    struct MapKv {
        values: Mutex<HashMap<String, String>>,
        sets: Mutex<HashMap<String, BTreeSet<String>>>,
        expirations: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl KeyValueStore for MapKv {
        async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError> {
            self.values.lock().insert(key.to_string(), value.to_string());
            self.expirations.lock().push((key.to_string(), ttl_secs));
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            Ok(self.values.lock().get(key).cloned())
        }

        async fn del(&self, key: &str) -> Result<bool, BackendError> {
            Ok(self.values.lock().remove(key).is_some())
        }

        async fn sadd(&self, key: &str, member: &str) -> Result<(), BackendError> {
            self.sets
                .lock()
                .entry(key.to_string())
                .or_default()
                .insert(member.to_string());
            Ok(())
        }

        async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError> {
            self.expirations.lock().push((key.to_string(), ttl_secs));
            Ok(())
        }

        async fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
            Ok(self
                .sets
                .lock()
                .get(key)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn save_writes_record_and_owner_set_with_ttl() {
        let kv = Arc::new(MapKv::default());
        let store = SessionStore::new(kv.clone(), 86_400);
        let record = SessionRecord::new("alice", "s1", Utc::now());
        store.save(&record).await.expect("save");

        assert_eq!(store.load("s1").await.expect("load"), Some(record));
        assert_eq!(
            store.owner_sessions("alice").await.expect("owner"),
            vec!["s1".to_string()]
        );
        assert_eq!(
            kv.expirations.lock().clone(),
            vec![
                (session_key("s1"), 86_400),
                (owner_sessions_key("alice"), 86_400)
            ]
        );
    }

    #[tokio::test]
    async fn corrupt_record_is_reported_as_malformed() {
        let kv = Arc::new(MapKv::default());
        kv.values
            .lock()
            .insert(session_key("s1"), "not json".to_string());
        let store = SessionStore::new(kv, 60);
        let err = store.load("s1").await.expect_err("corrupt");
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn merge_skips_missing_sessions() {
        let store = SessionStore::new(Arc::new(MapKv::default()), 60);
        let merged = store
            .merge_context("missing", Default::default(), Utc::now())
            .await
            .expect("merge");
        assert_eq!(merged, None);
    }
}
