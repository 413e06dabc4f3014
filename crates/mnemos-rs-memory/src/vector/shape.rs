//! Conversion between memory entries and vector-store records.
//!
//! Stored metadata is flat: `id`, `user_id`, `content`, `timestamp` (unix
//! seconds) and `ttl`, plus the entry's own metadata. The reserved keys are
//! written last so entry metadata cannot shadow them.

use super::{MetadataFilter, VectorMatch, VectorRecord};
use crate::model::{MemoryEntry, MemoryResult, Metadata};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const ID_KEY: &str = "id";
pub const OWNER_KEY: &str = "user_id";
pub const CONTENT_KEY: &str = "content";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const TTL_KEY: &str = "ttl";
pub const SESSION_KEY: &str = "session_id";
pub const ROLE_KEY: &str = "role";

/// Filter restricting a query to one owner.
pub fn owner_filter(user_id: &str) -> MetadataFilter {
    MetadataFilter::equals(OWNER_KEY, user_id)
}

/// Flatten an entry into the record written to the store.
pub fn entry_to_record(entry: &MemoryEntry) -> VectorRecord {
    let mut metadata = entry.metadata.clone();
    metadata.insert(ID_KEY.to_string(), Value::from(entry.id.clone()));
    metadata.insert(OWNER_KEY.to_string(), Value::from(entry.user_id.clone()));
    metadata.insert(CONTENT_KEY.to_string(), Value::from(entry.content.clone()));
    metadata.insert(
        TIMESTAMP_KEY.to_string(),
        Value::from(entry.timestamp.timestamp()),
    );
    metadata.insert(TTL_KEY.to_string(), Value::from(entry.ttl));
    VectorRecord {
        id: entry.id.clone(),
        vector: entry.embedding.clone(),
        metadata,
    }
}

/// Turn a query match into a result. The native match id is canonical.
pub fn match_to_result(matched: VectorMatch) -> MemoryResult {
    let VectorMatch {
        id,
        score,
        mut metadata,
    } = matched;
    let content = metadata
        .get(CONTENT_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let timestamp = timestamp_from(&metadata).unwrap_or_default();
    metadata.insert(ID_KEY.to_string(), Value::from(id.clone()));
    MemoryResult {
        id,
        content,
        score,
        metadata,
        timestamp,
    }
}

/// Whether a stored record is past `timestamp + ttl`. Records without both
/// fields never expire.
pub fn is_expired(metadata: &Metadata, now: DateTime<Utc>) -> bool {
    let Some(timestamp) = metadata.get(TIMESTAMP_KEY).and_then(as_i64) else {
        return false;
    };
    let Some(ttl) = metadata.get(TTL_KEY).and_then(as_i64) else {
        return false;
    };
    timestamp.saturating_add(ttl) < now.timestamp()
}

fn timestamp_from(metadata: &Metadata) -> Option<DateTime<Utc>> {
    let seconds = metadata.get(TIMESTAMP_KEY).and_then(as_i64)?;
    DateTime::from_timestamp(seconds, 0)
}

/// Numbers may round-trip through the store as floats.
fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|number| number as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry() -> MemoryEntry {
        let mut metadata = Metadata::new();
        metadata.insert(SESSION_KEY.to_string(), json!("s1"));
        metadata.insert(ROLE_KEY.to_string(), json!("user"));
        metadata.insert(OWNER_KEY.to_string(), json!("mallory"));
        MemoryEntry {
            id: "m1".to_string(),
            user_id: "alice".to_string(),
            content: "I have a cat".to_string(),
            embedding: vec![0.5, 0.5],
            metadata,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).expect("ts"),
            ttl: 60,
        }
    }

    #[test]
    fn reserved_keys_win_over_entry_metadata() {
        let record = entry_to_record(&entry());
        assert_eq!(record.id, "m1");
        assert_eq!(record.metadata[OWNER_KEY], json!("alice"));
        assert_eq!(record.metadata[ID_KEY], json!("m1"));
        assert_eq!(record.metadata[TIMESTAMP_KEY], json!(1_700_000_000));
        assert_eq!(record.metadata[SESSION_KEY], json!("s1"));
    }

    #[test]
    fn match_uses_native_id_and_float_timestamps() {
        let metadata = json!({
            "id": "stale",
            "content": "hello",
            "timestamp": 1_700_000_000.0
        });
        let result = match_to_result(VectorMatch {
            id: "m9".to_string(),
            score: 0.9,
            metadata: metadata.as_object().cloned().expect("map"),
        });
        assert_eq!(result.id, "m9");
        assert_eq!(result.metadata[ID_KEY], json!("m9"));
        assert_eq!(result.content, "hello");
        assert_eq!(result.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn expiry_requires_timestamp_and_ttl() {
        let now = DateTime::from_timestamp(1_000, 0).expect("now");
        let expired = json!({ "timestamp": 100, "ttl": 100 });
        let live = json!({ "timestamp": 900, "ttl": 200 });
        let boundary = json!({ "timestamp": 900, "ttl": 100 });
        let partial = json!({ "timestamp": 100 });
        assert!(is_expired(expired.as_object().expect("map"), now));
        assert!(!is_expired(live.as_object().expect("map"), now));
        assert!(!is_expired(boundary.as_object().expect("map"), now));
        assert!(!is_expired(partial.as_object().expect("map"), now));
    }
}
