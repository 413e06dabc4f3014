//! Vector store contract, metadata shaping and full-store scans.

mod scan;
pub mod shape;
mod upstash;

pub use scan::VectorScan;
pub use upstash::UpstashVector;

use crate::error::BackendError;
use crate::model::Metadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored vector with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    /// Empty when the store was asked not to return vectors.
    #[serde(default)]
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One nearest-neighbour match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Equality predicate on one metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Render as a filter expression, e.g. `user_id = 'alice'`.
    pub fn to_expression(&self) -> String {
        let value = self.value.replace('\\', "\\\\").replace('\'', "\\'");
        format!("{} = '{}'", self.field, value)
    }

    /// Evaluate against stored metadata.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.field).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

/// Nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
}

/// One page of a full-store walk.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPage {
    pub records: Vec<VectorRecord>,
    /// `None` once the walk is complete.
    pub next_cursor: Option<String>,
}

/// Store-wide statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorStats {
    pub vector_count: u64,
    pub dimension: usize,
    /// Full payload as reported by the store.
    #[serde(default)]
    pub raw: Value,
}

#[async_trait]
/// Vector database used for long-term memory.
pub trait VectorStore: Send + Sync {
    /// Insert or replace a vector.
    async fn upsert(&self, record: VectorRecord) -> Result<(), BackendError>;
    /// Return up to `top_k` matches ordered by descending score.
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>, BackendError>;
    /// Delete by id, returning whether anything was removed. Deleting an
    /// absent id is not an error.
    async fn delete(&self, id: &str) -> Result<bool, BackendError>;
    /// Fetch one vector with metadata.
    async fn fetch(&self, id: &str) -> Result<Option<VectorRecord>, BackendError>;
    /// Walk the store; start with an empty cursor.
    async fn range(&self, cursor: &str, limit: usize) -> Result<VectorPage, BackendError>;
    /// Store-wide statistics.
    async fn stats(&self) -> Result<VectorStats, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::MetadataFilter;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn filter_renders_and_escapes_expression() {
        assert_eq!(
            MetadataFilter::equals("user_id", "alice").to_expression(),
            "user_id = 'alice'"
        );
        assert_eq!(
            MetadataFilter::equals("user_id", "o'neil").to_expression(),
            "user_id = 'o\\'neil'"
        );
    }

    #[test]
    fn filter_matches_string_field_only() {
        let filter = MetadataFilter::equals("user_id", "alice");
        let owned = json!({ "user_id": "alice" });
        let other = json!({ "user_id": "bob" });
        assert!(filter.matches(owned.as_object().expect("map")));
        assert!(!filter.matches(other.as_object().expect("map")));
    }
}
