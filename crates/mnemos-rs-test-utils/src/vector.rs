use async_trait::async_trait;
use mnemos_rs_memory::{
    BackendError, VectorMatch, VectorPage, VectorQuery, VectorRecord, VectorStats, VectorStore,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct VectorState {
    records: BTreeMap<String, VectorRecord>,
    dimension: Option<usize>,
}

/// Vector store kept in a sorted map, ranking by cosine similarity.
///
/// The dimension is fixed by the first upsert (or the constructor); vectors
/// of another length are rejected like a hosted index would.
#[derive(Default)]
pub struct MemoryVectorStore {
    state: Mutex<VectorState>,
    fail_upsert: AtomicBool,
    fail_query: AtomicBool,
    fail_stats: AtomicBool,
    fail_delete: Mutex<HashSet<String>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(dimension: usize) -> Self {
        let store = Self::default();
        store.state.lock().dimension = Some(dimension);
        store
    }

    pub fn fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_query(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    /// Make deletes of one id fail.
    pub fn fail_delete_of(&self, id: impl Into<String>) {
        self.fail_delete.lock().insert(id.into());
    }

    /// Insert a record directly, bypassing dimension checks.
    pub fn seed(&self, record: VectorRecord) {
        let mut state = self.state.lock();
        state.dimension.get_or_insert(record.vector.len());
        state.records.insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &str) -> Option<VectorRecord> {
        self.state.lock().records.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state.lock().records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unavailable(operation: &str) -> BackendError {
        BackendError::Status {
            status: 503,
            body: format!("{operation} unavailable"),
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), BackendError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Self::unavailable("upsert"));
        }
        let mut state = self.state.lock();
        let dimension = *state.dimension.get_or_insert(record.vector.len());
        if record.vector.len() != dimension {
            return Err(BackendError::Remote(format!(
                "invalid vector dimension: {}, expected: {dimension}",
                record.vector.len()
            )));
        }
        state.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>, BackendError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(Self::unavailable("query"));
        }
        let state = self.state.lock();
        if let Some(dimension) = state.dimension.filter(|dim| *dim != query.vector.len()) {
            return Err(BackendError::Remote(format!(
                "invalid vector dimension: {}, expected: {dimension}",
                query.vector.len()
            )));
        }
        let mut matches: Vec<VectorMatch> = state
            .records
            .values()
            .filter(|record| {
                query
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(&record.metadata))
            })
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine(&query.vector, &record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(query.top_k);
        Ok(matches)
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        if self.fail_delete.lock().contains(id) {
            return Err(Self::unavailable("delete"));
        }
        Ok(self.state.lock().records.remove(id).is_some())
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorRecord>, BackendError> {
        Ok(self.record(id))
    }

    /// The cursor is the last id of the previous page.
    async fn range(&self, cursor: &str, limit: usize) -> Result<VectorPage, BackendError> {
        let state = self.state.lock();
        let mut remaining = state
            .records
            .values()
            .filter(|record| cursor.is_empty() || record.id.as_str() > cursor);
        let records: Vec<VectorRecord> = remaining.by_ref().take(limit.max(1)).cloned().collect();
        let next_cursor = match (remaining.next(), records.last()) {
            (Some(_), Some(last)) => Some(last.id.clone()),
            _ => None,
        };
        Ok(VectorPage {
            records,
            next_cursor,
        })
    }

    async fn stats(&self) -> Result<VectorStats, BackendError> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(Self::unavailable("info"));
        }
        let state = self.state.lock();
        let vector_count = state.records.len() as u64;
        let dimension = state.dimension.unwrap_or(0);
        Ok(VectorStats {
            vector_count,
            dimension,
            raw: json!({
                "vectorCount": vector_count,
                "dimension": dimension,
                "similarityFunction": "COSINE",
            }),
        })
    }
}
