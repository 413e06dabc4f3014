//! Memory orchestrator: composes the session store, vector store, embedding
//! provider and task dispatcher into the user-facing operations.

mod admin;
mod cleanup;
mod sessions;

pub use admin::{DimensionCheck, EmbeddingInfo, MemoryStats, ProviderSwitch};
pub use cleanup::{CleanupReport, OwnerCleanupReport, SweepReport};
pub use sessions::SessionDeletion;

use crate::embedding::{EmbeddingProvider, build_embedding_provider};
use crate::error::{Backend, BackendError, BackendResultExt, MemoryError};
use crate::model::{
    MemoryEntry, Message, Metadata, QueryMemoryRequest, QueryResponse, Role, SaveMemoryRequest,
    SessionRecord,
};
use crate::qstash::QStash;
use crate::redis::UpstashRedis;
use crate::session::SessionStore;
use crate::tasks::TaskDispatcher;
use crate::vector::{UpstashVector, VectorQuery, VectorStore, shape};
use chrono::Utc;
use log::{debug, info, warn};
use mnemos_rs_config::MnemosConfig;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Probe text used to surface an owner's recent memories.
pub const RECENT_PROBE: &str = "recent conversation";
pub const RECENT_DEFAULT_LIMIT: usize = 20;
pub const RECENT_MIN_SCORE: f32 = 0.1;
pub const SEARCH_DEFAULT_LIMIT: usize = 10;
pub const SEARCH_MIN_SCORE: f32 = 0.6;

/// Tuning values the orchestrator reads on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Lifetime written on every memory entry.
    pub memory_ttl_secs: u64,
    pub default_query_limit: usize,
    pub default_min_score: f32,
    /// Page size for full-store scans and owner cleanup rounds.
    pub scan_page_size: usize,
    /// Cron expression of the recurring expiration sweep.
    pub cleanup_cron: String,
    /// Delivery retries requested from the dispatcher.
    pub dispatch_retries: u32,
}

impl OrchestratorSettings {
    pub fn from_config(config: &MnemosConfig) -> Self {
        Self {
            memory_ttl_secs: config.memory.memory_ttl_secs,
            default_query_limit: config.memory.default_query_limit,
            default_min_score: config.memory.default_min_score,
            scan_page_size: config.memory.scan_page_size,
            cleanup_cron: config.task_dispatch.cleanup_cron.clone(),
            dispatch_retries: config.task_dispatch.retries,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&MnemosConfig::default())
    }
}

/// Result of a save. A session-only outcome is a success for the caller:
/// the transcript holds the message but no long-term memory was written.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Session and vector store both hold the new message.
    Committed {
        memory_id: String,
        session_id: String,
    },
    /// The session write succeeded; embedding or vector write failed.
    SessionOnly {
        memory_id: String,
        session_id: String,
        error: MemoryError,
    },
    /// No memory was written. A session store failure partway through the
    /// save may still leave the transcript updated.
    Failed { error: MemoryError },
}

impl SaveOutcome {
    /// Id of the saved message, if the session write happened.
    pub fn memory_id(&self) -> Option<&str> {
        match self {
            SaveOutcome::Committed { memory_id, .. } | SaveOutcome::SessionOnly { memory_id, .. } => {
                Some(memory_id)
            }
            SaveOutcome::Failed { .. } => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, SaveOutcome::Committed { .. })
    }

    /// Stable status label used in responses and logs.
    pub fn status(&self) -> &'static str {
        match self {
            SaveOutcome::Committed { .. } => "committed",
            SaveOutcome::SessionOnly { .. } => "session_only",
            SaveOutcome::Failed { .. } => "failed",
        }
    }
}

/// Stateless façade over the four hosted collaborators.
pub struct MemoryOrchestrator {
    sessions: SessionStore,
    vectors: Arc<dyn VectorStore>,
    embedder: RwLock<Arc<dyn EmbeddingProvider>>,
    dispatcher: Arc<dyn TaskDispatcher>,
    settings: OrchestratorSettings,
}

impl MemoryOrchestrator {
    pub fn new(
        sessions: SessionStore,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        dispatcher: Arc<dyn TaskDispatcher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            sessions,
            vectors,
            embedder: RwLock::new(embedder),
            dispatcher,
            settings,
        }
    }

    /// Wire the hosted adapters described by a validated config.
    pub fn from_config(config: &MnemosConfig) -> Result<Self, BackendError> {
        let kv = UpstashRedis::from_config(&config.session_store)?;
        let sessions = SessionStore::new(Arc::new(kv), config.session_store.ttl_secs);
        let vectors = UpstashVector::from_config(&config.vector_store)?;
        let embedder = build_embedding_provider(&config.embedding)?;
        let dispatcher = QStash::from_config(&config.task_dispatch)?;
        info!(
            "memory orchestrator ready (embedding={}, dimensions={})",
            embedder.name(),
            embedder.dimensions()
        );
        Ok(Self::new(
            sessions,
            Arc::new(vectors),
            embedder,
            Arc::new(dispatcher),
            OrchestratorSettings::from_config(config),
        ))
    }

    /// Active embedding provider.
    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.read().clone()
    }

    /// Append a message to its session, then embed it and store it as a
    /// memory. Steps run in that order; a failure after the session write
    /// yields [`SaveOutcome::SessionOnly`] and nothing is rolled back.
    pub async fn save_memory(&self, request: SaveMemoryRequest) -> SaveOutcome {
        let role = match validate_save(&request) {
            Ok(role) => role,
            Err(error) => return SaveOutcome::Failed { error },
        };
        let now = Utc::now();
        let memory_id = Uuid::new_v4().to_string();

        let existing = match self
            .sessions
            .load(&request.session_id)
            .await
            .during(Backend::SessionStore, "load session")
        {
            Ok(existing) => existing,
            Err(error) => return SaveOutcome::Failed { error },
        };
        let mut record = existing
            .unwrap_or_else(|| SessionRecord::new(&request.user_id, &request.session_id, now));
        record.push_message(Message {
            id: memory_id.clone(),
            role,
            content: request.content.clone(),
            timestamp: now,
        });
        if let Err(error) = self
            .sessions
            .save(&record)
            .await
            .during(Backend::SessionStore, "save session")
        {
            return SaveOutcome::Failed { error };
        }

        let session_only = |error: MemoryError| {
            warn!(
                "memory not stored, session kept (memory_id={}, session_id={}, error={})",
                memory_id, request.session_id, error
            );
            SaveOutcome::SessionOnly {
                memory_id: memory_id.clone(),
                session_id: request.session_id.clone(),
                error,
            }
        };

        let embedder = self.embedder();
        let embedding = match embedder
            .embed(&request.content)
            .await
            .during(Backend::Embedding, "generate embedding")
        {
            Ok(embedding) => embedding,
            Err(error) => return session_only(error),
        };
        if embedding.len() != embedder.dimensions() {
            return session_only(MemoryError::Upstream {
                backend: Backend::Embedding,
                operation: "generate embedding",
                source: BackendError::Malformed(format!(
                    "expected {} dimensions, got {}",
                    embedder.dimensions(),
                    embedding.len()
                )),
            });
        }

        let mut metadata = Metadata::new();
        metadata.insert(
            shape::SESSION_KEY.to_string(),
            Value::from(request.session_id.clone()),
        );
        metadata.insert(shape::ROLE_KEY.to_string(), Value::from(role.as_str()));
        let entry = MemoryEntry {
            id: memory_id.clone(),
            user_id: request.user_id.clone(),
            content: request.content.clone(),
            embedding,
            metadata,
            timestamp: now,
            ttl: self.settings.memory_ttl_secs,
        };
        if let Err(error) = self
            .vectors
            .upsert(shape::entry_to_record(&entry))
            .await
            .during(Backend::VectorStore, "upsert memory")
        {
            return session_only(error);
        }

        info!(
            "saved memory (owner_id={}, session_id={}, memory_id={}, content_len={})",
            request.user_id,
            request.session_id,
            memory_id,
            request.content.len()
        );
        SaveOutcome::Committed {
            memory_id,
            session_id: request.session_id,
        }
    }

    /// Nearest memories of one owner, at or above the score threshold, in
    /// the order the vector store ranked them.
    pub async fn query_memory(
        &self,
        request: QueryMemoryRequest,
    ) -> Result<QueryResponse, MemoryError> {
        require("user_id", &request.user_id)?;
        require("query", &request.query)?;
        let limit = if request.limit <= 0 {
            self.settings.default_query_limit
        } else {
            usize::try_from(request.limit).unwrap_or(usize::MAX)
        };
        let min_score = if request.min_score <= 0.0 {
            self.settings.default_min_score
        } else {
            request.min_score
        };

        let vector = self
            .embedder()
            .embed(&request.query)
            .await
            .during(Backend::Embedding, "embed query")?;
        let matches = self
            .vectors
            .query(&VectorQuery {
                vector,
                top_k: limit,
                filter: Some(shape::owner_filter(&request.user_id)),
            })
            .await
            .during(Backend::VectorStore, "query memories")?;
        let returned = matches.len();

        let mut seen = HashSet::new();
        let results: Vec<_> = matches
            .into_iter()
            .filter(|matched| matched.score >= min_score)
            .filter(|matched| seen.insert(matched.id.clone()))
            .map(shape::match_to_result)
            .collect();
        debug!(
            "queried memories (owner_id={}, limit={}, min_score={}, returned={}, kept={})",
            request.user_id,
            limit,
            min_score,
            returned,
            results.len()
        );
        Ok(QueryResponse::new(results))
    }

    /// Memories surfaced by a generic recency probe.
    pub async fn recent_memories(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<QueryResponse, MemoryError> {
        let limit = if limit <= 0 {
            RECENT_DEFAULT_LIMIT as i64
        } else {
            limit
        };
        self.query_memory(QueryMemoryRequest {
            user_id: user_id.to_string(),
            query: RECENT_PROBE.to_string(),
            limit,
            min_score: RECENT_MIN_SCORE,
        })
        .await
    }

    /// Keyword search with a stricter score threshold.
    pub async fn search_memories(
        &self,
        user_id: &str,
        keyword: &str,
        limit: i64,
    ) -> Result<QueryResponse, MemoryError> {
        require("keyword", keyword)?;
        let limit = if limit <= 0 {
            SEARCH_DEFAULT_LIMIT as i64
        } else {
            limit
        };
        self.query_memory(QueryMemoryRequest {
            user_id: user_id.to_string(),
            query: keyword.to_string(),
            limit,
            min_score: SEARCH_MIN_SCORE,
        })
        .await
    }

    /// Delete one memory owned by `user_id`. Memories of other owners are
    /// reported as not found.
    pub async fn delete_memory(&self, memory_id: &str, user_id: &str) -> Result<(), MemoryError> {
        require("memory_id", memory_id)?;
        require("user_id", user_id)?;
        let record = self
            .vectors
            .fetch(memory_id)
            .await
            .during(Backend::VectorStore, "fetch memory")?
            .ok_or_else(|| MemoryError::MemoryNotFound(memory_id.to_string()))?;
        let owner = record.metadata.get(shape::OWNER_KEY).and_then(Value::as_str);
        if owner != Some(user_id) {
            debug!(
                "memory owner mismatch (memory_id={}, owner_id={})",
                memory_id, user_id
            );
            return Err(MemoryError::MemoryNotFound(memory_id.to_string()));
        }
        self.vectors
            .delete(memory_id)
            .await
            .during(Backend::VectorStore, "delete memory")?;
        info!(
            "deleted memory (memory_id={}, owner_id={})",
            memory_id, user_id
        );
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_save(request: &SaveMemoryRequest) -> Result<Role, MemoryError> {
    require("user_id", &request.user_id)?;
    require("session_id", &request.session_id)?;
    require("content", &request.content)?;
    request.role.parse::<Role>().map_err(MemoryError::Validation)
}

#[cfg(test)]
mod tests {
    use super::{SaveOutcome, validate_save};
    use crate::error::MemoryError;
    use crate::model::{Role, SaveMemoryRequest};
    use pretty_assertions::assert_eq;

    fn request(content: &str, role: &str) -> SaveMemoryRequest {
        SaveMemoryRequest {
            user_id: "alice".to_string(),
            session_id: "s1".to_string(),
            content: content.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn save_validation_rejects_blank_content_and_unknown_roles() {
        assert_eq!(
            validate_save(&request("hi", "assistant")).expect("valid"),
            Role::Assistant
        );
        assert!(matches!(
            validate_save(&request("  ", "user")),
            Err(MemoryError::Validation(_))
        ));
        assert!(matches!(
            validate_save(&request("hi", "system")),
            Err(MemoryError::Validation(_))
        ));
    }

    #[test]
    fn outcome_status_labels() {
        let failed = SaveOutcome::Failed {
            error: MemoryError::Validation("x".to_string()),
        };
        assert_eq!(failed.status(), "failed");
        assert!(failed.memory_id().is_none());
        let committed = SaveOutcome::Committed {
            memory_id: "m1".to_string(),
            session_id: "s1".to_string(),
        };
        assert!(committed.is_committed());
        assert_eq!(committed.memory_id(), Some("m1"));
    }
}
