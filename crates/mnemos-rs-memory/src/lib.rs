//! Memory orchestration over hosted session, vector, embedding and task
//! services.

pub mod embedding;
pub mod error;
mod http;
pub mod model;
pub mod orchestrator;
pub mod qstash;
pub mod redis;
pub mod session;
pub mod tasks;
pub mod vector;

pub use embedding::{
    EmbeddingProvider, JinaEmbeddingProvider, OpenAiEmbeddingProvider, build_embedding_provider,
};
pub use error::{Backend, BackendError, MemoryError};
pub use model::{
    CleanupKind, CleanupTask, MemoryEntry, MemoryResult, Message, Metadata, QueryMemoryRequest,
    QueryResponse, Role, SaveMemoryRequest, SessionRecord,
};
pub use orchestrator::{
    CleanupReport, DimensionCheck, EmbeddingInfo, MemoryOrchestrator, MemoryStats,
    OrchestratorSettings, OwnerCleanupReport, ProviderSwitch, SaveOutcome, SessionDeletion,
    SweepReport,
};
pub use qstash::QStash;
pub use redis::UpstashRedis;
pub use session::{KeyValueStore, SessionStore};
pub use tasks::{PublishRequest, ScheduleRequest, TaskDispatcher};
pub use vector::{
    MetadataFilter, UpstashVector, VectorMatch, VectorPage, VectorQuery, VectorRecord,
    VectorScan, VectorStats, VectorStore,
};
