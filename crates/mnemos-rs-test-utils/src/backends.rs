use crate::{HashEmbedder, MemoryKv, MemoryVectorStore, RecordingDispatcher};
use mnemos_rs_memory::{
    EmbeddingProvider, MemoryOrchestrator, OrchestratorSettings, SessionStore,
};
use std::sync::Arc;

/// One fake of every collaborator, shared with the orchestrators built from
/// it so tests can inspect and perturb backend state.
pub struct FakeBackends {
    pub kv: Arc<MemoryKv>,
    pub vectors: Arc<MemoryVectorStore>,
    pub embedder: Arc<HashEmbedder>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub settings: OrchestratorSettings,
}

impl FakeBackends {
    /// Fakes with a 1024-dimension embedder and default settings.
    pub fn new() -> Self {
        Self {
            kv: Arc::new(MemoryKv::new()),
            vectors: Arc::new(MemoryVectorStore::new()),
            embedder: Arc::new(HashEmbedder::jina_like()),
            dispatcher: Arc::new(RecordingDispatcher::new()),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn orchestrator(&self) -> MemoryOrchestrator {
        self.orchestrator_with(self.embedder.clone())
    }

    pub fn orchestrator_with(&self, embedder: Arc<dyn EmbeddingProvider>) -> MemoryOrchestrator {
        MemoryOrchestrator::new(
            SessionStore::new(self.kv.clone(), 86_400),
            self.vectors.clone(),
            embedder,
            self.dispatcher.clone(),
            self.settings.clone(),
        )
    }
}

impl Default for FakeBackends {
    fn default() -> Self {
        Self::new()
    }
}
