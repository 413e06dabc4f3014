use super::MemoryOrchestrator;
use crate::embedding::EmbeddingProvider;
use crate::error::{Backend, BackendResultExt, MemoryError};
use crate::vector::VectorStats;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Vector store statistics at a point in time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemoryStats {
    pub vector_stats: VectorStats,
    pub timestamp: DateTime<Utc>,
}

/// Description of the active embedding provider.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbeddingInfo {
    pub provider: String,
    pub dimensions: usize,
    pub model: String,
    pub api_url: String,
    pub features: Vec<String>,
}

/// Comparison of the provider's output size with what the store holds.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DimensionCheck {
    pub provider: String,
    pub provider_dimensions: usize,
    pub store_dimensions: usize,
    pub compatible: bool,
}

/// Report of an embedding provider swap.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderSwitch {
    pub previous: String,
    pub previous_dimensions: usize,
    pub current: String,
    pub current_dimensions: usize,
    /// `None` when the store could not report its dimension.
    pub store_dimensions: Option<usize>,
    /// Stored embeddings no longer match the active provider.
    pub reindex_required: bool,
}

impl MemoryOrchestrator {
    pub async fn memory_stats(&self) -> Result<MemoryStats, MemoryError> {
        let vector_stats = self
            .vectors
            .stats()
            .await
            .during(Backend::VectorStore, "read store statistics")?;
        Ok(MemoryStats {
            vector_stats,
            timestamp: Utc::now(),
        })
    }

    pub fn embedding_info(&self) -> EmbeddingInfo {
        let embedder = self.embedder();
        EmbeddingInfo {
            provider: embedder.name().to_string(),
            dimensions: embedder.dimensions(),
            model: embedder.model().to_string(),
            api_url: embedder.base_url().to_string(),
            features: embedder
                .features()
                .iter()
                .map(|feature| feature.to_string())
                .collect(),
        }
    }

    /// Detect a provider whose output no longer matches the stored vectors.
    pub async fn check_embedding_dimensions(&self) -> Result<DimensionCheck, MemoryError> {
        let embedder = self.embedder();
        let stats = self
            .vectors
            .stats()
            .await
            .during(Backend::VectorStore, "read store statistics")?;
        let compatible = stats.dimension == embedder.dimensions();
        if !compatible {
            warn!(
                "embedding dimensions differ from store (provider={}, provider_dimensions={}, store_dimensions={})",
                embedder.name(),
                embedder.dimensions(),
                stats.dimension
            );
        }
        Ok(DimensionCheck {
            provider: embedder.name().to_string(),
            provider_dimensions: embedder.dimensions(),
            store_dimensions: stats.dimension,
            compatible,
        })
    }

    /// Replace the active embedding provider. Stored embeddings are never
    /// regenerated; the report flags when they stop matching.
    pub async fn switch_embedding_provider(
        &self,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> ProviderSwitch {
        let store_dimensions = match self.vectors.stats().await {
            Ok(stats) if stats.vector_count > 0 && stats.dimension > 0 => Some(stats.dimension),
            Ok(_) => None,
            Err(err) => {
                warn!("store statistics unavailable during provider switch (error={err})");
                None
            }
        };
        let previous = {
            let mut active = self.embedder.write();
            std::mem::replace(&mut *active, provider.clone())
        };
        let reference = store_dimensions.unwrap_or(previous.dimensions());
        let reindex_required = reference != provider.dimensions();
        if reindex_required {
            warn!(
                "embedding provider switched without reindex (previous={}, current={}, expected_dimensions={}, current_dimensions={})",
                previous.name(),
                provider.name(),
                reference,
                provider.dimensions()
            );
        } else {
            info!(
                "embedding provider switched (previous={}, current={})",
                previous.name(),
                provider.name()
            );
        }
        ProviderSwitch {
            previous: previous.name().to_string(),
            previous_dimensions: previous.dimensions(),
            current: provider.name().to_string(),
            current_dimensions: provider.dimensions(),
            store_dimensions,
            reindex_required,
        }
    }
}
