//! Embedding provider contract and the hosted implementations.
//!
//! Providers differ in output dimensionality. Every vector in the store must
//! come from a provider with the same dimensionality; swapping providers
//! without re-embedding stored entries silently breaks similarity search.

mod jina;
mod openai;

pub use jina::JinaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

use crate::error::BackendError;
use async_trait::async_trait;
use log::info;
use mnemos_rs_config::{EmbeddingConfig, EmbeddingProviderKind};
use std::sync::Arc;

#[async_trait]
/// Text-to-vector provider used by the orchestrator.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.embed_many(&[text.to_string()]).await
    }

    /// Send several texts in one request and return the leading embedding.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<f32>, BackendError>;

    /// Embed several texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;

    /// Output dimensionality of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Provider name used in reports.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str {
        ""
    }

    /// API endpoint the provider calls.
    fn base_url(&self) -> &str {
        ""
    }

    /// Short capability tags for reports.
    fn features(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Build the provider selected in config.
pub fn build_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, BackendError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::Jina => Arc::new(JinaEmbeddingProvider::from_config(config)?),
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::from_config(config)?),
    };
    info!(
        "embedding provider ready (provider={}, dimensions={})",
        provider.name(),
        provider.dimensions()
    );
    Ok(provider)
}

/// Reject empty input before any request is made.
fn ensure_texts(texts: &[String]) -> Result<(), BackendError> {
    if texts.is_empty() {
        return Err(BackendError::InvalidInput("no texts provided".to_string()));
    }
    Ok(())
}

/// Order response items by their `index` and check the count matches.
fn collect_ordered(
    mut items: Vec<(usize, Vec<f32>)>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, BackendError> {
    if items.len() != expected {
        return Err(BackendError::Malformed(format!(
            "expected {expected} embeddings, got {}",
            items.len()
        )));
    }
    items.sort_by_key(|(index, _)| *index);
    Ok(items.into_iter().map(|(_, embedding)| embedding).collect())
}
