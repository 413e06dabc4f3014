//! Jina AI embeddings (`jina-embeddings-v3`, 1024 dimensions).
//!
//! Input is always sent as an array; vectors are requested normalized.

use super::{EmbeddingProvider, collect_ordered, ensure_texts};
use crate::error::BackendError;
use crate::http::{build_client, read_json};
use async_trait::async_trait;
use log::debug;
use mnemos_rs_config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Jina embeddings endpoint.
const JINA_EMBEDDING_API_URL: &str = "https://api.jina.ai/v1/embeddings";
/// Output dimensionality of jina-embeddings-v3.
const JINA_DIMENSIONS: usize = 1024;

#[derive(Debug, Serialize)]
struct JinaRequest<'a> {
    model: &'a str,
    input: &'a [String],
    normalized: bool,
    embedding_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct JinaResponse {
    #[serde(default)]
    data: Vec<JinaEmbedding>,
}

#[derive(Debug, Deserialize)]
struct JinaEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Jina embedding provider.
#[derive(Debug, Clone)]
pub struct JinaEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl JinaEmbeddingProvider {
    /// Create a provider against the public Jina endpoint.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: model.into(),
            url: JINA_EMBEDDING_API_URL.to_string(),
        })
    }

    /// Build from the embedding section of the config.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, BackendError> {
        Self::new(
            config.jina_api_key.clone(),
            config.jina_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Point the provider at a different embeddings URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        ensure_texts(texts)?;
        let body = JinaRequest {
            model: &self.model,
            input: texts,
            normalized: true,
            embedding_type: "float",
        };
        debug!("jina embedding request (inputs={})", texts.len());
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response: JinaResponse = read_json(response).await?;
        let items = response
            .data
            .into_iter()
            .map(|item| (item.index, item.embedding))
            .collect();
        collect_ordered(items, texts.len())
    }
}

#[async_trait]
impl EmbeddingProvider for JinaEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<f32>, BackendError> {
        self.request(texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("no embeddings returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        JINA_DIMENSIONS
    }

    fn name(&self) -> &str {
        "jina"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        &self.url
    }

    fn features(&self) -> &'static [&'static str] {
        &["multilingual", "high-performance", "normalized"]
    }
}
