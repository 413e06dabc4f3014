//! OpenAI embeddings (`text-embedding-3-small` by default).
//!
//! A single text on the `embed_many` path is sent as a scalar `input`;
//! anything else is sent as an array.

use super::{EmbeddingProvider, collect_ordered, ensure_texts};
use crate::error::BackendError;
use crate::http::{build_client, read_json};
use async_trait::async_trait;
use log::debug;
use mnemos_rs_config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI embeddings endpoint.
const OPENAI_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";

/// Output dimensionality for a model name.
pub(crate) fn openai_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Many(&'a [String]),
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    input: EmbeddingInput<'a>,
    model: &'a str,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider against the public OpenAI endpoint.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let model = model.into();
        let model = if model.trim().is_empty() {
            "text-embedding-3-small".to_string()
        } else {
            model
        };
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            dimensions: openai_dimensions(&model),
            model,
            url: OPENAI_EMBEDDING_API_URL.to_string(),
        })
    }

    /// Build from the embedding section of the config.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, BackendError> {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Point the provider at a different embeddings URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn request(
        &self,
        input: EmbeddingInput<'_>,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, BackendError> {
        let body = OpenAiRequest {
            input,
            model: &self.model,
            encoding_format: "float",
        };
        debug!(
            "openai embedding request (model={}, inputs={})",
            self.model, expected
        );
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response: OpenAiResponse = read_json(response).await?;
        let items = response
            .data
            .into_iter()
            .map(|item| (item.index, item.embedding))
            .collect();
        collect_ordered(items, expected)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<f32>, BackendError> {
        ensure_texts(texts)?;
        let input = match texts {
            [single] => EmbeddingInput::Single(single),
            many => EmbeddingInput::Many(many),
        };
        self.request(input, texts.len())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("no embeddings returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        ensure_texts(texts)?;
        self.request(EmbeddingInput::Many(texts), texts.len()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        &self.url
    }

    fn features(&self) -> &'static [&'static str] {
        &["high-quality", "widely-supported", "english-optimized"]
    }
}

#[cfg(test)]
mod tests {
    use super::{EmbeddingInput, openai_dimensions};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn dimensions_follow_model() {
        assert_eq!(openai_dimensions("text-embedding-3-small"), 1536);
        assert_eq!(openai_dimensions("text-embedding-ada-002"), 1536);
        assert_eq!(openai_dimensions("text-embedding-3-large"), 3072);
        assert_eq!(openai_dimensions("something-else"), 1536);
    }

    #[test]
    fn input_serializes_as_scalar_or_array() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            serde_json::to_value(EmbeddingInput::Single("a")).expect("json"),
            json!("a")
        );
        assert_eq!(
            serde_json::to_value(EmbeddingInput::Many(&texts)).expect("json"),
            json!(["a", "b"])
        );
    }
}
