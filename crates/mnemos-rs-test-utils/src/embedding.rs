use async_trait::async_trait;
use mnemos_rs_memory::{BackendError, EmbeddingProvider};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic bag-of-words embedder.
///
/// Component 0 is a constant bias so any two texts score above zero; every
/// other component counts tokens hashed into it. Output is unit length.
#[derive(Debug)]
pub struct HashEmbedder {
    name: String,
    dimensions: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.max(2),
            calls: AtomicUsize::new(0),
        }
    }

    /// 1024 dimensions, named like the Jina provider.
    pub fn jina_like() -> Self {
        Self::new("jina", 1024)
    }

    /// 1536 dimensions, named like the OpenAI provider.
    pub fn openai_like() -> Self {
        Self::new("openai", 1536)
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        vector[0] = 1.0;
        let buckets = (self.dimensions - 1) as u64;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) % buckets;
            vector[bucket as usize + 1] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        vector.iter_mut().for_each(|v| *v /= norm);
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<f32>, BackendError> {
        let first = texts
            .first()
            .ok_or_else(|| BackendError::InvalidInput("no texts to embed".to_string()))?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(first))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Embedder whose every call fails with a 503.
#[derive(Debug)]
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_many(&self, _texts: &[String]) -> Result<Vec<f32>, BackendError> {
        Err(BackendError::Status {
            status: 503,
            body: "embedding unavailable".to_string(),
        })
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        Err(BackendError::Status {
            status: 503,
            body: "embedding unavailable".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "failing"
    }
}
