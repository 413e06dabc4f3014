//! Configuration schema for Mnemos.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root config for the memory service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MnemosConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub task_dispatch: TaskDispatchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Hosted key-value store holding session transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionStoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,
    /// Retention window applied on every session write.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: default_session_timeout_secs(),
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_session_timeout_secs() -> u64 {
    10
}

/// 24 hours.
fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// Hosted vector database holding long-term memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

fn default_remote_timeout_secs() -> u64 {
    30
}

/// Hosted delayed-task dispatcher used for cleanup callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDispatchConfig {
    #[serde(default = "default_dispatch_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
    /// Delivery retries requested from the dispatcher.
    #[serde(default = "default_dispatch_retries")]
    pub retries: u32,
    /// Cron expression for the recurring expiration sweep.
    #[serde(default = "default_cleanup_cron")]
    pub cleanup_cron: String,
}

impl Default for TaskDispatchConfig {
    fn default() -> Self {
        Self {
            url: default_dispatch_url(),
            token: String::new(),
            timeout_secs: default_remote_timeout_secs(),
            retries: default_dispatch_retries(),
            cleanup_cron: default_cleanup_cron(),
        }
    }
}

fn default_dispatch_url() -> String {
    "https://qstash.upstash.io".to_string()
}

fn default_dispatch_retries() -> u32 {
    3
}

/// Daily at 02:00.
fn default_cleanup_cron() -> String {
    "0 2 * * *".to_string()
}

/// Supported embedding backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Jina,
    #[serde(rename = "openai")]
    OpenAi,
}

impl EmbeddingProviderKind {
    /// Return the provider name as used in config and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProviderKind::Jina => "jina",
            EmbeddingProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jina" => Ok(EmbeddingProviderKind::Jina),
            "openai" => Ok(EmbeddingProviderKind::OpenAi),
            other => Err(format!("unknown embedding provider `{other}`")),
        }
    }
}

/// Embedding provider selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default)]
    pub jina_api_key: String,
    #[serde(default = "default_jina_model")]
    pub jina_model: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            jina_api_key: String::new(),
            jina_model: default_jina_model(),
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

fn default_jina_model() -> String {
    "jina-embeddings-v3".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Tuning knobs for memory writes, queries and sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Lifetime of a stored memory entry.
    #[serde(default = "default_memory_ttl_secs")]
    pub memory_ttl_secs: u64,
    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,
    #[serde(default = "default_min_score")]
    pub default_min_score: f32,
    /// Page size used when walking the whole vector store.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            memory_ttl_secs: default_memory_ttl_secs(),
            default_query_limit: default_query_limit(),
            default_min_score: default_min_score(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

/// 30 days.
fn default_memory_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_query_limit() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.5
}

fn default_scan_page_size() -> usize {
    1000
}
