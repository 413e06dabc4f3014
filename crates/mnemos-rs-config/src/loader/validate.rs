//! Semantic validation for a decoded config.

use crate::{ConfigError, EmbeddingProviderKind, MnemosConfig};

impl MnemosConfig {
    /// Check that every hosted backend the service depends on is reachable
    /// in principle: URLs and credentials present, provider key set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("session_store.url", &self.session_store.url)?;
        require("session_store.token", &self.session_store.token)?;
        require("vector_store.url", &self.vector_store.url)?;
        require("vector_store.token", &self.vector_store.token)?;
        require("task_dispatch.url", &self.task_dispatch.url)?;

        match self.embedding.provider {
            EmbeddingProviderKind::Jina => {
                require("embedding.jina_api_key", &self.embedding.jina_api_key)?
            }
            EmbeddingProviderKind::OpenAi => {
                require("embedding.openai_api_key", &self.embedding.openai_api_key)?
            }
        }

        if self.session_store.ttl_secs == 0 {
            return Err(invalid("session_store.ttl_secs", "must be greater than zero"));
        }
        if self.memory.memory_ttl_secs == 0 {
            return Err(invalid("memory.memory_ttl_secs", "must be greater than zero"));
        }
        if self.memory.scan_page_size == 0 {
            return Err(invalid("memory.scan_page_size", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.memory.default_min_score) {
            return Err(invalid(
                "memory.default_min_score",
                "must be between 0.0 and 1.0",
            ));
        }
        if self.task_dispatch.cleanup_cron.split_whitespace().count() != 5 {
            return Err(invalid(
                "task_dispatch.cleanup_cron",
                "expected a five-field cron expression",
            ));
        }
        Ok(())
    }
}

fn require(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "is required"));
    }
    Ok(())
}

fn invalid(path: &str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_string(),
        message: message.to_string(),
    }
}
