//! Config loading from JSON5 files and the process environment.
//!
//! A file layer (optional) is parsed first, the environment overlay is merged
//! on top, and the merged value is decoded and validated into `MnemosConfig`.

mod merge;
mod validate;

#[cfg(test)]
mod tests;

use crate::{ConfigError, MnemosConfig};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Environment variables and the config path each one overrides.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("UPSTASH_REDIS_URL", "session_store.url"),
    ("UPSTASH_REDIS_TOKEN", "session_store.token"),
    ("UPSTASH_VECTOR_URL", "vector_store.url"),
    ("UPSTASH_VECTOR_TOKEN", "vector_store.token"),
    ("QSTASH_URL", "task_dispatch.url"),
    ("QSTASH_TOKEN", "task_dispatch.token"),
    ("EMBEDDING_PROVIDER", "embedding.provider"),
    ("JINA_API_KEY", "embedding.jina_api_key"),
    ("OPENAI_API_KEY", "embedding.openai_api_key"),
    ("OPENAI_EMBEDDING_MODEL", "embedding.openai_model"),
];

impl MnemosConfig {
    /// Load a single config from a path without validating it.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents without validating it.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load the effective config: optional file, then the process environment,
    /// then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`MnemosConfig::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut value = match path {
            Some(path) => {
                info!("loading config from path: {}", path.display());
                let contents = fs::read_to_string(path)?;
                json5::from_str(&contents)?
            }
            None => Value::Object(serde_json::Map::new()),
        };
        let overlay = env_overlay(lookup);
        merge::merge_json_values(&mut value, &overlay);
        let config: MnemosConfig = serde_json::from_value(value)?;
        config.validate()?;
        info!(
            "config loaded (embedding_provider={}, port={})",
            config.embedding.provider, config.server.port
        );
        Ok(config)
    }
}

/// Build a JSON overlay from the non-empty environment variables in `ENV_KEYS`.
fn env_overlay<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut overlay = Value::Object(serde_json::Map::new());
    for (key, path) in ENV_KEYS {
        let Some(raw) = lookup(key).filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        debug!("applying env override (key={key}, path={path})");
        let value = if *path == "server.port" {
            raw.trim()
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or(Value::String(raw))
        } else if *path == "embedding.provider" {
            Value::String(raw.trim().to_ascii_lowercase())
        } else {
            Value::String(raw)
        };
        merge::set_path(&mut overlay, path, value);
    }
    overlay
}
