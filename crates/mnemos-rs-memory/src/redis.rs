//! Upstash Redis REST implementation of [`KeyValueStore`].
//!
//! Each command is POSTed as a JSON array to the database URL; the reply is
//! `{"result": ...}` or `{"error": "..."}`.

use crate::error::BackendError;
use crate::http::{build_client, join_url, read_json};
use crate::session::KeyValueStore;
use async_trait::async_trait;
use log::debug;
use mnemos_rs_config::SessionStoreConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RedisReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Session key-value store backed by the Upstash Redis REST API.
#[derive(Debug, Clone)]
pub struct UpstashRedis {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl UpstashRedis {
    /// Create a client for the given database URL and token.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            token: token.into(),
        })
    }

    /// Build from the session store section of the config.
    pub fn from_config(config: &SessionStoreConfig) -> Result<Self, BackendError> {
        Self::new(
            config.url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn command(&self, command: Value) -> Result<Value, BackendError> {
        debug!(
            "redis command (name={})",
            command.get(0).and_then(Value::as_str).unwrap_or("?")
        );
        let response = self
            .client
            .post(join_url(&self.url, ""))
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;
        let reply: RedisReply = read_json(response).await?;
        if let Some(error) = reply.error {
            return Err(BackendError::Remote(error));
        }
        Ok(reply.result)
    }
}

#[async_trait]
impl KeyValueStore for UpstashRedis {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError> {
        self.command(json!(["SET", key, value, "EX", ttl_secs]))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            other => Err(BackendError::Malformed(format!(
                "GET returned a non-string value: {other}"
            ))),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, BackendError> {
        let removed = self.command(json!(["DEL", key])).await?;
        Ok(removed.as_u64().unwrap_or(0) > 0)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), BackendError> {
        self.command(json!(["SADD", key, member])).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError> {
        self.command(json!(["EXPIRE", key, ttl_secs])).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        match self.command(json!(["SMEMBERS", key])).await? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(member) => Some(member),
                    _ => None,
                })
                .collect()),
            other => Err(BackendError::Malformed(format!(
                "SMEMBERS returned a non-array value: {other}"
            ))),
        }
    }
}
