//! Upstash Vector REST implementation of [`VectorStore`].

use super::{VectorMatch, VectorPage, VectorQuery, VectorRecord, VectorStats, VectorStore};
use crate::error::BackendError;
use crate::http::{build_client, join_url, read_json};
use crate::model::Metadata;
use async_trait::async_trait;
use log::debug;
use mnemos_rs_config::VectorStoreConfig;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// Every reply is `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    id: &'a str,
    vector: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteReply {
    #[serde(default)]
    deleted: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeReply {
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    vectors: Vec<VectorRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoReply {
    #[serde(default)]
    vector_count: u64,
    #[serde(default)]
    dimension: usize,
}

/// Vector store backed by an Upstash Vector index.
#[derive(Debug, Clone)]
pub struct UpstashVector {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl UpstashVector {
    /// Create a client for the given index URL and token.
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

    /// Build from the vector store section of the config.
    pub fn from_config(config: &VectorStoreConfig) -> Result<Self, BackendError> {
        Self::new(
            config.url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BackendError> {
        let response = self
            .client
            .post(join_url(&self.url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        unwrap_envelope(read_json(response).await?)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<Option<T>, BackendError> {
    if let Some(error) = envelope.error {
        return Err(BackendError::Remote(error));
    }
    Ok(envelope.result)
}

#[async_trait]
impl VectorStore for UpstashVector {
    async fn upsert(&self, record: VectorRecord) -> Result<(), BackendError> {
        if record.vector.is_empty() {
            return Err(BackendError::InvalidInput(format!(
                "vector {} has no components",
                record.id
            )));
        }
        let body = UpsertBody {
            id: &record.id,
            vector: &record.vector,
            metadata: &record.metadata,
        };
        let _: Option<Value> = self.post("upsert", &body).await?;
        debug!(
            "upserted vector (id={}, dims={})",
            record.id,
            record.vector.len()
        );
        Ok(())
    }

    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>, BackendError> {
        let body = QueryBody {
            vector: &query.vector,
            top_k: query.top_k,
            include_metadata: true,
            filter: query.filter.as_ref().map(|filter| filter.to_expression()),
        };
        let matches: Option<Vec<VectorMatch>> = self.post("query", &body).await?;
        Ok(matches.unwrap_or_default())
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        let reply: Option<DeleteReply> = self.post("delete", &[id]).await?;
        Ok(reply.map(|reply| reply.deleted > 0).unwrap_or(false))
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorRecord>, BackendError> {
        let body = json!({
            "ids": [id],
            "includeMetadata": true,
            "includeVectors": true,
        });
        let records: Option<Vec<Option<VectorRecord>>> = self.post("fetch", &body).await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .find(|record| record.id == id))
    }

    async fn range(&self, cursor: &str, limit: usize) -> Result<VectorPage, BackendError> {
        let body = json!({
            "cursor": cursor,
            "limit": limit,
            "includeMetadata": true,
        });
        let reply: Option<RangeReply> = self.post("range", &body).await?;
        let reply = reply.ok_or_else(|| BackendError::Malformed("range without result".into()))?;
        Ok(VectorPage {
            records: reply.vectors,
            next_cursor: reply.next_cursor.filter(|next| !next.is_empty()),
        })
    }

    async fn stats(&self) -> Result<VectorStats, BackendError> {
        let response = self
            .client
            .get(join_url(&self.url, "info"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let raw = unwrap_envelope::<Value>(read_json(response).await?)?
            .ok_or_else(|| BackendError::Malformed("info without result".into()))?;
        let info: InfoReply = serde_json::from_value(raw.clone())?;
        Ok(VectorStats {
            vector_count: info.vector_count,
            dimension: info.dimension,
            raw,
        })
    }
}
