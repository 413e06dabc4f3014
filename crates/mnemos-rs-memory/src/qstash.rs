//! QStash implementation of [`TaskDispatcher`].

use crate::error::BackendError;
use crate::http::{build_client, join_url, read_body, read_json};
use crate::tasks::{PublishRequest, ScheduleRequest, TaskDispatcher};
use async_trait::async_trait;
use log::{debug, info};
use mnemos_rs_config::TaskDispatchConfig;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DELAY_HEADER: &str = "Upstash-Delay";
const RETRIES_HEADER: &str = "Upstash-Retries";
const CRON_HEADER: &str = "Upstash-Cron";
/// Header carrying the dispatcher's signature on callback deliveries.
pub const SIGNATURE_HEADER: &str = "upstash-signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishReply {
    message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleReply {
    schedule_id: String,
}

/// Task dispatcher backed by the QStash v2 REST API.
#[derive(Debug, Clone)]
pub struct QStash {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl QStash {
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

    pub fn from_config(config: &TaskDispatchConfig) -> Result<Self, BackendError> {
        Self::new(
            config.url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// The destination URL is appended verbatim to the endpoint path.
    fn endpoint(&self, path: &str, destination: &str) -> Result<String, BackendError> {
        if !destination.starts_with("http://") && !destination.starts_with("https://") {
            return Err(BackendError::InvalidInput(format!(
                "destination must be an absolute http(s) URL, got `{destination}`"
            )));
        }
        Ok(format!("{}/{destination}", join_url(&self.url, path)))
    }
}

#[async_trait]
impl TaskDispatcher for QStash {
    async fn publish(&self, request: PublishRequest) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("v2/publish", &request.destination)?)
            .bearer_auth(&self.token)
            .header(DELAY_HEADER, format!("{}s", request.delay_secs))
            .header(RETRIES_HEADER, request.retries.to_string())
            .json(&request.body)
            .send()
            .await?;
        let reply: PublishReply = read_json(response).await?;
        info!(
            "published task (message_id={}, delay_secs={})",
            reply.message_id, request.delay_secs
        );
        Ok(reply.message_id)
    }

    async fn schedule(&self, request: ScheduleRequest) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("v2/schedules", &request.destination)?)
            .bearer_auth(&self.token)
            .header(CRON_HEADER, request.cron.as_str())
            .header(RETRIES_HEADER, request.retries.to_string())
            .json(&request.body)
            .send()
            .await?;
        let reply: ScheduleReply = read_json(response).await?;
        info!(
            "registered schedule (schedule_id={}, cron={})",
            reply.schedule_id, request.cron
        );
        Ok(reply.schedule_id)
    }

    async fn cancel(&self, schedule_id: &str) -> Result<(), BackendError> {
        if schedule_id.trim().is_empty() {
            return Err(BackendError::InvalidInput("schedule id is empty".into()));
        }
        let response = self
            .client
            .delete(join_url(&self.url, &format!("v2/schedules/{schedule_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_body(response).await?;
        debug!("cancelled schedule (schedule_id={schedule_id})");
        Ok(())
    }

    async fn list_schedules(&self) -> Result<Vec<Value>, BackendError> {
        let response = self
            .client
            .get(join_url(&self.url, "v2/schedules"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_json(response).await
    }
}
