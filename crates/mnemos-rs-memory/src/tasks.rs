//! Delayed-task dispatcher contract.

use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;

/// One-shot delivery of `body` to `destination` after `delay_secs`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub destination: String,
    pub body: Value,
    pub delay_secs: u64,
    pub retries: u32,
}

/// Recurring delivery of `body` to `destination` on a cron schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub destination: String,
    pub body: Value,
    pub cron: String,
    pub retries: u32,
}

#[async_trait]
/// Hosted dispatcher that calls back into the service later. Delivery
/// retries are the dispatcher's responsibility.
pub trait TaskDispatcher: Send + Sync {
    /// Publish a delayed message, returning the dispatcher's message id.
    async fn publish(&self, request: PublishRequest) -> Result<String, BackendError>;
    /// Register a recurring schedule, returning its id.
    async fn schedule(&self, request: ScheduleRequest) -> Result<String, BackendError>;
    /// Remove a schedule.
    async fn cancel(&self, schedule_id: &str) -> Result<(), BackendError>;
    /// List registered schedules as reported by the dispatcher.
    async fn list_schedules(&self) -> Result<Vec<Value>, BackendError>;
}
