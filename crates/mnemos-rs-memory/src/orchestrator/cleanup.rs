use super::{MemoryOrchestrator, require};
use crate::error::{Backend, BackendError, BackendResultExt, MemoryError};
use crate::model::{CleanupKind, CleanupTask};
use crate::tasks::{PublishRequest, ScheduleRequest};
use crate::vector::{VectorQuery, VectorScan, shape};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Delay applied to an owner cleanup scheduled without one.
pub const DEFAULT_OWNER_CLEANUP_DELAY_SECS: u64 = 3600;

/// Outcome of the expiration sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub pages: usize,
    pub scanned: usize,
    pub expired: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Outcome of removing everything an owner stored.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct OwnerCleanupReport {
    pub user_id: String,
    pub memories_deleted: usize,
    pub sessions_deleted: usize,
    pub sessions_failed: usize,
}

/// Outcome of one delivered cleanup task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "task_type", rename_all = "kebab-case")]
pub enum CleanupReport {
    ExpireAll(SweepReport),
    CleanupOwner(OwnerCleanupReport),
    CleanupSession { session_id: String, deleted: bool },
}

impl MemoryOrchestrator {
    /// Walk the whole vector store and delete entries past `timestamp + ttl`.
    /// Per-entry delete failures are logged and counted.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, MemoryError> {
        let mut report = SweepReport::default();
        let mut expired = Vec::new();
        let mut scan = VectorScan::new(self.vectors.as_ref(), self.settings.scan_page_size);
        while let Some(page) = scan
            .next_page()
            .await
            .during(Backend::VectorStore, "scan memories")?
        {
            report.scanned += page.len();
            expired.extend(
                page.into_iter()
                    .filter(|record| shape::is_expired(&record.metadata, now))
                    .map(|record| record.id),
            );
        }
        report.pages = scan.pages();
        report.expired = expired.len();

        for id in expired {
            match self.vectors.delete(&id).await {
                Ok(_) => report.deleted += 1,
                Err(err) => {
                    warn!("failed to delete expired memory (memory_id={id}, error={err})");
                    report.failed += 1;
                }
            }
        }
        info!(
            "expired memories swept (pages={}, scanned={}, deleted={}, failed={})",
            report.pages, report.scanned, report.deleted, report.failed
        );
        Ok(report)
    }

    /// Delete every memory and listed session of one owner.
    pub async fn cleanup_owner(&self, user_id: &str) -> Result<OwnerCleanupReport, MemoryError> {
        require("user_id", user_id)?;
        let mut report = OwnerCleanupReport {
            user_id: user_id.to_string(),
            ..OwnerCleanupReport::default()
        };

        let probe = self.owner_probe().await;
        let mut deleted = HashSet::new();
        loop {
            let matches = self
                .vectors
                .query(&VectorQuery {
                    vector: probe.clone(),
                    top_k: self.settings.scan_page_size.max(1),
                    filter: Some(shape::owner_filter(user_id)),
                })
                .await
                .during(Backend::VectorStore, "query owner memories")?;
            let fresh: Vec<String> = matches
                .into_iter()
                .map(|matched| matched.id)
                .filter(|id| !deleted.contains(id))
                .collect();
            if fresh.is_empty() {
                break;
            }
            debug!(
                "owner cleanup round (owner_id={}, ids={})",
                user_id,
                fresh.len()
            );
            for id in fresh {
                self.vectors
                    .delete(&id)
                    .await
                    .during(Backend::VectorStore, "delete memory")?;
                deleted.insert(id);
            }
        }
        report.memories_deleted = deleted.len();

        let session_ids = self
            .sessions
            .owner_sessions(user_id)
            .await
            .during(Backend::SessionStore, "list sessions")?;
        for session_id in session_ids {
            match self.sessions.delete(&session_id).await {
                Ok(_) => report.sessions_deleted += 1,
                Err(err) => {
                    warn!(
                        "failed to delete owner session (owner_id={}, session_id={}, error={})",
                        user_id, session_id, err
                    );
                    report.sessions_failed += 1;
                }
            }
        }
        if report.sessions_failed == 0 {
            self.sessions
                .forget_owner(user_id)
                .await
                .during(Backend::SessionStore, "delete session index")?;
        }
        info!(
            "owner cleaned up (owner_id={}, memories={}, sessions={}, sessions_failed={})",
            user_id, report.memories_deleted, report.sessions_deleted, report.sessions_failed
        );
        Ok(report)
    }

    /// Delete one session record; vector entries are untouched.
    pub async fn cleanup_session(&self, session_id: &str) -> Result<bool, MemoryError> {
        require("session_id", session_id)?;
        let deleted = self
            .sessions
            .delete(session_id)
            .await
            .during(Backend::SessionStore, "delete session")?;
        info!("session cleanup (session_id={session_id}, deleted={deleted})");
        Ok(deleted)
    }

    /// Run a cleanup task delivered by the dispatcher.
    pub async fn handle_cleanup_task(
        &self,
        task: CleanupTask,
    ) -> Result<CleanupReport, MemoryError> {
        debug!("handling cleanup task (task_type={})", task.task_type);
        match task.task_type {
            CleanupKind::ExpireAll => Ok(CleanupReport::ExpireAll(
                self.cleanup_expired(Utc::now()).await?,
            )),
            CleanupKind::CleanupOwner => {
                let user_id = required_id(task.user_id, "user_id", task.task_type)?;
                Ok(CleanupReport::CleanupOwner(self.cleanup_owner(&user_id).await?))
            }
            CleanupKind::CleanupSession => {
                // Older dispatch payloads carry the session id in `user_id`.
                let session_id = required_id(
                    task.session_id.or(task.user_id),
                    "session_id",
                    task.task_type,
                )?;
                let deleted = self.cleanup_session(&session_id).await?;
                Ok(CleanupReport::CleanupSession {
                    session_id,
                    deleted,
                })
            }
        }
    }

    /// Register the recurring expiration sweep. Returns the schedule id.
    pub async fn schedule_cleanup(&self, callback_url: &str) -> Result<String, MemoryError> {
        require("callback_url", callback_url)?;
        let body = task_body(&CleanupTask::expire_all(Utc::now()))?;
        self.dispatcher
            .schedule(ScheduleRequest {
                destination: callback_url.to_string(),
                body,
                cron: self.settings.cleanup_cron.clone(),
                retries: self.settings.dispatch_retries,
            })
            .await
            .during(Backend::TaskDispatch, "schedule cleanup")
    }

    /// Publish a delayed owner cleanup; a zero delay means one hour.
    /// Returns the dispatcher message id.
    pub async fn schedule_owner_cleanup(
        &self,
        callback_url: &str,
        user_id: &str,
        delay_secs: u64,
    ) -> Result<String, MemoryError> {
        require("callback_url", callback_url)?;
        require("user_id", user_id)?;
        let delay_secs = if delay_secs == 0 {
            DEFAULT_OWNER_CLEANUP_DELAY_SECS
        } else {
            delay_secs
        };
        let task = CleanupTask::cleanup_owner(user_id, delay_secs, Utc::now());
        self.publish_task(callback_url, &task, delay_secs).await
    }

    /// Publish a delayed session cleanup.
    pub async fn schedule_session_cleanup(
        &self,
        callback_url: &str,
        session_id: &str,
        delay_secs: u64,
    ) -> Result<String, MemoryError> {
        require("callback_url", callback_url)?;
        require("session_id", session_id)?;
        let task = CleanupTask::cleanup_session(session_id, delay_secs, Utc::now());
        self.publish_task(callback_url, &task, delay_secs).await
    }

    pub async fn cancel_scheduled_cleanup(&self, schedule_id: &str) -> Result<(), MemoryError> {
        require("schedule_id", schedule_id)?;
        self.dispatcher
            .cancel(schedule_id)
            .await
            .during(Backend::TaskDispatch, "cancel schedule")
    }

    pub async fn list_schedules(&self) -> Result<Vec<Value>, MemoryError> {
        self.dispatcher
            .list_schedules()
            .await
            .during(Backend::TaskDispatch, "list schedules")
    }

    async fn publish_task(
        &self,
        callback_url: &str,
        task: &CleanupTask,
        delay_secs: u64,
    ) -> Result<String, MemoryError> {
        let body = task_body(task)?;
        self.dispatcher
            .publish(PublishRequest {
                destination: callback_url.to_string(),
                body,
                delay_secs,
                retries: self.settings.dispatch_retries,
            })
            .await
            .during(Backend::TaskDispatch, "publish cleanup task")
    }

    /// Uniform non-zero vector sized to the store, or to the active
    /// provider when the store cannot say.
    async fn owner_probe(&self) -> Vec<f32> {
        let dimensions = match self.vectors.stats().await {
            Ok(stats) if stats.dimension > 0 => stats.dimension,
            Ok(_) => self.embedder().dimensions(),
            Err(err) => {
                warn!("store statistics unavailable for owner cleanup (error={err})");
                self.embedder().dimensions()
            }
        };
        let dimensions = dimensions.max(1);
        vec![1.0 / (dimensions as f32).sqrt(); dimensions]
    }
}

fn required_id(
    value: Option<String>,
    field: &str,
    kind: CleanupKind,
) -> Result<String, MemoryError> {
    match value {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(MemoryError::Validation(format!(
            "{field} is required for {kind} tasks"
        ))),
    }
}

fn task_body(task: &CleanupTask) -> Result<Value, MemoryError> {
    serde_json::to_value(task)
        .map_err(BackendError::from)
        .during(Backend::TaskDispatch, "encode cleanup task")
}
