use super::{MemoryOrchestrator, require};
use crate::error::{Backend, BackendResultExt, MemoryError};
use crate::model::{Metadata, SessionRecord};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

/// What a session delete removed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionDeletion {
    pub session_id: String,
    /// Whether the caller asked for associated memories to go too.
    pub cascade_requested: bool,
    /// Memories are not indexed by session, so this is always false.
    pub memories_deleted: bool,
}

impl MemoryOrchestrator {
    /// Fetch a session and refresh its activity. A failed refresh is logged
    /// and the record is still returned.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionRecord, MemoryError> {
        require("session_id", session_id)?;
        let mut record = self
            .sessions
            .load(session_id)
            .await
            .during(Backend::SessionStore, "load session")?
            .ok_or_else(|| MemoryError::SessionNotFound(session_id.to_string()))?;

        let previous = record.last_activity;
        record.last_activity = Utc::now();
        if let Err(err) = self.sessions.save(&record).await {
            warn!(
                "failed to refresh session activity (session_id={}, error={})",
                session_id, err
            );
            record.last_activity = previous;
        }
        Ok(record)
    }

    /// Delete a session record. With `cascade` the session must exist; its
    /// memories are left in place since they cannot be located by session.
    pub async fn delete_session(
        &self,
        session_id: &str,
        cascade: bool,
    ) -> Result<SessionDeletion, MemoryError> {
        require("session_id", session_id)?;
        let removed = self
            .sessions
            .delete(session_id)
            .await
            .during(Backend::SessionStore, "delete session")?;
        if !removed {
            return Err(MemoryError::SessionNotFound(session_id.to_string()));
        }
        if cascade {
            info!(
                "session memories kept; no session index in the vector store (session_id={})",
                session_id
            );
        }
        info!("deleted session (session_id={}, cascade={})", session_id, cascade);
        Ok(SessionDeletion {
            session_id: session_id.to_string(),
            cascade_requested: cascade,
            memories_deleted: false,
        })
    }

    /// Merge keys into a session's context and reset its retention window.
    pub async fn set_session_context(
        &self,
        session_id: &str,
        context: Metadata,
    ) -> Result<SessionRecord, MemoryError> {
        require("session_id", session_id)?;
        let keys = context.len();
        let record = self
            .sessions
            .merge_context(session_id, context, Utc::now())
            .await
            .during(Backend::SessionStore, "update session context")?
            .ok_or_else(|| MemoryError::SessionNotFound(session_id.to_string()))?;
        info!("updated session context (session_id={}, keys={})", session_id, keys);
        Ok(record)
    }

    /// Session ids ever registered for an owner. Entries may point at
    /// sessions that have since expired or been deleted.
    pub async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<String>, MemoryError> {
        require("user_id", user_id)?;
        self.sessions
            .owner_sessions(user_id)
            .await
            .during(Backend::SessionStore, "list sessions")
    }
}
