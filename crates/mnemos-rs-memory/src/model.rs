//! Session, message and memory models shared by the adapters and orchestrator.
//!
//! Every type here serializes to a flat JSON object; new fields must be
//! additive (`#[serde(default)]`) so records written by older builds still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Open-ended key/value map used for session context and memory metadata.
pub type Metadata = Map<String, Value>;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!(
                "role must be `user` or `assistant`, got `{other}`"
            )),
        }
    }
}

/// Message stored in a session transcript. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message identifier, shared with the memory entry it produced.
    pub id: String,
    /// Role that produced the message.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// One conversation held in the session store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Owner identifier.
    pub user_id: String,
    /// Session identifier.
    pub session_id: String,
    /// Transcript in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Free-form context set by callers.
    #[serde(default)]
    pub context: Metadata,
    /// Last time the session was written or read.
    pub last_activity: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create an empty session for an owner.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            messages: Vec::new(),
            context: Metadata::new(),
            last_activity: now,
            created_at: now,
        }
    }

    /// Append a message and bump the activity timestamp.
    pub fn push_message(&mut self, message: Message) {
        self.last_activity = self.last_activity.max(message.timestamp);
        self.messages.push(message);
    }

    /// Merge caller context: given keys overwrite, other keys stay untouched.
    pub fn merge_context(&mut self, context: Metadata, now: DateTime<Utc>) {
        for (key, value) in context {
            self.context.insert(key, value);
        }
        self.last_activity = now;
    }
}

/// One unit of long-term semantic memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    /// Entry identifier; equals the originating message id.
    pub id: String,
    /// Owner identifier.
    pub user_id: String,
    /// Raw text content.
    pub content: String,
    /// Embedding produced by the active provider.
    pub embedding: Vec<f32>,
    /// Extra metadata; always carries `session_id` and `role`.
    #[serde(default)]
    pub metadata: Metadata,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Lifetime in seconds.
    pub ttl: u64,
}

/// A single memory returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryResult {
    /// Entry identifier (the vector store's native id).
    pub id: String,
    /// Stored text content.
    pub content: String,
    /// Similarity score reported by the vector store.
    pub score: f32,
    /// Stored metadata.
    pub metadata: Metadata,
    /// Creation timestamp recovered from metadata.
    pub timestamp: DateTime<Utc>,
}

/// Query response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub results: Vec<MemoryResult>,
    pub total: usize,
}

impl QueryResponse {
    pub fn new(results: Vec<MemoryResult>) -> Self {
        let total = results.len();
        Self { results, total }
    }
}

/// Input for saving a message and its memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMemoryRequest {
    pub user_id: String,
    pub session_id: String,
    pub content: String,
    pub role: String,
}

/// Input for a similarity query. Non-positive limit and score fall back to
/// configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMemoryRequest {
    pub user_id: String,
    pub query: String,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub min_score: f32,
}

/// Kind of deferred cleanup delivered by the task dispatcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CleanupKind {
    /// Delete every memory past its ttl.
    #[serde(rename = "expire-all", alias = "cleanup_expired_memories")]
    ExpireAll,
    /// Delete every memory and listed session of one owner.
    #[serde(rename = "cleanup-owner", alias = "cleanup_user_memories")]
    CleanupOwner,
    /// Delete one session record.
    #[serde(rename = "cleanup-session", alias = "cleanup_session")]
    CleanupSession,
}

impl CleanupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupKind::ExpireAll => "expire-all",
            CleanupKind::CleanupOwner => "cleanup-owner",
            CleanupKind::CleanupSession => "cleanup-session",
        }
    }
}

impl fmt::Display for CleanupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to the dispatcher and delivered back to the callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupTask {
    pub task_type: CleanupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ttl: u64,
}

impl CleanupTask {
    /// Recurring sweep of expired memories.
    pub fn expire_all(now: DateTime<Utc>) -> Self {
        Self {
            task_type: CleanupKind::ExpireAll,
            user_id: None,
            session_id: None,
            timestamp: now,
            ttl: 0,
        }
    }

    /// One-off cleanup of everything an owner has stored.
    pub fn cleanup_owner(user_id: impl Into<String>, delay_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            task_type: CleanupKind::CleanupOwner,
            user_id: Some(user_id.into()),
            session_id: None,
            timestamp: now,
            ttl: delay_secs,
        }
    }

    /// One-off deletion of a session record.
    pub fn cleanup_session(
        session_id: impl Into<String>,
        delay_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_type: CleanupKind::CleanupSession,
            user_id: None,
            session_id: Some(session_id.into()),
            timestamp: now,
            ttl: delay_secs,
        }
    }
}
