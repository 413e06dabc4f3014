//! Error types for memory orchestration and the hosted backends.

use std::fmt;

/// Hosted collaborator an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Key-value store holding session transcripts.
    SessionStore,
    /// Vector database holding long-term memories.
    VectorStore,
    /// Embedding generation API.
    Embedding,
    /// Delayed-task dispatcher.
    TaskDispatch,
}

impl Backend {
    /// Return the backend name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::SessionStore => "session store",
            Backend::VectorStore => "vector store",
            Backend::Embedding => "embedding provider",
            Backend::TaskDispatch => "task dispatcher",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by a single adapter call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network failure, timeout or client construction error.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-2xx status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered 2xx but reported an error payload.
    #[error("remote error: {0}")]
    Remote(String),
    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The adapter refused the input before calling out.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors returned by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Missing or malformed caller input; no backend was contacted.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Session id is unknown to the session store.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// Memory id is unknown, or not owned by the caller.
    #[error("memory not found: {0}")]
    MemoryNotFound(String),
    /// A backend call failed during the named step.
    #[error("failed to {operation} ({backend}): {source}")]
    Upstream {
        backend: Backend,
        operation: &'static str,
        #[source]
        source: BackendError,
    },
}

impl MemoryError {
    /// Whether the error reports a missing session or memory.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MemoryError::SessionNotFound(_) | MemoryError::MemoryNotFound(_)
        )
    }
}

/// Attach the failing backend and step to a backend result.
pub trait BackendResultExt<T> {
    /// Wrap an error as [`MemoryError::Upstream`].
    fn during(self, backend: Backend, operation: &'static str) -> Result<T, MemoryError>;
}

impl<T> BackendResultExt<T> for Result<T, BackendError> {
    fn during(self, backend: Backend, operation: &'static str) -> Result<T, MemoryError> {
        self.map_err(|source| MemoryError::Upstream {
            backend,
            operation,
            source,
        })
    }
}
