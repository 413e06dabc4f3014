//! HTTP surface for the Mnemos memory service.
//!
//! Every route calls one [`MemoryOrchestrator`] operation and maps its
//! outcome to a status code: validation errors are 400, missing sessions or
//! memories 404, backend failures 502.

mod error;
mod routes;

pub use error::ApiError;

use axum::Router;
use axum::routing::{delete, get, post, put};
use mnemos_rs_memory::MemoryOrchestrator;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    pub orchestrator: MemoryOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: MemoryOrchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/memory/save", post(routes::save_memory))
        .route("/memory/query", post(routes::query_memory))
        .route("/memory/stats", get(routes::memory_stats))
        .route("/memory/embedding-info", get(routes::embedding_info))
        .route("/memory/embedding-check", get(routes::embedding_check))
        .route("/memory/{id}", delete(routes::delete_memory))
        .route(
            "/session/{id}",
            get(routes::get_session).delete(routes::delete_session),
        )
        .route("/session/{id}/context", put(routes::set_session_context))
        .route("/user/{id}/sessions", get(routes::user_sessions))
        .route("/user/{id}/memories", delete(routes::cleanup_user_memories))
        .route("/user/{id}/memories/recent", get(routes::recent_memories))
        .route("/user/{id}/memories/search", get(routes::search_memories))
        .route("/webhook/cleanup", post(routes::cleanup_webhook))
        .route("/webhook/schedule-cleanup", post(routes::schedule_cleanup))
        .route(
            "/webhook/schedule-user-cleanup",
            post(routes::schedule_user_cleanup),
        )
        .route(
            "/webhook/schedule-session-cleanup",
            post(routes::schedule_session_cleanup),
        )
        .route("/webhook/schedules", get(routes::list_schedules))
        .route("/webhook/schedules/{id}", delete(routes::cancel_schedule))
        .with_state(state)
}
