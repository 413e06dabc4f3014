use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;
use log::{debug, info};
use mnemos_rs_memory::qstash::SIGNATURE_HEADER;
use mnemos_rs_memory::{
    CleanupTask, Metadata, QueryMemoryRequest, SaveMemoryRequest, SaveOutcome,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

type Shared = State<Arc<AppState>>;
type ApiResult = Result<Json<Value>, ApiError>;

fn to_json<T: serde::Serialize>(value: T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "mnemos",
        "timestamp": Utc::now(),
    }))
}

pub(crate) async fn save_memory(
    State(state): Shared,
    payload: Result<Json<SaveMemoryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let outcome = state.orchestrator.save_memory(request).await;
    let status = outcome.status();
    match outcome {
        SaveOutcome::Committed {
            memory_id,
            session_id,
        } => Ok(Json(json!({
            "status": status,
            "memory_id": memory_id,
            "session_id": session_id,
        }))),
        SaveOutcome::SessionOnly {
            memory_id,
            session_id,
            error,
        } => Ok(Json(json!({
            "status": status,
            "memory_id": memory_id,
            "session_id": session_id,
            "error": error.to_string(),
        }))),
        SaveOutcome::Failed { error } => Err(error.into()),
    }
}

pub(crate) async fn query_memory(
    State(state): Shared,
    payload: Result<Json<QueryMemoryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    to_json(state.orchestrator.query_memory(request).await?)
}

pub(crate) async fn memory_stats(State(state): Shared) -> ApiResult {
    to_json(state.orchestrator.memory_stats().await?)
}

pub(crate) async fn embedding_info(State(state): Shared) -> ApiResult {
    to_json(state.orchestrator.embedding_info())
}

pub(crate) async fn embedding_check(State(state): Shared) -> ApiResult {
    to_json(state.orchestrator.check_embedding_dimensions().await?)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerQuery {
    #[serde(default)]
    user_id: String,
}

pub(crate) async fn delete_memory(
    State(state): Shared,
    Path(memory_id): Path<String>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    state
        .orchestrator
        .delete_memory(&memory_id, &query.user_id)
        .await?;
    Ok(Json(json!({
        "message": "memory deleted",
        "memory_id": memory_id,
        "user_id": query.user_id,
    })))
}

pub(crate) async fn get_session(State(state): Shared, Path(session_id): Path<String>) -> ApiResult {
    to_json(state.orchestrator.get_session(&session_id).await?)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteSessionQuery {
    #[serde(default)]
    delete_memories: bool,
}

pub(crate) async fn delete_session(
    State(state): Shared,
    Path(session_id): Path<String>,
    query: Result<Query<DeleteSessionQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    to_json(
        state
            .orchestrator
            .delete_session(&session_id, query.delete_memories)
            .await?,
    )
}

pub(crate) async fn set_session_context(
    State(state): Shared,
    Path(session_id): Path<String>,
    payload: Result<Json<Metadata>, JsonRejection>,
) -> ApiResult {
    let Json(context) = payload?;
    to_json(
        state
            .orchestrator
            .set_session_context(&session_id, context)
            .await?,
    )
}

pub(crate) async fn user_sessions(State(state): Shared, Path(user_id): Path<String>) -> ApiResult {
    let sessions = state.orchestrator.list_user_sessions(&user_id).await?;
    Ok(Json(json!({
        "user_id": user_id,
        "count": sessions.len(),
        "sessions": sessions,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    q: String,
}

pub(crate) async fn recent_memories(
    State(state): Shared,
    Path(user_id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    to_json(
        state
            .orchestrator
            .recent_memories(&user_id, query.limit)
            .await?,
    )
}

pub(crate) async fn search_memories(
    State(state): Shared,
    Path(user_id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    to_json(
        state
            .orchestrator
            .search_memories(&user_id, &query.q, query.limit)
            .await?,
    )
}

pub(crate) async fn cleanup_user_memories(
    State(state): Shared,
    Path(user_id): Path<String>,
) -> ApiResult {
    to_json(state.orchestrator.cleanup_owner(&user_id).await?)
}

/// The dispatcher signs deliveries; the signature is not verified yet.
pub(crate) async fn cleanup_webhook(
    State(state): Shared,
    headers: HeaderMap,
    payload: Result<Json<CleanupTask>, JsonRejection>,
) -> ApiResult {
    let Json(task) = payload?;
    debug!(
        "cleanup webhook received (task_type={}, signed={})",
        task.task_type,
        headers.contains_key(SIGNATURE_HEADER)
    );
    let report = state.orchestrator.handle_cleanup_task(task).await?;
    info!("cleanup webhook completed");
    to_json(report)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleCleanupBody {
    callback_url: String,
}

pub(crate) async fn schedule_cleanup(
    State(state): Shared,
    payload: Result<Json<ScheduleCleanupBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let schedule_id = state
        .orchestrator
        .schedule_cleanup(&body.callback_url)
        .await?;
    Ok(Json(json!({
        "schedule_id": schedule_id,
        "callback_url": body.callback_url,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleUserCleanupBody {
    callback_url: String,
    user_id: String,
    #[serde(default)]
    delay_seconds: u64,
}

pub(crate) async fn schedule_user_cleanup(
    State(state): Shared,
    payload: Result<Json<ScheduleUserCleanupBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let message_id = state
        .orchestrator
        .schedule_owner_cleanup(&body.callback_url, &body.user_id, body.delay_seconds)
        .await?;
    Ok(Json(json!({
        "message_id": message_id,
        "user_id": body.user_id,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleSessionCleanupBody {
    callback_url: String,
    session_id: String,
    #[serde(default)]
    delay_seconds: u64,
}

pub(crate) async fn schedule_session_cleanup(
    State(state): Shared,
    payload: Result<Json<ScheduleSessionCleanupBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let message_id = state
        .orchestrator
        .schedule_session_cleanup(&body.callback_url, &body.session_id, body.delay_seconds)
        .await?;
    Ok(Json(json!({
        "message_id": message_id,
        "session_id": body.session_id,
        "delay_seconds": body.delay_seconds,
    })))
}

pub(crate) async fn list_schedules(State(state): Shared) -> ApiResult {
    let schedules = state.orchestrator.list_schedules().await?;
    Ok(Json(json!({ "schedules": schedules })))
}

pub(crate) async fn cancel_schedule(
    State(state): Shared,
    Path(schedule_id): Path<String>,
) -> ApiResult {
    state
        .orchestrator
        .cancel_scheduled_cleanup(&schedule_id)
        .await?;
    Ok(Json(json!({ "cancelled": schedule_id })))
}
