//! Route tests against a real server on a random port backed by fakes.

use mnemos_rs_memory::qstash::SIGNATURE_HEADER;
use mnemos_rs_server::{AppState, create_router};
use mnemos_rs_test_utils::{FailingEmbedder, FakeBackends};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

/// Spin up a server over the given backends and return the base URL.
async fn start_test_server(backends: &FakeBackends) -> String {
    start_with(create_router(Arc::new(AppState::new(backends.orchestrator())))).await
}

async fn start_with(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn send(request: reqwest::RequestBuilder) -> (u16, Value) {
    let response = request.send().await.expect("send");
    let status = response.status().as_u16();
    let body = response.text().await.expect("body");
    (status, serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    send(reqwest::Client::new().post(format!("{base}{path}")).json(&body)).await
}

async fn get(base: &str, path: &str) -> (u16, Value) {
    send(reqwest::Client::new().get(format!("{base}{path}"))).await
}

async fn delete(base: &str, path: &str) -> (u16, Value) {
    send(reqwest::Client::new().delete(format!("{base}{path}"))).await
}

fn save_body(user: &str, session: &str, content: &str) -> Value {
    json!({ "user_id": user, "session_id": session, "content": content, "role": "user" })
}

#[tokio::test]
async fn health_endpoint() {
    let base = start_test_server(&FakeBackends::new()).await;
    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn save_then_query() {
    let base = start_test_server(&FakeBackends::new()).await;
    let (status, saved) = post(&base, "/memory/save", save_body("alice", "s1", "I have a cat")).await;
    assert_eq!(status, 200);
    assert_eq!(saved["status"], json!("committed"));

    let (status, body) = post(
        &base,
        "/memory/query",
        json!({ "user_id": "alice", "query": "pet", "limit": 5, "min_score": 0.1 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["results"][0]["content"], json!("I have a cat"));
    assert_eq!(body["results"][0]["id"], saved["memory_id"]);
}

#[tokio::test]
async fn save_validation_is_bad_request() {
    let base = start_test_server(&FakeBackends::new()).await;
    let (status, body) = post(&base, "/memory/save", save_body("alice", "s1", "")).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().expect("error").contains("content"));

    let (status, _) = post(&base, "/memory/save", json!({ "user_id": "alice" })).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn session_only_save_is_still_ok() {
    let backends = FakeBackends::new();
    let router = create_router(Arc::new(AppState::new(
        backends.orchestrator_with(Arc::new(FailingEmbedder::new(1024))),
    )));
    let base = start_with(router).await;
    let (status, body) = post(&base, "/memory/save", save_body("alice", "s1", "hello")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], json!("session_only"));
    assert!(body["error"].as_str().expect("error").contains("generate embedding"));
}

#[tokio::test]
async fn session_routes() {
    let base = start_test_server(&FakeBackends::new()).await;
    post(&base, "/memory/save", save_body("alice", "s1", "hello")).await;

    let (status, _) = get(&base, "/session/ghost").await;
    assert_eq!(status, 404);

    let (status, _) = send(
        reqwest::Client::new()
            .put(format!("{base}/session/s1/context"))
            .json(&json!({ "topic": "pets" })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, session) = get(&base, "/session/s1").await;
    assert_eq!(status, 200);
    assert_eq!(session["context"]["topic"], json!("pets"));
    assert_eq!(session["messages"].as_array().expect("messages").len(), 1);

    let (status, sessions) = get(&base, "/user/alice/sessions").await;
    assert_eq!(status, 200);
    assert_eq!(sessions["sessions"], json!(["s1"]));

    let (status, deletion) = delete(&base, "/session/s1?delete_memories=true").await;
    assert_eq!(status, 200);
    assert_eq!(deletion["memories_deleted"], json!(false));
    let (status, _) = delete(&base, "/session/s1").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn delete_memory_requires_owner() {
    let base = start_test_server(&FakeBackends::new()).await;
    let (_, saved) = post(&base, "/memory/save", save_body("alice", "s1", "hello")).await;
    let id = saved["memory_id"].as_str().expect("id").to_string();

    let (status, _) = delete(&base, &format!("/memory/{id}")).await;
    assert_eq!(status, 400);
    let (status, _) = delete(&base, &format!("/memory/{id}?user_id=mallory")).await;
    assert_eq!(status, 404);
    let (status, _) = delete(&base, &format!("/memory/{id}?user_id=alice")).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let backends = FakeBackends::new();
    backends.vectors.fail_query(true);
    let base = start_test_server(&backends).await;
    let (status, body) = post(
        &base,
        "/memory/query",
        json!({ "user_id": "alice", "query": "pet" }),
    )
    .await;
    assert_eq!(status, 502);
    assert!(body["error"].as_str().expect("error").contains("query memories"));
}

#[tokio::test]
async fn cleanup_webhook_runs_owner_cleanup() {
    let base = start_test_server(&FakeBackends::new()).await;
    post(&base, "/memory/save", save_body("bob", "b1", "bob likes tea")).await;

    let (status, report) = post(
        &base,
        "/webhook/cleanup",
        json!({
            "task_type": "cleanup_user_memories",
            "user_id": "bob",
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(report["task_type"], json!("cleanup-owner"));
    assert_eq!(report["memories_deleted"], json!(1));

    let (_, sessions) = get(&base, "/user/bob/sessions").await;
    assert_eq!(sessions["count"], json!(0));

    let (status, _) = post(
        &base,
        "/webhook/cleanup",
        json!({ "task_type": "cleanup-owner", "timestamp": "2024-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn signed_legacy_session_cleanup_removes_the_session() {
    let base = start_test_server(&FakeBackends::new()).await;
    post(&base, "/memory/save", save_body("alice", "s1", "hello")).await;

    let (status, report) = send(
        reqwest::Client::new()
            .post(format!("{base}/webhook/cleanup"))
            .header(SIGNATURE_HEADER, "signed-by-dispatcher")
            .json(&json!({
                "task_type": "cleanup_session",
                "user_id": "s1",
                "timestamp": "2024-01-01T00:00:00Z"
            })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(report["task_type"], json!("cleanup-session"));
    assert_eq!(report["session_id"], json!("s1"));
    assert_eq!(report["deleted"], json!(true));

    let (status, _) = get(&base, "/session/s1").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn scheduling_routes() {
    let backends = FakeBackends::new();
    let base = start_test_server(&backends).await;
    let (status, scheduled) = post(
        &base,
        "/webhook/schedule-cleanup",
        json!({ "callback_url": "https://svc.example/webhook/cleanup" }),
    )
    .await;
    assert_eq!(status, 200);
    let schedule_id = scheduled["schedule_id"].as_str().expect("id").to_string();

    let (status, published) = post(
        &base,
        "/webhook/schedule-user-cleanup",
        json!({ "callback_url": "https://svc.example/webhook/cleanup", "user_id": "bob" }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(published["message_id"].as_str().is_some());

    let (_, listed) = get(&base, "/webhook/schedules").await;
    assert_eq!(listed["schedules"].as_array().expect("list").len(), 1);
    let (status, _) = delete(&base, &format!("/webhook/schedules/{schedule_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(backends.dispatcher.calls().len(), 3);
}

#[tokio::test]
async fn embedding_routes_report_provider() {
    let base = start_test_server(&FakeBackends::new()).await;
    let (status, info) = get(&base, "/memory/embedding-info").await;
    assert_eq!(status, 200);
    assert_eq!(info["provider"], json!("jina"));
    assert_eq!(info["dimensions"], json!(1024));

    post(&base, "/memory/save", save_body("alice", "s1", "hello")).await;
    let (status, check) = get(&base, "/memory/embedding-check").await;
    assert_eq!(status, 200);
    assert_eq!(check["compatible"], json!(true));

    let (status, stats) = get(&base, "/memory/stats").await;
    assert_eq!(status, 200);
    assert_eq!(stats["vector_stats"]["vector_count"], json!(1));
}
