//! Tests for config loading, env overlay and validation.

use super::*;
use crate::EmbeddingProviderKind;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

/// Environment lookup backed by a fixed map.
fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn complete_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("UPSTASH_REDIS_URL", "https://redis.example"),
        ("UPSTASH_REDIS_TOKEN", "redis-token"),
        ("UPSTASH_VECTOR_URL", "https://vector.example"),
        ("UPSTASH_VECTOR_TOKEN", "vector-token"),
        ("JINA_API_KEY", "jina-key"),
    ]
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = MnemosConfig::load_from_str("{}").expect("config");
    assert_eq!(config.session_store.ttl_secs, 86_400);
    assert_eq!(config.memory.memory_ttl_secs, 2_592_000);
    assert_eq!(config.task_dispatch.retries, 3);
    assert_eq!(config.task_dispatch.cleanup_cron, "0 2 * * *");
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Jina);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = MnemosConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown field"));
}

/// Reject unknown embedding providers at decode time.
#[test]
fn rejects_unknown_provider() {
    let err = MnemosConfig::load_from_str(r#"{ embedding: { provider: "cohere" } }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::DecodeFailed(_)));
}

/// Environment values override the file layer; empty values are ignored.
#[test]
fn env_overrides_file_values() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("mnemos.json5");
    fs::write(
        &path,
        r#"{
            server: { port: 9000 },
            session_store: { url: "https://file-redis", token: "file-token" },
            embedding: { provider: "jina", jina_api_key: "file-key" },
        }"#,
    )
    .expect("write");

    let mut pairs = complete_env();
    pairs.push(("PORT", "7070"));
    pairs.push(("EMBEDDING_PROVIDER", "OpenAI"));
    pairs.push(("OPENAI_API_KEY", "sk-test"));
    pairs.push(("QSTASH_TOKEN", ""));
    let config = MnemosConfig::load_with_env(Some(&path), env(&pairs)).expect("config");

    assert_eq!(config.server.port, 7070);
    assert_eq!(config.session_store.url, "https://redis.example");
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::OpenAi);
    assert_eq!(config.embedding.openai_api_key, "sk-test");
    assert_eq!(config.task_dispatch.token, "");
    assert_eq!(config.task_dispatch.url, "https://qstash.upstash.io");
}

/// Missing store credentials are reported with the offending path.
#[test]
fn validation_requires_store_credentials() {
    let pairs = vec![("UPSTASH_REDIS_URL", "https://redis.example")];
    let err = MnemosConfig::load_with_env(None, env(&pairs)).unwrap_err();
    match err {
        ConfigError::InvalidField { path, .. } => assert_eq!(path, "session_store.token"),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// The selected provider must have an API key.
#[test]
fn validation_requires_selected_provider_key() {
    let mut pairs: Vec<_> = complete_env()
        .into_iter()
        .filter(|(key, _)| *key != "JINA_API_KEY")
        .collect();
    pairs.push(("OPENAI_API_KEY", "sk-unused"));
    let err = MnemosConfig::load_with_env(None, env(&pairs)).unwrap_err();
    assert!(format!("{err}").contains("embedding.jina_api_key"));
}

/// A complete environment yields a valid config without any file.
#[test]
fn env_only_config_is_valid() {
    let config = MnemosConfig::load_with_env(None, env(&complete_env())).expect("config");
    assert_eq!(config.vector_store.token, "vector-token");
    assert_eq!(config.embedding.jina_api_key, "jina-key");
}

/// Malformed cron expressions are rejected.
#[test]
fn validation_rejects_bad_cron() {
    let mut config = MnemosConfig::load_with_env(None, env(&complete_env())).expect("config");
    config.task_dispatch.cleanup_cron = "daily".to_string();
    let err = config.validate().unwrap_err();
    assert!(format!("{err}").contains("task_dispatch.cleanup_cron"));
}

/// Nested paths are created on demand by the overlay helper.
#[test]
fn set_path_creates_nested_objects() {
    let mut root = serde_json::json!({});
    merge::set_path(&mut root, "a.b.c", serde_json::json!(1));
    assert_eq!(root, serde_json::json!({ "a": { "b": { "c": 1 } } }));
}

/// Syntax errors surface as parse failures, schema errors as decode failures.
#[test]
fn parse_and_decode_errors_are_distinct() {
    let err = MnemosConfig::load_from_str("{ server: ").unwrap_err();
    assert!(matches!(err, ConfigError::ParseFailed(_)));
    let err = MnemosConfig::load_from_str(r#"{ server: { port: "high" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::DecodeFailed(_)));
}
