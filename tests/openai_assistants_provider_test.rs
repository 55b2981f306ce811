// ABOUTME: Tests for the OpenAI Assistants HTTP client against a local mock API server
// ABOUTME: Verifies headers, request bodies, error mapping, message pagination and a full session exchange
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use assistant_hub::{
    assistant::AssistantSession,
    config::environment::RemoteApiConfig,
    errors::ErrorCode,
    llm::{
        AssistantProvider, CreateAssistantRequest, MessageRole, ModifyAssistantRequest,
        OpenAiAssistantsProvider, RunStatus,
    },
    store::memory::InMemoryStore,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use common::{fast_poll, init_test_logging, params};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const KNOWN_THREAD: &str = "thread_mock";

// ============================================================================
// Mock Assistants API
// ============================================================================

#[derive(Default)]
struct MockApi {
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Clone, Debug)]
struct RecordedRequest {
    path: String,
    authorization: Option<String>,
    beta: Option<String>,
    organization: Option<String>,
    query: HashMap<String, String>,
    body: Value,
}

impl MockApi {
    fn record(&self, path: String, headers: &HeaderMap, query: HashMap<String, String>, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            path,
            authorization: header("authorization"),
            beta: header("openai-beta"),
            organization: header("openai-organization"),
            query,
            body,
        });
    }

    fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

type Api = State<Arc<MockApi>>;

async fn create_assistant(State(api): Api, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    api.record("/v1/assistants".to_owned(), &headers, HashMap::new(), body.clone());
    Json(json!({
        "id": "asst_mock",
        "object": "assistant",
        "name": body["name"],
        "model": body["model"],
        "instructions": body["instructions"],
        "tools": []
    }))
}

async fn modify_assistant(
    State(api): Api,
    Path(assistant_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.record(format!("/v1/assistants/{assistant_id}"), &headers, HashMap::new(), body.clone());
    Json(json!({
        "id": assistant_id,
        "object": "assistant",
        "model": body.get("model").cloned().unwrap_or(json!("gpt-4o")),
        "instructions": body.get("instructions").cloned().unwrap_or(Value::Null)
    }))
}

async fn create_thread(State(api): Api, headers: HeaderMap) -> Json<Value> {
    api.record("/v1/threads".to_owned(), &headers, HashMap::new(), Value::Null);
    Json(json!({ "id": KNOWN_THREAD, "object": "thread", "created_at": 1_700_000_000 }))
}

async fn retrieve_thread(Path(thread_id): Path<String>) -> impl IntoResponse {
    if thread_id == KNOWN_THREAD {
        (StatusCode::OK, Json(json!({ "id": thread_id, "object": "thread" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "message": format!("No thread found with id '{thread_id}'."),
                    "type": "invalid_request_error",
                    "code": null
                }
            })),
        )
    }
}

async fn create_message(
    State(api): Api,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.record(
        format!("/v1/threads/{thread_id}/messages"),
        &headers,
        HashMap::new(),
        body.clone(),
    );
    Json(json!({
        "id": "msg_user",
        "object": "thread.message",
        "created_at": 1_700_000_001,
        "thread_id": thread_id,
        "role": body["role"],
        "content": [{ "type": "text", "text": { "value": body["content"], "annotations": [] } }]
    }))
}

async fn list_messages(
    State(api): Api,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let first_page = !query.contains_key("after");
    api.record(
        format!("/v1/threads/{thread_id}/messages"),
        &headers,
        query,
        Value::Null,
    );

    if first_page {
        Json(json!({
            "object": "list",
            "data": [
                { "id": "msg_1", "role": "assistant", "created_at": 1,
                  "content": [{ "type": "text", "text": { "value": "Earlier answer", "annotations": [] } }] },
                { "id": "msg_2", "role": "user", "created_at": 2,
                  "content": [{ "type": "text", "text": { "value": "Hello", "annotations": [] } }] }
            ],
            "first_id": "msg_1",
            "last_id": "msg_2",
            "has_more": true
        }))
    } else {
        Json(json!({
            "object": "list",
            "data": [
                { "id": "msg_3", "role": "assistant", "created_at": 3,
                  "content": [
                      { "type": "text", "text": { "value": "Bonjour", "annotations": [] } },
                      { "type": "image_file", "image_file": { "file_id": "file_1" } },
                      { "type": "text", "text": { "value": " !", "annotations": [] } }
                  ] }
            ],
            "first_id": "msg_3",
            "last_id": "msg_3",
            "has_more": false
        }))
    }
}

async fn create_run(
    State(api): Api,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.record(
        format!("/v1/threads/{thread_id}/runs"),
        &headers,
        HashMap::new(),
        body.clone(),
    );
    Json(json!({
        "id": "run_mock",
        "object": "thread.run",
        "thread_id": thread_id,
        "assistant_id": body["assistant_id"],
        "status": "queued"
    }))
}

async fn retrieve_run(Path((thread_id, run_id)): Path<(String, String)>) -> Json<Value> {
    Json(json!({
        "id": run_id,
        "object": "thread.run",
        "thread_id": thread_id,
        "status": "completed",
        "usage": { "prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13 }
    }))
}

async fn start_mock_api() -> Result<(SocketAddr, Arc<MockApi>)> {
    let api = Arc::new(MockApi::default());
    let app = Router::new()
        .route("/v1/assistants", post(create_assistant))
        .route("/v1/assistants/:assistant_id", post(modify_assistant))
        .route("/v1/threads", post(create_thread))
        .route("/v1/threads/:thread_id", get(retrieve_thread))
        .route(
            "/v1/threads/:thread_id/messages",
            get(list_messages).post(create_message),
        )
        .route("/v1/threads/:thread_id/runs", post(create_run))
        .route("/v1/threads/:thread_id/runs/:run_id", get(retrieve_run))
        .route(
            "/v1/unauthorized/threads",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": {
                            "message": "Incorrect API key provided",
                            "type": "invalid_request_error",
                            "code": "invalid_api_key"
                        }
                    })),
                )
            }),
        )
        .with_state(Arc::clone(&api));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((addr, api))
}

fn provider_for(addr: SocketAddr, path: &str, api_key: &str) -> OpenAiAssistantsProvider {
    init_test_logging();
    OpenAiAssistantsProvider::new(RemoteApiConfig {
        api_key: api_key.to_owned(),
        base_url: format!("http://{addr}{path}"),
        organization: Some("org-test".to_owned()),
        ..RemoteApiConfig::default()
    })
    .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_requests_carry_auth_and_beta_headers() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "sk-test");

    let assistant = provider
        .create_assistant(&CreateAssistantRequest {
            name: "Support".to_owned(),
            model: "gpt-4o".to_owned(),
            instructions: "Be helpful".to_owned(),
        })
        .await?;

    assert_eq!(assistant.id, "asst_mock");
    assert_eq!(assistant.model, "gpt-4o");

    let recorded = api.requests_to("/v1/assistants");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(recorded[0].beta.as_deref(), Some("assistants=v2"));
    assert_eq!(recorded[0].organization.as_deref(), Some("org-test"));
    assert_eq!(recorded[0].body["instructions"], "Be helpful");
    Ok(())
}

#[tokio::test]
async fn test_empty_api_key_sends_no_authorization() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "");

    provider.create_thread().await?;

    let recorded = api.requests_to("/v1/threads");
    assert!(recorded[0].authorization.is_none());
    assert_eq!(recorded[0].beta.as_deref(), Some("assistants=v2"));
    Ok(())
}

#[tokio::test]
async fn test_modify_assistant_sends_only_changed_fields() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "sk-test");

    provider
        .modify_assistant(
            "asst_mock",
            &ModifyAssistantRequest {
                model: Some("gpt-4.1".to_owned()),
                instructions: None,
            },
        )
        .await?;

    let recorded = api.requests_to("/v1/assistants/asst_mock");
    assert_eq!(recorded[0].body, json!({ "model": "gpt-4.1" }));
    Ok(())
}

#[tokio::test]
async fn test_retrieve_unknown_thread_is_error() -> Result<()> {
    let (addr, _api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "sk-test");

    assert_eq!(provider.retrieve_thread(KNOWN_THREAD).await?.id, KNOWN_THREAD);

    let err = provider.retrieve_thread("thread_gone").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalServiceError);
    assert!(err.message.contains("No thread found"));
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_failure() -> Result<()> {
    let (addr, _api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1/unauthorized", "sk-wrong");

    let err = provider.create_thread().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert_eq!(err.context.details["code"], "invalid_api_key");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_api_is_unavailable() -> Result<()> {
    init_test_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let provider = provider_for(addr, "/v1", "sk-test");

    let err = provider.create_thread().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ExternalServiceUnavailable);
    Ok(())
}

#[tokio::test]
async fn test_run_payload_is_kept() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "sk-test");

    let run = provider.create_run(KNOWN_THREAD, "asst_mock").await?;
    assert_eq!(run.status, RunStatus::Queued);
    assert_eq!(
        api.requests_to("/v1/threads/thread_mock/runs")[0].body,
        json!({ "assistant_id": "asst_mock" })
    );

    let run = provider.retrieve_run(KNOWN_THREAD, &run.id).await?;
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.raw["usage"]["total_tokens"], 13);
    Ok(())
}

#[tokio::test]
async fn test_list_messages_follows_pagination() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider = provider_for(addr, "/v1", "sk-test");

    let messages = provider.list_messages(KNOWN_THREAD).await?;

    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_1", "msg_2", "msg_3"]);
    assert_eq!(messages[2].role, MessageRole::Assistant);
    assert_eq!(messages[2].content.to_text(), "Bonjour !");

    let pages = api.requests_to("/v1/threads/thread_mock/messages");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].query.get("order").map(String::as_str), Some("asc"));
    assert!(!pages[0].query.contains_key("after"));
    assert_eq!(pages[1].query.get("after").map(String::as_str), Some("msg_2"));
    Ok(())
}

#[tokio::test]
async fn test_session_exchange_over_http() -> Result<()> {
    let (addr, api) = start_mock_api().await?;
    let provider: Arc<dyn AssistantProvider> = Arc::new(provider_for(addr, "/v1", "sk-test"));
    let session = AssistantSession::new(
        params("Support", "gpt-4o", "Be helpful"),
        provider,
        Arc::new(InMemoryStore::new()),
        fast_poll(),
    );

    session.initialize().await?;
    assert_eq!(session.assistant_id().await.as_deref(), Some("asst_mock"));

    let reply = session
        .send_message_and_get_response(Some("thread_gone"), "Hello")
        .await?;

    assert_eq!(reply.thread_id, KNOWN_THREAD);
    assert_eq!(reply.response, "Bonjour !");

    let posted: Vec<RecordedRequest> = api
        .requests_to("/v1/threads/thread_mock/messages")
        .into_iter()
        .filter(|r| !r.body.is_null())
        .collect();
    assert_eq!(posted[0].body, json!({ "role": "user", "content": "Hello" }));
    Ok(())
}
