//! Integration tests for the HTTP service.
//!
//! Each test starts a real axum server on a random port, backed by a mockito
//! registry and a scripted LLM, and drives it over HTTP.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use campus_agent::cache::ToolCache;
use campus_agent::checkpoint::{Checkpointer, MemoryCheckpointer};
use campus_agent::config::AgentConfig;
use campus_agent::dispatcher::MessageDispatcher;
use campus_agent::llm::error::LLMError;
use campus_agent::llm::traits::LLM;
use campus_agent::llm::{CallInfo, GenerateResult, LLMResult};
use campus_agent::message::Message;
use campus_agent::registry::RegistryClient;
use campus_agent::server::{
    AppState, DISPATCH_ERROR_MESSAGE, TOOLS_ERROR_MESSAGE, build_router, spawn_server,
};
use campus_agent::tools::schema::ToolSchema;
use futures::future::BoxFuture;
use serde_json::{Value, json};

/// Replays canned generations in order.
#[derive(Default)]
struct ScriptedLLM {
    script: Mutex<VecDeque<GenerateResult>>,
    tools_seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLLM {
    fn new(script: Vec<GenerateResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            tools_seen: Mutex::new(Vec::new()),
        }
    }
}

impl LLM for ScriptedLLM {
    fn generate<'a>(
        &'a self,
        _messages: &'a [Message],
        tools: &'a [ToolSchema],
    ) -> BoxFuture<'a, LLMResult<GenerateResult>> {
        Box::pin(async move {
            self.tools_seen
                .lock()
                .unwrap()
                .push(tools.iter().map(|t| t.name.clone()).collect());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LLMError::InvalidResponse("script exhausted".into()))
        })
    }

    fn native_tools(&self) -> bool {
        true
    }
}

fn answer(text: &str) -> GenerateResult {
    GenerateResult {
        generation: text.into(),
        ..Default::default()
    }
}

fn get_user_descriptors(base: &str) -> Value {
    json!([{
        "name": "getUser",
        "description": "Fetch a user by id",
        "isRequest": true,
        "method": "GET",
        "url": format!("{base}/users/{{id}}"),
        "parameters": {
            "id": { "type": "MANDATORY", "clazz": "NUMBER", "description": "user id" }
        }
    }])
}

struct TestServer {
    base: String,
    llm: Arc<ScriptedLLM>,
    store: Arc<MemoryCheckpointer>,
}

async fn spawn_test_server(registry_url: &str, script: Vec<GenerateResult>) -> TestServer {
    let llm = Arc::new(ScriptedLLM::new(script));
    let store = Arc::new(MemoryCheckpointer::new());
    let cache = ToolCache::new(Arc::new(RegistryClient::new(
        reqwest::Client::new(),
        registry_url,
    )));
    let dispatcher = MessageDispatcher::new(
        llm.clone(),
        store.clone(),
        reqwest::Client::new(),
        AgentConfig::default(),
    );
    let router = build_router(AppState {
        cache: Arc::new(cache),
        dispatcher: Arc::new(dispatcher),
    });
    let addr = spawn_server(router, ([127, 0, 0, 1], 0).into())
        .await
        .unwrap();
    TestServer {
        base: format!("http://{addr}"),
        llm,
        store,
    }
}

async fn post_message(base: &str, query: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/agent/message{query}"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check() {
    let server = spawn_test_server("http://127.0.0.1:1", Vec::new()).await;
    let resp = reqwest::get(format!("{}/health", server.base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn message_runs_through_university_tools() {
    let mut upstream = mockito::Server::new_async().await;
    let registry = upstream
        .mock("GET", "/api/institutionInformationsTools/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(get_user_descriptors(&upstream.url()).to_string())
        .create_async()
        .await;
    let user = upstream
        .mock("GET", "/users/7")
        .with_status(200)
        .with_body(r#"{"name":"Ana"}"#)
        .create_async()
        .await;

    let server = spawn_test_server(
        &upstream.url(),
        vec![
            GenerateResult {
                tool_calls: vec![CallInfo {
                    id: Some("call-1".into()),
                    name: "getUser".into(),
                    args: json!({ "id": 7 }),
                }],
                ..Default::default()
            },
            answer("O usuário 7 é Ana."),
        ],
    )
    .await;

    let resp = post_message(
        &server.base,
        "?universityId=42",
        json!({ "message": "Quem é o usuário 7?", "sessionId": "ana" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "message": "O usuário 7 é Ana." }));

    registry.assert_async().await;
    user.assert_async().await;
    assert_eq!(server.llm.tools_seen.lock().unwrap()[0], vec!["getUser"]);
    assert_eq!(server.store.load("ana").await.unwrap().len(), 4);
}

#[tokio::test]
async fn tools_are_cached_between_requests() {
    let mut upstream = mockito::Server::new_async().await;
    let registry = upstream
        .mock("GET", "/api/institutionInformationsTools/42")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let server = spawn_test_server(&upstream.url(), vec![answer("um"), answer("dois")]).await;

    for text in ["um", "dois"] {
        let resp = post_message(
            &server.base,
            "?universityId=42",
            json!({ "message": "oi", "sessionId": "s" }),
        )
        .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], text);
    }

    registry.assert_async().await;
    assert_eq!(server.store.load("s").await.unwrap().len(), 4);
}

#[tokio::test]
async fn registry_failure_is_a_500() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", "/api/institutionInformationsTools/9")
        .with_status(502)
        .create_async()
        .await;

    let server = spawn_test_server(&upstream.url(), vec![answer("unused")]).await;
    let resp = post_message(
        &server.base,
        "?universityId=9",
        json!({ "message": "oi", "sessionId": "s" }),
    )
    .await;

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "message": TOOLS_ERROR_MESSAGE }));
    assert!(server.llm.tools_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_university_id_is_rejected() {
    let server = spawn_test_server("http://127.0.0.1:1", Vec::new()).await;
    let resp = post_message(&server.base, "", json!({ "message": "oi", "sessionId": "s" })).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn dispatch_failure_is_a_500() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", "/api/institutionInformationsTools/42")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    // Empty script: the LLM fails on the first call.
    let server = spawn_test_server(&upstream.url(), Vec::new()).await;
    let resp = post_message(
        &server.base,
        "?universityId=42",
        json!({ "message": "oi", "sessionId": "s" }),
    )
    .await;

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "message": DISPATCH_ERROR_MESSAGE }));
    assert!(server.store.load("s").await.unwrap().is_empty());
}
