// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use poiesis_adapters::{DummyAuthenticator, FakeCluster};
use poiesis_core::{CoreConfig, RuntimeEnv, TaskId, TaskState};
use poiesis_storage::{MemoryStore, TaskStore};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::state::AppState;

fn test_config() -> CoreConfig {
    CoreConfig {
        env: RuntimeEnv::Development,
        namespace: "poiesis".to_string(),
        service_account: "poiesis-sa".to_string(),
        image: "poiesis:latest".to_string(),
        image_pull_policy: "IfNotPresent".to_string(),
        restart_policy: "Never".to_string(),
        job_ttl_seconds: 300,
        pvc_access_mode: "ReadWriteOnce".to_string(),
        pvc_storage_class: None,
        monitor_timeout: None,
        core_configmap: "poiesis-core".to_string(),
        mongo_secret: None,
        redis_secret: None,
        s3_secret: None,
        infra_security_context: false,
        executor_security_context: false,
        security_context_path: None,
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    cluster: FakeCluster,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let cluster = FakeCluster::new();
    let state = AppState {
        store: store.clone(),
        cluster: Arc::new(cluster.clone()),
        authenticator: Arc::new(DummyAuthenticator),
        config: Arc::new(test_config()),
    };
    TestApp { router: build_router(state), store, cluster }
}

fn echo_body() -> Value {
    json!({
        "name": "echo",
        "inputs": [{"content": "hi", "path": "/data/f"}],
        "executors": [{
            "image": "ubuntu:20.04",
            "command": ["/bin/cat", "/data/f"],
            "workdir": "/data/"
        }],
        "tags": {"team": "genomics"}
    })
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_task(app: &TestApp, token: &str, body: Value) -> TaskId {
    let (status, json) =
        send(app, request("POST", "/ga4gh/tes/v1/tasks", Some(token), Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    TaskId::from_string(json["id"].as_str().unwrap())
}

#[tokio::test]
async fn service_info_is_public_and_documents_truncation() {
    let app = test_app();
    let (status, body) = send(&app, request("GET", "/ga4gh/tes/v1/service-info", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"]["artifact"], "tes");
    assert_eq!(body["type"]["version"], "1.1.0");
    let storage = body["storage"].as_array().unwrap();
    assert!(storage.iter().any(|s| s.as_str().unwrap().contains("truncated")));
}

#[tokio::test]
async fn task_endpoints_require_a_bearer_token() {
    let app = test_app();
    let (status, body) = send(&app, request("GET", "/ga4gh/tes/v1/tasks", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(
        &app,
        request("POST", "/ga4gh/tes/v1/tasks", None, Some(echo_body())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_launches_the_orchestrator_and_reads_back_identically() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;

    // The orchestrator Job was launched with the task id in its env
    let job = app.cluster.job_spec(&format!("torc-{}", id.suffix())).unwrap();
    assert!(job.env.contains(&("POIESIS_TASK_ID".to_string(), id.as_str().to_string())));

    let uri = format!("/ga4gh/tes/v1/tasks/{id}?view=FULL");
    let (status, body) = send(&app, request("GET", &uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "QUEUED");
    assert_eq!(body["name"], "echo");
    assert_eq!(body["inputs"][0]["content"], "hi");
    assert_eq!(body["executors"][0]["command"][0], "/bin/cat");
    assert_eq!(body["tags"]["team"], "genomics");
    assert!(body["creation_time"].is_string());
    assert!(body.get("user_id").is_none());
}

#[tokio::test]
async fn default_view_is_minimal() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;
    let (status, body) =
        send(&app, request("GET", &format!("/ga4gh/tes/v1/tasks/{id}"), Some("alice"), None))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "QUEUED");
    assert!(body.get("executors").is_none());
    assert!(body.get("name").is_none());
}

#[tokio::test]
async fn basic_view_strips_content_and_streams() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;
    let uri = format!("/ga4gh/tes/v1/tasks/{id}?view=BASIC");
    let (_, body) = send(&app, request("GET", &uri, Some("alice"), None)).await;
    assert!(body["inputs"][0].get("content").is_none());
    assert_eq!(body["name"], "echo");
}

#[tokio::test]
async fn cross_subject_reads_are_not_found() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;

    let uri = format!("/ga4gh/tes/v1/tasks/{id}");
    let (status, body) = send(&app, request("GET", &uri, Some("bob"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, listing) = send(&app, request("GET", "/ga4gh/tes/v1/tasks", Some("bob"), None)).await;
    assert_eq!(listing["tasks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let cases = [
        // url and content are mutually exclusive
        json!({"executors": [{"image": "b", "command": ["x"]}],
               "inputs": [{"url": "s3://b/f", "content": "x", "path": "/f"}]}),
        // an input needs one source
        json!({"executors": [{"image": "b", "command": ["x"]}],
               "inputs": [{"path": "/f"}]}),
        // at least one executor
        json!({"inputs": [{"content": "x", "path": "/f"}]}),
        // wildcard output without path_prefix
        json!({"executors": [{"image": "b", "command": ["x"]}],
               "outputs": [{"url": "s3://b/o/", "path": "/d/*.txt"}]}),
    ];
    let app = test_app();
    for body in cases {
        let (status, response) =
            send(&app, request("POST", "/ga4gh/tes/v1/tasks", Some("alice"), Some(body.clone())))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted: {body}");
        assert_eq!(response["error"], "invalid_request");
    }
}

#[tokio::test]
async fn malformed_json_is_a_400() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/ga4gh/tes/v1/tasks")
        .header(header::AUTHORIZATION, "Bearer alice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_task_id_is_not_found() {
    let app = test_app();
    let long_id = "tsk-".repeat(32);
    let (status, _) = send(
        &app,
        request("GET", &format!("/ga4gh/tes/v1/tasks/{long_id}"), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_view_is_a_400() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;
    let uri = format!("/ga4gh/tes/v1/tasks/{id}?view=COMPACT");
    let (status, _) = send(&app, request("GET", &uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_marks_canceling_and_reaps_children() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;

    let uri = format!("/ga4gh/tes/v1/tasks/{id}:cancel");
    let (status, _) = send(&app, request("POST", &uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.load(&id).await.unwrap().state, TaskState::Canceling);

    // Phase Jobs and executor pods were reaped; the orchestrator's own
    // Job survives to finish the cancellation.
    let deleted = app.cluster.deleted_jobs();
    assert!(deleted.iter().any(|j| j.starts_with("tif-")));
    assert!(deleted.iter().any(|j| j.starts_with("texam-")));
    assert!(!deleted.iter().any(|j| j.starts_with("torc-")));

    // Idempotent while canceling
    let (status, _) = send(&app, request("POST", &uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.load(&id).await.unwrap().state, TaskState::Canceling);
}

#[tokio::test]
async fn cancel_of_a_terminal_task_is_a_noop() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;
    app.store.transition(&id, TaskState::Queued, TaskState::Canceling).await.unwrap();
    app.store.transition(&id, TaskState::Canceling, TaskState::Canceled).await.unwrap();

    let uri = format!("/ga4gh/tes/v1/tasks/{id}:cancel");
    let (status, _) = send(&app, request("POST", &uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.load(&id).await.unwrap().state, TaskState::Canceled);
}

#[tokio::test]
async fn cancel_of_anothers_task_is_not_found() {
    let app = test_app();
    let id = create_task(&app, "alice", echo_body()).await;
    let uri = format!("/ga4gh/tes/v1/tasks/{id}:cancel");
    let (status, _) = send(&app, request("POST", &uri, Some("bob"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_tags_and_paginates() {
    let app = test_app();
    let mut tagged = echo_body();
    tagged["tags"] = json!({"team": "genomics", "stage": "qc"});
    create_task(&app, "alice", tagged).await;
    create_task(&app, "alice", echo_body()).await;
    create_task(&app, "alice", echo_body()).await;

    // Tag filter: key with empty value matches any value of that key
    let uri = "/ga4gh/tes/v1/tasks?tag_key=stage&tag_value=";
    let (_, body) = send(&app, request("GET", uri, Some("alice"), None)).await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    // Absent key never matches
    let uri = "/ga4gh/tes/v1/tasks?tag_key=missing";
    let (_, body) = send(&app, request("GET", uri, Some("alice"), None)).await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 0);

    // Pagination walks all three without repeats
    let (_, first) =
        send(&app, request("GET", "/ga4gh/tes/v1/tasks?page_size=2", Some("alice"), None)).await;
    assert_eq!(first["tasks"].as_array().unwrap().len(), 2);
    let token = first["next_page_token"].as_str().unwrap().to_string();
    let uri = format!("/ga4gh/tes/v1/tasks?page_size=2&page_token={token}");
    let (_, second) = send(&app, request("GET", &uri, Some("alice"), None)).await;
    assert_eq!(second["tasks"].as_array().unwrap().len(), 1);
    assert!(second.get("next_page_token").is_none());
}

#[tokio::test]
async fn oversized_page_size_is_clamped_not_rejected() {
    let app = test_app();
    create_task(&app, "alice", echo_body()).await;
    let uri = "/ga4gh/tes/v1/tasks?page_size=100000";
    let (status, body) = send(&app, request("GET", uri, Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_orchestrator_launch_fails_the_task() {
    let app = test_app();
    app.cluster.script_job_create_failure(poiesis_adapters::ClusterError::Unavailable(
        "apiserver down".to_string(),
    ));

    let (status, body) =
        send(&app, request("POST", "/ga4gh/tes/v1/tasks", Some("alice"), Some(echo_body())))
            .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");

    // The orphaned task was failed loudly rather than left QUEUED
    let page = app
        .store
        .list(&poiesis_storage::ListQuery {
            view: poiesis_core::View::Full,
            ..poiesis_storage::ListQuery::for_user("alice")
        })
        .await
        .unwrap();
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(page.tasks[0].state, TaskState::SystemError);
}
