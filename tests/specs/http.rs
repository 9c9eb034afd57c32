// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-surface scenarios: round-trip fidelity and subject isolation.

use axum::http::StatusCode;
use poiesis_core::TaskState;
use poiesis_storage::TaskStore;
use serde_json::json;

use crate::prelude::World;

/// A created task reads back with identical client fields; the server
/// populates id, state, creation_time, and logs.
#[tokio::test]
async fn round_trip_preserves_client_fields() {
    let world = World::new(None);
    let body = json!({
        "name": "round-trip",
        "description": "fidelity check",
        "inputs": [{"content": "hi", "path": "/data/f", "type": "FILE"}],
        "outputs": [{"url": "s3://b/out/", "path": "/data/out", "type": "DIRECTORY"}],
        "executors": [{
            "image": "ubuntu:20.04",
            "command": ["/bin/cat", "/data/f"],
            "workdir": "/data/",
            "env": {"K": "V"}
        }],
        "volumes": ["/scratch"],
        "tags": {"team": "genomics"},
        "resources": {"cpu_cores": 2, "ram_gb": 4.0, "disk_gb": 10.0, "preemptible": false}
    });

    let id = world.create_task("alice", body.clone()).await;
    let task = world.get_full("alice", id).await;

    for field in ["name", "description", "inputs", "outputs", "executors", "volumes", "tags", "resources"] {
        assert_eq!(task[field], body[field], "field {field} drifted");
    }
    assert_eq!(task["id"], id.as_str());
    assert_eq!(task["state"], "QUEUED");
    assert!(task["creation_time"].is_string());
    assert!(task["logs"].is_array());
}

/// User B can neither read nor cancel user A's task.
#[tokio::test]
async fn s6_cross_subject_isolation() {
    let world = World::new(None);
    let id = world
        .create_task(
            "user-a",
            json!({"executors": [{"image": "busybox", "command": ["/bin/true"]}]}),
        )
        .await;

    let (status, _) =
        world.send("GET", &format!("/ga4gh/tes/v1/tasks/{id}"), Some("user-b"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = world
        .send("POST", &format!("/ga4gh/tes/v1/tasks/{id}:cancel"), Some("user-b"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A's view is unaffected
    let (status, _) =
        world.send("GET", &format!("/ga4gh/tes/v1/tasks/{id}"), Some("user-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(world.store.load(&id).await.unwrap().state, TaskState::Queued);
}

/// Canceling a terminal task changes nothing and still returns 200.
#[tokio::test]
async fn cancel_after_completion_is_a_noop() {
    let world = World::new(None);
    let id = world
        .create_task(
            "alice",
            json!({"executors": [{"image": "busybox", "command": ["/bin/true"]}]}),
        )
        .await;

    let state = world.run_to_terminal(id).await;
    assert_eq!(state, TaskState::Complete);

    world.cancel("alice", id).await;
    assert_eq!(world.store.load(&id).await.unwrap().state, TaskState::Complete);
}
