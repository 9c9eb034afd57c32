// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-lifecycle scenarios: submit over HTTP, drive the engine, and
//! read the result back over HTTP.

use std::time::Duration;

use poiesis_core::TaskState;
use serde_json::json;

use crate::prelude::World;

/// Simple echo with inline content. The task completes, the executor
/// log records exit code 0, and its stdout carries the file content.
#[tokio::test]
async fn s1_simple_echo_with_inline_content() {
    let world = World::new(None);
    let volume = tempfile::tempdir().unwrap();
    let path = volume.path().join("data/f");

    let id = world
        .create_task(
            "alice",
            json!({
                "inputs": [{"content": "hi", "path": path.to_string_lossy()}],
                "executors": [{
                    "image": "ubuntu:20.04",
                    "command": ["/bin/cat", path.to_string_lossy()],
                    "workdir": "/data/"
                }]
            }),
        )
        .await;
    world.cluster.script_pod_logs(&format!("texam-{}-0", id.suffix()), b"hi".to_vec());

    let state = world.run_to_terminal(id).await;
    assert_eq!(state, TaskState::Complete);

    let task = world.get_full("alice", id).await;
    assert_eq!(task["state"], "COMPLETE");
    let exec_log = &task["logs"][0]["logs"][0];
    assert_eq!(exec_log["exit_code"], 0);
    assert!(exec_log["stdout"].as_str().unwrap().contains("hi"));
    // The filer actually staged the literal onto the volume
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
}

/// Object-store round trip: a URL input staged in, a directory output
/// collected back out, sizes recorded per file.
#[tokio::test]
async fn s2_object_store_round_trip() {
    let world = World::new(None);
    let remote = tempfile::tempdir().unwrap();
    let volume = tempfile::tempdir().unwrap();

    // Preload the "bucket" with one object
    std::fs::create_dir_all(remote.path().join("inputs")).unwrap();
    std::fs::write(remote.path().join("inputs/f"), b"X").unwrap();

    let staged = volume.path().join("data/f");
    let out_url = format!("file://{}/out", remote.path().display());
    let id = world
        .create_task(
            "alice",
            json!({
                "inputs": [{
                    "url": format!("file://{}/inputs/f", remote.path().display()),
                    "path": staged.to_string_lossy()
                }],
                "outputs": [{
                    "url": out_url,
                    "path": volume.path().join("data").to_string_lossy(),
                    "type": "DIRECTORY"
                }],
                "executors": [{
                    "image": "ubuntu:20.04",
                    "command": ["/bin/cat", staged.to_string_lossy()]
                }]
            }),
        )
        .await;

    let state = world.run_to_terminal(id).await;
    assert_eq!(state, TaskState::Complete);

    // The object exists at out/f with the original bytes
    assert_eq!(std::fs::read(remote.path().join("out/f")).unwrap(), b"X");

    let task = world.get_full("alice", id).await;
    let outputs = task["logs"][0]["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0]["url"].as_str().unwrap().ends_with("/out/f"));
    assert_eq!(outputs[0]["size_bytes"], 1);
}

/// An executor failure stops the pipeline: one log with a non-zero
/// exit, no second executor, resources swept.
#[tokio::test]
async fn s3_executor_failure_stops_pipeline() {
    let world = World::new(None);
    let id = world
        .create_task(
            "alice",
            json!({
                "executors": [
                    {"image": "busybox", "command": ["/bin/false"]},
                    {"image": "busybox", "command": ["/bin/true"]}
                ]
            }),
        )
        .await;
    world.cluster.script_pod_outcome(
        &format!("texam-{}-0", id.suffix()),
        poiesis_adapters::PodOutcome::failed(1),
    );

    let state = world.run_to_terminal(id).await;
    assert_eq!(state, TaskState::ExecutorError);

    let task = world.get_full("alice", id).await;
    let exec_logs = task["logs"][0]["logs"].as_array().unwrap();
    assert_eq!(exec_logs.len(), 1);
    assert_eq!(exec_logs[0]["exit_code"], 1);
    // The second executor's pod was never created
    assert_eq!(world.cluster.created_pods(), vec![format!("texam-{}-0", id.suffix())]);
    assert!(world.cluster.is_swept());
}

/// `ignore_error` lets the pipeline continue past a failure.
#[tokio::test]
async fn s4_ignore_error_continues() {
    let world = World::new(None);
    let id = world
        .create_task(
            "alice",
            json!({
                "executors": [
                    {"image": "busybox", "command": ["/bin/false"], "ignore_error": true},
                    {"image": "busybox", "command": ["/bin/true"]}
                ]
            }),
        )
        .await;
    world.cluster.script_pod_outcome(
        &format!("texam-{}-0", id.suffix()),
        poiesis_adapters::PodOutcome::failed(1),
    );

    let state = world.run_to_terminal(id).await;
    assert_eq!(state, TaskState::Complete);

    let task = world.get_full("alice", id).await;
    let exec_logs = task["logs"][0]["logs"].as_array().unwrap();
    assert_eq!(exec_logs.len(), 2);
    assert_eq!(exec_logs[0]["exit_code"], 1);
    assert_eq!(exec_logs[1]["exit_code"], 0);
}

/// Cancel during a long-running executor: the task lands in CANCELED
/// within a bounded interval, resources are gone, and at most one
/// partial executor log exists.
#[tokio::test]
async fn s5_cancel_during_run() {
    let world = World::new(Some(Duration::from_millis(300)));
    let id = world
        .create_task(
            "alice",
            json!({
                "executors": [{"image": "busybox", "command": ["/bin/sleep", "60"]}]
            }),
        )
        .await;
    world.cluster.script_pod_hang(&format!("texam-{}-0", id.suffix()));

    let world_clone = world.clone();
    let canceller = tokio::spawn(async move {
        world_clone.wait_for_executor_pod().await;
        world_clone.cancel("alice", id).await;
    });

    let state = world.run_to_terminal(id).await;
    canceller.await.unwrap();
    assert_eq!(state, TaskState::Canceled);

    let task = world.get_full("alice", id).await;
    assert_eq!(task["state"], "CANCELED");
    assert!(task["logs"][0]["logs"].as_array().unwrap().len() <= 1);
    assert!(world.cluster.is_swept());
}
