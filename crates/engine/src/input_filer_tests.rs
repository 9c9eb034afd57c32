// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Harness;
use poiesis_core::{SignalStatus, TaskRequest, TaskState};
use poiesis_storage::TaskStore;

fn router() -> TransferRouter {
    TransferRouter::with_local_schemes()
}

fn content_input(content: &str, path: &std::path::Path) -> Input {
    Input {
        content: Some(content.to_string()),
        path: path.to_string_lossy().into_owned(),
        ..Input::default()
    }
}

#[tokio::test]
async fn content_inputs_are_written_verbatim() {
    let volume = tempfile::tempdir().unwrap();
    let dest = volume.path().join("data/f");
    let request = TaskRequest {
        inputs: vec![content_input("hi", &dest)],
        executors: vec![poiesis_core::test_support::exiting_executor(0, false)],
        ..TaskRequest::default()
    };
    let harness = Harness::with_task(request).await;
    let listener = harness.listen(Phase::InputFiler);

    run(&harness.ctx, &router()).await.unwrap();

    assert!(listener.await.unwrap().is_ok());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hi");
    let task = harness.store.load(&harness.task_id()).await.unwrap();
    assert!(task.current_log().unwrap().system_logs.iter().any(|l| l.contains("staged 1")));
}

#[tokio::test]
async fn url_inputs_download_through_the_router() {
    let volume = tempfile::tempdir().unwrap();
    let source = volume.path().join("remote/f.bin");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, b"payload").unwrap();
    let dest = volume.path().join("staged/f.bin");

    let request = TaskRequest {
        inputs: vec![Input {
            url: Some(format!("file://{}", source.display())),
            path: dest.to_string_lossy().into_owned(),
            ..Input::default()
        }],
        executors: vec![poiesis_core::test_support::exiting_executor(0, false)],
        ..TaskRequest::default()
    };
    let harness = Harness::with_task(request).await;
    let listener = harness.listen(Phase::InputFiler);

    run(&harness.ctx, &router()).await.unwrap();
    assert!(listener.await.unwrap().is_ok());
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[tokio::test]
async fn directory_inputs_fetch_recursively() {
    let volume = tempfile::tempdir().unwrap();
    let source = volume.path().join("tree");
    std::fs::create_dir_all(source.join("sub")).unwrap();
    std::fs::write(source.join("a.txt"), b"a").unwrap();
    std::fs::write(source.join("sub/b.txt"), b"b").unwrap();
    let dest = volume.path().join("staged");

    let request = TaskRequest {
        inputs: vec![Input {
            url: Some(format!("file://{}", source.display())),
            path: dest.to_string_lossy().into_owned(),
            r#type: IoType::Directory,
            ..Input::default()
        }],
        executors: vec![poiesis_core::test_support::exiting_executor(0, false)],
        ..TaskRequest::default()
    };
    let harness = Harness::with_task(request).await;

    run(&harness.ctx, &router()).await.unwrap();
    assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(dest.join("sub/b.txt")).unwrap(), b"b");
}

#[tokio::test]
async fn missing_source_publishes_error_and_exits_nonzero() {
    let volume = tempfile::tempdir().unwrap();
    let request = TaskRequest {
        inputs: vec![Input {
            url: Some(format!("file://{}/ghost", volume.path().display())),
            path: volume.path().join("staged").to_string_lossy().into_owned(),
            ..Input::default()
        }],
        executors: vec![poiesis_core::test_support::exiting_executor(0, false)],
        ..TaskRequest::default()
    };
    let harness = Harness::with_task(request).await;
    let listener = harness.listen(Phase::InputFiler);

    let err = run(&harness.ctx, &router()).await.unwrap_err();
    assert!(matches!(err, WorkloadError::System(_)));

    let signal = listener.await.unwrap();
    assert_eq!(signal.status, SignalStatus::Error);
    assert!(signal.detail.unwrap().contains("inputs[0]"));

    let task = harness.store.load(&harness.task_id()).await.unwrap();
    assert!(task
        .current_log()
        .unwrap()
        .system_logs
        .iter()
        .any(|l| l.contains("input staging failed")));
}

#[tokio::test]
async fn cancel_requested_skips_staging() {
    let volume = tempfile::tempdir().unwrap();
    let dest = volume.path().join("f");
    let request = TaskRequest {
        inputs: vec![content_input("hi", &dest)],
        executors: vec![poiesis_core::test_support::exiting_executor(0, false)],
        ..TaskRequest::default()
    };
    let harness = Harness::with_task(request).await;
    harness
        .store
        .transition(&harness.task_id(), TaskState::Queued, TaskState::Canceling)
        .await
        .unwrap();
    let listener = harness.listen(Phase::InputFiler);

    let err = run(&harness.ctx, &router()).await.unwrap_err();
    assert!(matches!(err, WorkloadError::Canceled));
    assert_eq!(listener.await.unwrap().status, SignalStatus::Error);
    assert!(!dest.exists());
}
