// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Harness;
use poiesis_core::test_support::exiting_executor;
use poiesis_core::{SignalStatus, TaskRequest};
use poiesis_storage::TaskStore;

fn request_with_executors(executors: Vec<poiesis_core::Executor>) -> TaskRequest {
    TaskRequest { executors, ..TaskRequest::default() }
}

fn pod_name(harness: &Harness, index: usize) -> String {
    executor_pod_name(&harness.task_id(), index)
}

#[tokio::test]
async fn executors_run_in_order_and_logs_are_captured() {
    let harness = Harness::with_task(request_with_executors(vec![
        exiting_executor(0, false),
        exiting_executor(0, false),
    ]))
    .await;
    harness.cluster.script_pod_logs(&pod_name(&harness, 0), b"hi\n".to_vec());
    let listener = harness.listen(Phase::Executor);

    run(&harness.ctx).await.unwrap();

    assert!(listener.await.unwrap().is_ok());
    let task = harness.store.load(&harness.task_id()).await.unwrap();
    let log = task.current_log().unwrap();
    assert_eq!(log.logs.len(), 2);
    assert_eq!(log.logs[0].exit_code, Some(0));
    assert_eq!(log.logs[0].stdout.as_deref(), Some("hi\n"));
    assert!(log.logs[0].start_time.is_some());
    assert!(log.logs[0].end_time.is_some());
    assert!(log.system_logs.iter().any(|l| l == "all executors completed"));
    // Both pods were deleted after capture
    assert_eq!(harness.cluster.deleted_pods().len(), 2);
}

#[tokio::test]
async fn first_failure_stops_the_pipeline() {
    let harness = Harness::with_task(request_with_executors(vec![
        exiting_executor(1, false),
        exiting_executor(0, false),
    ]))
    .await;
    harness
        .cluster
        .script_pod_outcome(&pod_name(&harness, 0), poiesis_adapters::PodOutcome::failed(1));
    let listener = harness.listen(Phase::Executor);

    let err = run(&harness.ctx).await.unwrap_err();
    assert!(matches!(err, WorkloadError::ExecutorFailed { index: 0, exit_code: 1 }));

    let signal = listener.await.unwrap();
    assert_eq!(signal.status, SignalStatus::Error);
    assert!(signal.is_executor_failure());

    let task = harness.store.load(&harness.task_id()).await.unwrap();
    let log = task.current_log().unwrap();
    // Exactly one executor log; the second executor never launched
    assert_eq!(log.logs.len(), 1);
    assert_eq!(log.logs[0].exit_code, Some(1));
    assert_eq!(harness.cluster.pod_names(), Vec::<String>::new());
    assert_eq!(harness.cluster.deleted_pods(), vec![pod_name(&harness, 0)]);
}

#[tokio::test]
async fn ignore_error_continues_past_failure() {
    let harness = Harness::with_task(request_with_executors(vec![
        exiting_executor(1, true),
        exiting_executor(0, false),
    ]))
    .await;
    harness
        .cluster
        .script_pod_outcome(&pod_name(&harness, 0), poiesis_adapters::PodOutcome::failed(1));
    let listener = harness.listen(Phase::Executor);

    run(&harness.ctx).await.unwrap();

    assert!(listener.await.unwrap().is_ok());
    let task = harness.store.load(&harness.task_id()).await.unwrap();
    let log = task.current_log().unwrap();
    assert_eq!(log.logs.len(), 2);
    assert_eq!(log.logs[0].exit_code, Some(1));
    assert_eq!(log.logs[1].exit_code, Some(0));
    assert!(log.system_logs.iter().any(|l| l.contains("(ignored)")));
}

#[tokio::test]
async fn hung_executor_times_out_with_synthetic_exit() {
    let harness = Harness::with_task(request_with_executors(vec![exiting_executor(0, false)]))
        .await;
    harness.cluster.script_pod_hang(&pod_name(&harness, 0));
    let listener = harness.listen(Phase::Executor);

    let err = run(&harness.ctx).await.unwrap_err();
    assert!(matches!(
        err,
        WorkloadError::ExecutorFailed { index: 0, exit_code: TIMEOUT_EXIT_CODE }
    ));

    assert!(listener.await.unwrap().is_executor_failure());
    let task = harness.store.load(&harness.task_id()).await.unwrap();
    let log = task.current_log().unwrap();
    assert_eq!(log.logs[0].exit_code, Some(TIMEOUT_EXIT_CODE));
    assert!(log.system_logs.iter().any(|l| l.contains("timed out")));
    // The hung pod was deleted
    assert_eq!(harness.cluster.deleted_pods(), vec![pod_name(&harness, 0)]);
}

#[tokio::test]
async fn preempted_executor_publishes_preemption() {
    let harness = Harness::with_task(request_with_executors(vec![exiting_executor(0, false)]))
        .await;
    let mut outcome = poiesis_adapters::PodOutcome::failed(137);
    outcome.preempted = true;
    outcome.reason = Some("node reclaimed".to_string());
    harness.cluster.script_pod_outcome(&pod_name(&harness, 0), outcome);
    let listener = harness.listen(Phase::Executor);

    let err = run(&harness.ctx).await.unwrap_err();
    assert!(matches!(err, WorkloadError::Preempted(_)));
    assert!(listener.await.unwrap().is_preemption());
}

#[tokio::test]
async fn cancel_is_honored_at_the_step_boundary() {
    let harness = Harness::with_task(request_with_executors(vec![exiting_executor(0, false)]))
        .await;
    harness
        .store
        .transition(&harness.task_id(), TaskState::Queued, TaskState::Canceling)
        .await
        .unwrap();
    let listener = harness.listen(Phase::Executor);

    let err = run(&harness.ctx).await.unwrap_err();
    assert!(matches!(err, WorkloadError::Canceled));
    let signal = listener.await.unwrap();
    assert_eq!(signal.detail.as_deref(), Some("canceled"));
    // No executor ever launched
    assert!(harness.cluster.pod_names().is_empty());
    assert!(harness.cluster.deleted_pods().is_empty());
}

#[tokio::test]
async fn volumes_become_directories_before_execution() {
    let scratch = tempfile::tempdir().unwrap();
    let volume = scratch.path().join("workspace/deep");
    let mut request = request_with_executors(vec![exiting_executor(0, false)]);
    request.volumes.push(volume.to_string_lossy().into_owned());
    let harness = Harness::with_task(request).await;
    let listener = harness.listen(Phase::Executor);

    run(&harness.ctx).await.unwrap();
    assert!(listener.await.unwrap().is_ok());
    assert!(volume.is_dir());
}
