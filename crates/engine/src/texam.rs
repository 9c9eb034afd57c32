// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution and monitor (TExAM).
//!
//! Runs the task's executors strictly in order, one pod each, against
//! the shared volume. Each pod is watched to termination under the
//! monitor timeout; its logs land on the executor's `ExecutorLog`. The
//! first non-zero exit stops the pipeline unless that executor set
//! `ignore_error`.

use poiesis_adapters::{ClusterError, PodOutcome};
use poiesis_core::{
    channel, executor_pod_name, Clock, ExecutorLog, Phase, PhaseSignal, Task, TaskState,
};

use crate::launch;
use crate::{Ctx, WorkloadError, MAX_LOG_BYTES, TIMEOUT_EXIT_CODE};

/// Outcome of one executor step.
enum StepResult {
    Finished(ExecutorLog),
    Preempted(String),
}

pub async fn run<C: Clock>(ctx: &Ctx<C>) -> Result<(), WorkloadError> {
    let task = ctx.task().await?;
    let channel_name = channel(Phase::Executor, &ctx.task_id);

    if let Err(e) = prepare_volumes(&task).await {
        let detail = format!("volume preparation failed: {e}");
        ctx.system_log(&detail).await;
        ctx.bus.publish(&channel_name, &PhaseSignal::error(&detail)).await?;
        return Err(WorkloadError::System(detail));
    }

    for (index, executor) in task.executors.iter().enumerate() {
        // A cancel arriving mid-executor is honored at the next boundary
        if ctx.store.load(&ctx.task_id).await?.state == TaskState::Canceling {
            ctx.system_log(&format!("execution stopped before executor {index}: cancel requested"))
                .await;
            ctx.bus.publish(&channel_name, &PhaseSignal::error("canceled")).await?;
            return Err(WorkloadError::Canceled);
        }

        let result = match run_step(ctx, &task, index).await {
            Ok(result) => result,
            Err(e) => {
                let detail = format!("executor {index} could not be run: {e}");
                ctx.system_log(&detail).await;
                ctx.bus.publish(&channel_name, &PhaseSignal::error(&detail)).await?;
                return Err(e);
            }
        };

        match result {
            StepResult::Preempted(reason) => {
                ctx.system_log(&format!("executor {index} preempted: {reason}")).await;
                ctx.bus.publish(&channel_name, &PhaseSignal::preempted(&reason)).await?;
                return Err(WorkloadError::Preempted(reason));
            }
            StepResult::Finished(entry) => {
                let exit_code = entry.exit_code.unwrap_or(TIMEOUT_EXIT_CODE);
                ctx.store.append_executor_log(&ctx.task_id, entry).await?;
                if exit_code != 0 && !executor.ignores_error() {
                    ctx.system_log(&format!("executor {index} exited with code {exit_code}"))
                        .await;
                    ctx.bus
                        .publish(&channel_name, &PhaseSignal::executor_error(index, exit_code))
                        .await?;
                    return Err(WorkloadError::ExecutorFailed { index, exit_code });
                }
                if exit_code != 0 {
                    ctx.system_log(&format!(
                        "executor {index} exited with code {exit_code} (ignored)"
                    ))
                    .await;
                }
            }
        }
    }

    ctx.system_log("all executors completed").await;
    ctx.bus.publish(&channel_name, &PhaseSignal::ok()).await?;
    tracing::info!(task_id = %ctx.task_id, executors = task.executors.len(), "execution complete");
    Ok(())
}

/// Declared volumes become empty directories on the shared volume
/// before the first executor starts.
async fn prepare_volumes(task: &Task) -> Result<(), std::io::Error> {
    for volume in &task.volumes {
        tokio::fs::create_dir_all(volume).await?;
    }
    Ok(())
}

/// Launch executor `index`'s pod, watch it to termination, capture its
/// logs, and delete it.
async fn run_step<C: Clock>(
    ctx: &Ctx<C>,
    task: &Task,
    index: usize,
) -> Result<StepResult, WorkloadError> {
    let pod_name = executor_pod_name(&ctx.task_id, index);
    let spec = launch::executor_pod(&ctx.config, task, index);

    match ctx.cluster.create_pod(&spec).await {
        // A leftover pod from a crashed attempt: adopt it
        Ok(()) | Err(ClusterError::Conflict(_)) => {}
        Err(e) => return Err(e.into()),
    }
    tracing::info!(task_id = %ctx.task_id, index, image = %spec.image, "executor pod launched");

    let started_fallback = ctx.clock.rfc3339();
    match ctx.cluster.watch_pod(&pod_name, ctx.config.monitor_timeout).await {
        Ok(outcome) => {
            if outcome.preempted {
                let reason =
                    outcome.reason.clone().unwrap_or_else(|| "node reclaimed".to_string());
                ctx.cluster.delete_pod(&pod_name).await.ok();
                return Ok(StepResult::Preempted(reason));
            }
            let entry = capture_log(ctx, &pod_name, &outcome, started_fallback).await;
            ctx.cluster.delete_pod(&pod_name).await.ok();
            Ok(StepResult::Finished(entry))
        }
        Err(ClusterError::Timeout(_)) => {
            ctx.system_log(&format!("executor {index} timed out")).await;
            ctx.cluster.delete_pod(&pod_name).await.ok();
            Ok(StepResult::Finished(ExecutorLog {
                start_time: Some(started_fallback),
                end_time: Some(ctx.clock.rfc3339()),
                stdout: None,
                stderr: None,
                exit_code: Some(TIMEOUT_EXIT_CODE),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

async fn capture_log<C: Clock>(
    ctx: &Ctx<C>,
    pod_name: &str,
    outcome: &PodOutcome,
    started_fallback: String,
) -> ExecutorLog {
    let stdout = match ctx.cluster.stream_pod_logs(pod_name, MAX_LOG_BYTES).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::warn!(%pod_name, error = %e, "failed to capture executor logs");
            None
        }
    };
    ExecutorLog {
        start_time: outcome.started_at.clone().or(Some(started_fallback)),
        end_time: outcome.finished_at.clone().or_else(|| Some(ctx.clock.rfc3339())),
        stdout,
        stderr: (outcome.exit_code != 0).then(|| outcome.reason.clone()).flatten(),
        exit_code: Some(outcome.exit_code),
    }
}

#[cfg(test)]
#[path = "texam_tests.rs"]
mod tests;
