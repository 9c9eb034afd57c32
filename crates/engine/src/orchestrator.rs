// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-task orchestrator (TOrc).
//!
//! Claims the task with a CAS, provisions the volume, launches each
//! phase workload in order, and waits for its completion signal with a
//! bounded bus subscribe. A missed or late signal falls back to cluster
//! inspection, so the bus can vanish entirely without wedging a task.
//! Every exit path deletes the task's child Jobs and PVC.

use poiesis_adapters::{with_backoff, Backoff, ClusterError, PodPhase, PvcSpec};
use poiesis_core::{
    channel, executor_pod_name, job_name, pvc_name, Clock, Phase, PhaseSignal, Task, TaskState,
};
use poiesis_storage::StorageError;
use std::time::Duration;

use crate::launch;
use crate::{Ctx, WorkloadError};

/// How long the reconcile path watches a phase pod after a bus timeout.
const RECONCILE_WATCH: Duration = Duration::from_secs(10);

/// Drive one task from `QUEUED` to a terminal state. Returns the
/// terminal state it left the task in.
pub async fn run<C: Clock>(ctx: &Ctx<C>) -> Result<TaskState, WorkloadError> {
    let task = ctx.task().await?;

    // Claim the initialization phase. Losing the race means another
    // attempt owns this task (or it is already past QUEUED): not an error.
    match ctx.store.transition(&ctx.task_id, TaskState::Queued, TaskState::Initializing).await {
        Ok(()) => {}
        Err(StorageError::Conflict(_)) => {
            let state = ctx.task().await?.state;
            if state == TaskState::Canceling {
                return finish_cancel(ctx, &task).await;
            }
            tracing::info!(task_id = %ctx.task_id, %state, "task already claimed, exiting");
            return Ok(state);
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(task_id = %ctx.task_id, "orchestrating task");

    provision_volume(ctx, &task).await?;
    ctx.store.set_start_time(&ctx.task_id, &ctx.clock.rfc3339()).await?;

    // ── Input phase ─────────────────────────────────────────────────────
    if !task.inputs.is_empty() {
        if ctx.cancel_requested().await? {
            return finish_cancel(ctx, &task).await;
        }
        launch_job(ctx, launch::filer_job(&ctx.config, &task, Phase::InputFiler)).await?;
        let signal = wait_for_phase(ctx, Phase::InputFiler).await?;
        if !signal.is_ok() {
            let to = if signal.is_preemption() {
                TaskState::Preempted
            } else {
                TaskState::SystemError
            };
            return fail(ctx, &task, TaskState::Initializing, to, &signal.detail_or("input staging failed")).await;
        }
    } else {
        ctx.system_log("no inputs to stage").await;
    }

    if let Some(state) = advance(ctx, &task, TaskState::Initializing, TaskState::Running).await? {
        return Ok(state);
    }

    // ── Execution phase ─────────────────────────────────────────────────
    if ctx.cancel_requested().await? {
        return finish_cancel(ctx, &task).await;
    }
    launch_job(ctx, launch::texam_job(&ctx.config, &task)).await?;
    let signal = wait_for_phase(ctx, Phase::Executor).await?;
    if !signal.is_ok() {
        let to = if signal.is_executor_failure() {
            TaskState::ExecutorError
        } else if signal.is_preemption() {
            TaskState::Preempted
        } else {
            TaskState::SystemError
        };
        return fail(ctx, &task, TaskState::Running, to, &signal.detail_or("execution failed")).await;
    }

    // ── Output phase ────────────────────────────────────────────────────
    if !task.outputs.is_empty() {
        if ctx.cancel_requested().await? {
            return finish_cancel(ctx, &task).await;
        }
        launch_job(ctx, launch::filer_job(&ctx.config, &task, Phase::OutputFiler)).await?;
        let signal = wait_for_phase(ctx, Phase::OutputFiler).await?;
        if !signal.is_ok() {
            return fail(ctx, &task, TaskState::Running, TaskState::SystemError, &signal.detail_or("output collection failed")).await;
        }
    }

    if let Some(state) = advance(ctx, &task, TaskState::Running, TaskState::Complete).await? {
        return Ok(state);
    }
    ctx.system_log("task complete").await;
    ctx.store.set_end_time(&ctx.task_id, &ctx.clock.rfc3339()).await?;
    cleanup(ctx, &task).await;
    tracing::info!(task_id = %ctx.task_id, "task complete");
    Ok(TaskState::Complete)
}

/// Create the task volume; a conflict means a previous attempt already
/// provisioned it.
async fn provision_volume<C: Clock>(ctx: &Ctx<C>, task: &Task) -> Result<(), WorkloadError> {
    let spec = PvcSpec {
        name: pvc_name(&ctx.task_id),
        access_mode: ctx.config.pvc_access_mode.clone(),
        storage_class: ctx.config.pvc_storage_class.clone(),
        size_gb: task.resources.as_ref().and_then(|r| r.disk_gb).unwrap_or(1.0),
        labels: vec![("poiesis.io/task-id".to_string(), ctx.task_id.as_str().to_string())],
    };
    let result = with_backoff(
        Backoff::default(),
        "create-pvc",
        |e: &ClusterError| matches!(e, ClusterError::Unavailable(_)),
        || async { ctx.cluster.create_pvc(&spec).await },
    )
    .await;
    match result {
        Ok(()) | Err(ClusterError::Conflict(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Launch a child Job; a name conflict means it already exists from a
/// previous attempt and the wait path takes over.
async fn launch_job<C: Clock>(
    ctx: &Ctx<C>,
    spec: poiesis_adapters::WorkloadSpec,
) -> Result<(), WorkloadError> {
    match ctx.cluster.create_job(&spec).await {
        Ok(()) | Err(ClusterError::Conflict(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Wait for a phase's completion signal, reconciling against the
/// cluster when the bus stays silent.
async fn wait_for_phase<C: Clock>(
    ctx: &Ctx<C>,
    phase: Phase,
) -> Result<PhaseSignal, WorkloadError> {
    let channel_name = channel(phase, &ctx.task_id);
    match ctx.bus.subscribe(&channel_name, ctx.config.monitor_timeout).await {
        Ok(signal) => Ok(signal),
        Err(e) => {
            tracing::warn!(task_id = %ctx.task_id, %phase, error = %e, "bus wait unresolved, reconciling from cluster");
            reconcile_phase(ctx, phase).await
        }
    }
}

/// Derive a phase outcome from its pod when no signal arrived.
async fn reconcile_phase<C: Clock>(
    ctx: &Ctx<C>,
    phase: Phase,
) -> Result<PhaseSignal, WorkloadError> {
    let job = job_name(phase, &ctx.task_id);
    let pod = match ctx.cluster.find_job_pod(&job).await {
        Ok(Some(pod)) => pod,
        Ok(None) => {
            return Ok(PhaseSignal::error(format!("{phase} pod never appeared")));
        }
        Err(e) => return Ok(PhaseSignal::error(format!("{phase} reconcile failed: {e}"))),
    };
    match ctx.cluster.watch_pod(&pod, Some(RECONCILE_WATCH)).await {
        Ok(outcome) if outcome.phase == PodPhase::Succeeded => Ok(PhaseSignal::ok()),
        Ok(outcome) if outcome.preempted => {
            Ok(PhaseSignal::preempted(outcome.reason.unwrap_or_else(|| "node reclaimed".to_string())))
        }
        Ok(outcome) => Ok(PhaseSignal::error(format!(
            "{phase} pod failed with exit code {}",
            outcome.exit_code
        ))),
        Err(ClusterError::Timeout(_)) => {
            Ok(PhaseSignal::error(format!("{phase} exceeded the monitor timeout")))
        }
        Err(e) => Ok(PhaseSignal::error(format!("{phase} reconcile failed: {e}"))),
    }
}

/// Advance the task's state, routing to the cancel path if a cancel
/// request won the race. Returns the terminal state when it did.
async fn advance<C: Clock>(
    ctx: &Ctx<C>,
    task: &Task,
    from: TaskState,
    to: TaskState,
) -> Result<Option<TaskState>, WorkloadError> {
    match ctx.transition(from, to).await {
        Ok(()) => Ok(None),
        Err(e) => {
            if ctx.task().await?.state == TaskState::Canceling {
                return finish_cancel(ctx, task).await.map(Some);
            }
            Err(e)
        }
    }
}

/// Persist a failure and tear the task's resources down.
async fn fail<C: Clock>(
    ctx: &Ctx<C>,
    task: &Task,
    from: TaskState,
    to: TaskState,
    detail: &str,
) -> Result<TaskState, WorkloadError> {
    // Cancel may have raced the failure; the cancel path wins.
    if let Err(e) = ctx.transition(from, to).await {
        let current = ctx.task().await?.state;
        if current == TaskState::Canceling {
            return finish_cancel(ctx, task).await;
        }
        tracing::warn!(task_id = %ctx.task_id, error = %e, "failure transition rejected");
    }
    ctx.system_log(detail).await;
    ctx.store.set_end_time(&ctx.task_id, &ctx.clock.rfc3339()).await?;
    cleanup(ctx, task).await;
    tracing::warn!(task_id = %ctx.task_id, %to, detail, "task failed");
    Ok(to)
}

/// Complete a `CANCELING -> CANCELED` transition after child resources
/// are gone.
async fn finish_cancel<C: Clock>(ctx: &Ctx<C>, task: &Task) -> Result<TaskState, WorkloadError> {
    cleanup(ctx, task).await;
    ctx.transition(TaskState::Canceling, TaskState::Canceled).await?;
    ctx.system_log("task canceled").await;
    ctx.store.set_end_time(&ctx.task_id, &ctx.clock.rfc3339()).await?;
    tracing::info!(task_id = %ctx.task_id, "task canceled");
    Ok(TaskState::Canceled)
}

/// Best-effort teardown of everything the task owns except the
/// orchestrator's own Job (the TTL reaps that).
async fn cleanup<C: Clock>(ctx: &Ctx<C>, task: &Task) {
    for phase in [Phase::InputFiler, Phase::Executor, Phase::OutputFiler] {
        if let Err(e) = ctx.cluster.delete_job(&job_name(phase, &ctx.task_id)).await {
            tracing::warn!(task_id = %ctx.task_id, %phase, error = %e, "failed to delete child Job");
        }
    }
    for index in 0..task.executors.len() {
        let pod = executor_pod_name(&ctx.task_id, index);
        if let Err(e) = ctx.cluster.delete_pod(&pod).await {
            tracing::warn!(task_id = %ctx.task_id, %pod, error = %e, "failed to delete executor pod");
        }
    }
    // Safety net for children this attempt does not know about
    let own_job = job_name(Phase::Orchestrator, &ctx.task_id);
    if let Err(e) = ctx.cluster.delete_task_jobs(ctx.task_id.as_str(), &own_job).await {
        tracing::warn!(task_id = %ctx.task_id, error = %e, "task Job sweep failed");
    }
    if let Err(e) = ctx.cluster.delete_pvc(&pvc_name(&ctx.task_id)).await {
        tracing::warn!(task_id = %ctx.task_id, error = %e, "failed to delete PVC");
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
