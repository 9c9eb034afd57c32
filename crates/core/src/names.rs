// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic cluster resource and bus channel names.
//!
//! Every name derives from the task id so that any workload (or a crash
//! recovery sweep) can reconstruct it without shared state. Kubernetes
//! object names must be lowercase DNS labels of at most 63 characters.

use crate::id::TaskId;

/// Kubernetes object-name length limit.
pub const MAX_NAME_LEN: usize = 63;

/// The three phase workloads plus the per-task orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Orchestrator,
    InputFiler,
    Executor,
    OutputFiler,
}

crate::simple_display! {
    Phase {
        Orchestrator => "torc",
        InputFiler => "tif",
        Executor => "texam",
        OutputFiler => "tof",
    }
}

impl Phase {
    /// Bus channel this phase publishes its completion signal on.
    /// The orchestrator is the subscriber; it publishes nothing.
    pub fn channel(self, id: &TaskId) -> String {
        match self {
            Phase::Orchestrator => format!("task/{}/torc", id),
            Phase::InputFiler => format!("task/{}/filer/input", id),
            Phase::Executor => format!("task/{}/texam", id),
            Phase::OutputFiler => format!("task/{}/filer/output", id),
        }
    }
}

/// Bus channel for a phase of a task.
pub fn channel(phase: Phase, id: &TaskId) -> String {
    phase.channel(id)
}

/// Name of the task's one shared volume claim.
pub fn pvc_name(id: &TaskId) -> String {
    clamp(format!("pvc-{}", id.suffix()))
}

/// Name of a phase's Job.
pub fn job_name(phase: Phase, id: &TaskId) -> String {
    clamp(format!("{}-{}", phase, id.suffix()))
}

/// Name of the pod running executor `index`.
pub fn executor_pod_name(id: &TaskId, index: usize) -> String {
    clamp(format!("texam-{}-{}", id.suffix(), index))
}

fn clamp(name: String) -> String {
    let name = name.to_ascii_lowercase();
    if name.len() <= MAX_NAME_LEN {
        name
    } else {
        name.chars().take(MAX_NAME_LEN).collect()
    }
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
