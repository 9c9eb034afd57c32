// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster driver — the operations the engine needs from the container
//! orchestrator, independent of which one it is.
//!
//! # Module layout
//!
//! - [`spec`] — orchestrator-agnostic workload/volume descriptions
//! - [`build`] — Kubernetes object construction from those descriptions
//! - [`kube`] — the kube-rs driver
//! - [`fake`] — scripted driver for tests (`test-support`)

mod build;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod kube;
mod spec;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCluster;
pub use kube::KubeDriver;
pub use spec::{
    MountSpec, PodOutcome, PodPhase, PvcSpec, ResourceRequest, SecretEnvSpec, WorkloadKind,
    WorkloadSpec,
};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Label stamped on every resource the engine creates.
pub const MANAGED_BY_LABEL: (&str, &str) = ("app.kubernetes.io/managed-by", "poiesis");
/// Label carrying the owning task id; the cleanup sweep selects on it.
pub const TASK_ID_LABEL: &str = "poiesis.io/task-id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// A resource with the deterministic name already exists.
    #[error("resource conflict: {0}")]
    Conflict(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("timed out watching {0}")]
    Timeout(String),
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// Operations the engine needs from the cluster, all scoped to a single
/// namespace. Deletes of absent resources succeed.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    async fn create_pvc(&self, spec: &PvcSpec) -> Result<(), ClusterError>;

    async fn delete_pvc(&self, name: &str) -> Result<(), ClusterError>;

    async fn create_job(&self, spec: &WorkloadSpec) -> Result<(), ClusterError>;

    /// Delete a Job and cascade to its pods.
    async fn delete_job(&self, name: &str) -> Result<(), ClusterError>;

    /// Delete every Job labelled with the given task id except the named
    /// one (the caller's own Job). Covers children a crashed orchestrator
    /// launched but no longer remembers.
    async fn delete_task_jobs(&self, task_id: &str, except: &str) -> Result<(), ClusterError>;

    async fn create_pod(&self, spec: &WorkloadSpec) -> Result<(), ClusterError>;

    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError>;

    /// Block until the pod reaches `Succeeded` or `Failed`, or until
    /// `timeout` elapses (`None` waits forever).
    async fn watch_pod(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<PodOutcome, ClusterError>;

    /// Drain the pod's log stream, reconnecting on transient failures,
    /// returning at most `max_bytes` bytes.
    async fn stream_pod_logs(&self, name: &str, max_bytes: usize)
        -> Result<Vec<u8>, ClusterError>;

    /// Name of the pod a Job spawned, if it exists yet.
    async fn find_job_pod(&self, job_name: &str) -> Result<Option<String>, ClusterError>;
}
