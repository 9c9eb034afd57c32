// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes driver over kube-rs.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams, PropagationPolicy};
use kube::Client;

use super::build::{build_job, build_pod, build_pvc};
use super::spec::{PodOutcome, PodPhase, PvcSpec, WorkloadSpec};
use super::{ClusterDriver, ClusterError, TASK_ID_LABEL};
use crate::retry::{with_backoff, Backoff};

/// How often terminal-phase polling re-reads the pod.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct KubeDriver {
    pvcs: Api<PersistentVolumeClaim>,
    jobs: Api<Job>,
    pods: Api<Pod>,
    namespace: String,
}

impl KubeDriver {
    /// Connect with in-cluster (or kubeconfig) credentials, scoped to
    /// one namespace.
    pub async fn connect(namespace: &str) -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Unavailable(format!("failed to create kube client: {e}")))?;
        Ok(Self::with_client(client, namespace))
    }

    pub fn with_client(client: Client, namespace: &str) -> Self {
        Self {
            pvcs: Api::namespaced(client.clone(), namespace),
            jobs: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }

    fn map_err(e: kube::Error) -> ClusterError {
        match e {
            kube::Error::Api(ref response) if response.code == 404 => {
                ClusterError::NotFound(response.message.clone())
            }
            kube::Error::Api(ref response) if response.code == 409 => {
                ClusterError::Conflict(response.message.clone())
            }
            other => ClusterError::Unavailable(other.to_string()),
        }
    }

    /// Tolerate deletion of already-absent resources.
    fn absorb_absent(result: Result<(), ClusterError>) -> Result<(), ClusterError> {
        match result {
            Err(ClusterError::NotFound(_)) => Ok(()),
            other => other,
        }
    }
}

#[async_trait]
impl ClusterDriver for KubeDriver {
    async fn create_pvc(&self, spec: &PvcSpec) -> Result<(), ClusterError> {
        tracing::info!(name = %spec.name, namespace = %self.namespace, size = %spec.size_quantity(), "creating PVC");
        self.pvcs
            .create(&PostParams::default(), &build_pvc(spec))
            .await
            .map(|_| ())
            .map_err(Self::map_err)
    }

    async fn delete_pvc(&self, name: &str) -> Result<(), ClusterError> {
        tracing::info!(%name, "deleting PVC");
        Self::absorb_absent(
            self.pvcs
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ())
                .map_err(Self::map_err),
        )
    }

    async fn create_job(&self, spec: &WorkloadSpec) -> Result<(), ClusterError> {
        tracing::info!(name = %spec.name, image = %spec.image, "creating Job");
        self.jobs
            .create(&PostParams::default(), &build_job(spec))
            .await
            .map(|_| ())
            .map_err(Self::map_err)
    }

    async fn delete_job(&self, name: &str) -> Result<(), ClusterError> {
        tracing::info!(%name, "deleting Job");
        let dp = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..DeleteParams::default()
        };
        Self::absorb_absent(
            self.jobs.delete(name, &dp).await.map(|_| ()).map_err(Self::map_err),
        )
    }

    async fn delete_task_jobs(&self, task_id: &str, except: &str) -> Result<(), ClusterError> {
        let lp = ListParams::default().labels(&format!("{TASK_ID_LABEL}={task_id}"));
        let list = self.jobs.list(&lp).await.map_err(Self::map_err)?;
        for job in list {
            let Some(name) = job.metadata.name else { continue };
            if name == except {
                continue;
            }
            tracing::info!(%name, %task_id, "deleting task Job");
            if let Err(e) = self.delete_job(&name).await {
                tracing::warn!(%name, error = %e, "failed to delete task Job");
            }
        }
        Ok(())
    }

    async fn create_pod(&self, spec: &WorkloadSpec) -> Result<(), ClusterError> {
        tracing::info!(name = %spec.name, image = %spec.image, "creating pod");
        self.pods
            .create(&PostParams::default(), &build_pod(spec))
            .await
            .map(|_| ())
            .map_err(Self::map_err)
    }

    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError> {
        tracing::info!(%name, "deleting pod");
        Self::absorb_absent(
            self.pods
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ())
                .map_err(Self::map_err),
        )
    }

    async fn watch_pod(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<PodOutcome, ClusterError> {
        let started = tokio::time::Instant::now();
        loop {
            let pod = self.pods.get(name).await.map_err(Self::map_err)?;
            if let Some(outcome) = terminal_outcome(&pod) {
                tracing::debug!(%name, phase = ?outcome.phase, exit_code = outcome.exit_code, "pod terminal");
                return Ok(outcome);
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(ClusterError::Timeout(name.to_string()));
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn stream_pod_logs(
        &self,
        name: &str,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ClusterError> {
        let params = LogParams { limit_bytes: Some(max_bytes as i64), ..LogParams::default() };
        // The log endpoint drops connections on kubelet restarts; one
        // bounded retry covers the common case.
        let text = with_backoff(
            Backoff::default(),
            "pod-logs",
            |e: &ClusterError| matches!(e, ClusterError::Unavailable(_)),
            || async { self.pods.logs(name, &params).await.map_err(Self::map_err) },
        )
        .await?;
        Ok(text.into_bytes())
    }

    async fn find_job_pod(&self, job_name: &str) -> Result<Option<String>, ClusterError> {
        let lp = ListParams::default().labels(&format!("job-name={job_name}"));
        let list = self.pods.list(&lp).await.map_err(Self::map_err)?;
        Ok(list.into_iter().find_map(|p| p.metadata.name))
    }
}

/// Extract the terminal outcome from a pod, if it has one.
fn terminal_outcome(pod: &Pod) -> Option<PodOutcome> {
    let status = pod.status.as_ref()?;
    let phase = match status.phase.as_deref() {
        Some("Succeeded") => PodPhase::Succeeded,
        Some("Failed") => PodPhase::Failed,
        _ => return None,
    };

    let terminated = status
        .container_statuses
        .as_ref()
        .and_then(|cs| cs.first())
        .and_then(|c| c.state.as_ref())
        .and_then(|s| s.terminated.as_ref());

    let exit_code = terminated.map(|t| t.exit_code).unwrap_or(match phase {
        PodPhase::Succeeded => 0,
        PodPhase::Failed => 1,
    });

    let preempted = status.reason.as_deref() == Some("Preempted")
        || status
            .conditions
            .as_ref()
            .is_some_and(|conditions| {
                conditions.iter().any(|c| c.type_ == "DisruptionTarget" && c.status == "True")
            });

    Some(PodOutcome {
        phase,
        exit_code,
        reason: status.reason.clone().or_else(|| terminated.and_then(|t| t.reason.clone())),
        preempted,
        started_at: terminated.and_then(|t| t.started_at.as_ref()).map(|t| t.0.to_rfc3339()),
        finished_at: terminated.and_then(|t| t.finished_at.as_ref()).map(|t| t.0.to_rfc3339()),
    })
}
