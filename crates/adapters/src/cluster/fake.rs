// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted cluster driver for engine tests.
//!
//! Records every create/delete and resolves pod watches from a table of
//! scripted outcomes. Pods with no script succeed with exit code 0.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::spec::{PodOutcome, PvcSpec, WorkloadSpec};
use super::{ClusterDriver, ClusterError, TASK_ID_LABEL};

#[derive(Default)]
struct FakeState {
    pvcs: HashMap<String, PvcSpec>,
    jobs: HashMap<String, WorkloadSpec>,
    pods: HashMap<String, WorkloadSpec>,
    outcomes: HashMap<String, PodOutcome>,
    logs: HashMap<String, Vec<u8>>,
    /// Pods that never reach a terminal phase (timeout scenarios).
    hung_pods: Vec<String>,
    /// Errors returned by upcoming `create_job` calls, in order.
    job_create_failures: Vec<ClusterError>,
    deleted_pvcs: Vec<String>,
    deleted_jobs: Vec<String>,
    deleted_pods: Vec<String>,
    created_pods: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ───────────────────────────────────────────────────────

    pub fn script_pod_outcome(&self, pod: &str, outcome: PodOutcome) {
        self.state.lock().outcomes.insert(pod.to_string(), outcome);
    }

    pub fn script_pod_logs(&self, pod: &str, logs: impl Into<Vec<u8>>) {
        self.state.lock().logs.insert(pod.to_string(), logs.into());
    }

    /// Make `pod` hang in `Running` until the watcher gives up.
    pub fn script_pod_hang(&self, pod: &str) {
        self.state.lock().hung_pods.push(pod.to_string());
    }

    /// Fail the next `create_job` call with `error`.
    pub fn script_job_create_failure(&self, error: ClusterError) {
        self.state.lock().job_create_failures.push(error);
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn pvc_exists(&self, name: &str) -> bool {
        self.state.lock().pvcs.contains_key(name)
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().jobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn job_spec(&self, name: &str) -> Option<WorkloadSpec> {
        self.state.lock().jobs.get(name).cloned()
    }

    pub fn pod_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().pods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pod_spec(&self, name: &str) -> Option<WorkloadSpec> {
        self.state.lock().pods.get(name).cloned()
    }

    pub fn deleted_pvcs(&self) -> Vec<String> {
        self.state.lock().deleted_pvcs.clone()
    }

    pub fn deleted_jobs(&self) -> Vec<String> {
        self.state.lock().deleted_jobs.clone()
    }

    pub fn deleted_pods(&self) -> Vec<String> {
        self.state.lock().deleted_pods.clone()
    }

    /// Every pod ever created, in creation order (deletion does not
    /// remove entries).
    pub fn created_pods(&self) -> Vec<String> {
        self.state.lock().created_pods.clone()
    }

    /// No live (created and not yet deleted) phase Jobs or PVCs remain.
    /// Orchestrator Jobs don't count: the cluster's TTL reaps those.
    pub fn is_swept(&self) -> bool {
        let state = self.state.lock();
        state.pvcs.is_empty() && state.jobs.keys().all(|name| name.starts_with("torc-"))
    }
}

#[async_trait]
impl ClusterDriver for FakeCluster {
    async fn create_pvc(&self, spec: &PvcSpec) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if state.pvcs.contains_key(&spec.name) {
            return Err(ClusterError::Conflict(spec.name.clone()));
        }
        state.pvcs.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn delete_pvc(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.pvcs.remove(name);
        state.deleted_pvcs.push(name.to_string());
        Ok(())
    }

    async fn create_job(&self, spec: &WorkloadSpec) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if !state.job_create_failures.is_empty() {
            return Err(state.job_create_failures.remove(0));
        }
        if state.jobs.contains_key(&spec.name) {
            return Err(ClusterError::Conflict(spec.name.clone()));
        }
        state.jobs.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn delete_job(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.jobs.remove(name);
        state.deleted_jobs.push(name.to_string());
        Ok(())
    }

    async fn delete_task_jobs(&self, task_id: &str, except: &str) -> Result<(), ClusterError> {
        let names: Vec<String> = {
            let state = self.state.lock();
            state
                .jobs
                .iter()
                .filter(|(name, spec)| {
                    name.as_str() != except
                        && spec.labels.iter().any(|(k, v)| k == TASK_ID_LABEL && v == task_id)
                })
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in names {
            self.delete_job(&name).await?;
        }
        Ok(())
    }

    async fn create_pod(&self, spec: &WorkloadSpec) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if state.pods.contains_key(&spec.name) {
            return Err(ClusterError::Conflict(spec.name.clone()));
        }
        state.created_pods.push(spec.name.clone());
        state.pods.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.pods.remove(name);
        state.deleted_pods.push(name.to_string());
        Ok(())
    }

    async fn watch_pod(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<PodOutcome, ClusterError> {
        let hung = {
            let state = self.state.lock();
            if !state.pods.contains_key(name) && !state.outcomes.contains_key(name) {
                return Err(ClusterError::NotFound(name.to_string()));
            }
            state.hung_pods.iter().any(|p| p == name)
        };
        if hung {
            match timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    return Err(ClusterError::Timeout(name.to_string()));
                }
                None => std::future::pending::<()>().await,
            }
        }
        let outcome = self.state.lock().outcomes.get(name).cloned();
        Ok(outcome.unwrap_or_else(PodOutcome::succeeded))
    }

    async fn stream_pod_logs(
        &self,
        name: &str,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ClusterError> {
        let mut logs = self.state.lock().logs.get(name).cloned().unwrap_or_default();
        logs.truncate(max_bytes);
        Ok(logs)
    }

    async fn find_job_pod(&self, job_name: &str) -> Result<Option<String>, ClusterError> {
        let state = self.state.lock();
        Ok(state.jobs.contains_key(job_name).then(|| format!("{job_name}-pod")))
    }
}
