// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator-agnostic workload descriptions.

/// Whether a [`WorkloadSpec`] materializes as a one-shot Job or a bare pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkloadKind {
    #[default]
    Job,
    Pod,
}

/// A sub-path mount of the task volume into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    /// Directory inside the claim.
    pub sub_path: String,
    /// Absolute path inside the container.
    pub mount_path: String,
    pub read_only: bool,
}

/// Reference to a Secret injected via `envFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEnvSpec {
    pub name: String,
}

/// Requested compute for an executor container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceRequest {
    pub cpu_cores: Option<i32>,
    pub ram_gb: Option<f64>,
}

/// A one-shot workload: image, command, environment, volume mounts.
#[derive(Debug, Clone, Default)]
pub struct WorkloadSpec {
    pub name: String,
    pub kind: WorkloadKind,
    pub image: String,
    pub command: Vec<String>,
    pub workdir: Option<String>,
    pub env: Vec<(String, String)>,
    /// ConfigMaps injected wholesale via `envFrom`.
    pub env_from_configmaps: Vec<String>,
    /// Secrets injected wholesale via `envFrom`.
    pub env_from_secrets: Vec<SecretEnvSpec>,
    /// Claim mounted (by sub-path) into the container.
    pub pvc: Option<String>,
    pub mounts: Vec<MountSpec>,
    /// `(configmap, mount_path)` read-only file mounts.
    pub config_mounts: Vec<(String, String)>,
    pub service_account: Option<String>,
    pub restart_policy: String,
    pub ttl_seconds: Option<i32>,
    pub image_pull_policy: Option<String>,
    pub labels: Vec<(String, String)>,
    /// Apply the restricted security context.
    pub hardened: bool,
    pub resources: Option<ResourceRequest>,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command,
            restart_policy: "Never".to_string(),
            ..Self::default()
        }
    }

    poiesis_core::setters! {
        into {
            restart_policy: String,
        }
        set {
            kind: WorkloadKind,
            env: Vec<(String, String)>,
            env_from_configmaps: Vec<String>,
            env_from_secrets: Vec<SecretEnvSpec>,
            mounts: Vec<MountSpec>,
            config_mounts: Vec<(String, String)>,
            labels: Vec<(String, String)>,
            hardened: bool,
        }
        option {
            workdir: String,
            pvc: String,
            service_account: String,
            ttl_seconds: i32,
            image_pull_policy: String,
            resources: ResourceRequest,
        }
    }
}

/// Volume claim parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PvcSpec {
    pub name: String,
    pub access_mode: String,
    pub storage_class: Option<String>,
    pub size_gb: f64,
    pub labels: Vec<(String, String)>,
}

impl PvcSpec {
    /// Kubernetes quantity string for the requested size.
    pub fn size_quantity(&self) -> String {
        // Fractional gigabytes are expressed in Mi to stay integral.
        if self.size_gb.fract() == 0.0 {
            format!("{}Gi", self.size_gb as i64)
        } else {
            format!("{}Mi", (self.size_gb * 1024.0).ceil() as i64)
        }
    }
}

/// Terminal pod phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Succeeded,
    Failed,
}

/// Result of watching a pod to termination.
#[derive(Debug, Clone, PartialEq)]
pub struct PodOutcome {
    pub phase: PodPhase,
    pub exit_code: i32,
    pub reason: Option<String>,
    /// The cluster reclaimed the node out from under the pod.
    pub preempted: bool,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl PodOutcome {
    pub fn succeeded() -> Self {
        Self {
            phase: PodPhase::Succeeded,
            exit_code: 0,
            reason: None,
            preempted: false,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn failed(exit_code: i32) -> Self {
        Self {
            phase: PodPhase::Failed,
            exit_code,
            reason: None,
            preempted: false,
            started_at: None,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        whole      = { 1.0, "1Gi" },
        large      = { 100.0, "100Gi" },
        fractional = { 1.5, "1536Mi" },
        small      = { 0.25, "256Mi" },
    )]
    fn pvc_size_quantity(gb: f64, expected: &str) {
        let spec = PvcSpec {
            name: "pvc-x".to_string(),
            access_mode: "ReadWriteOnce".to_string(),
            storage_class: None,
            size_gb: gb,
            labels: Vec::new(),
        };
        assert_eq!(spec.size_quantity(), expected);
    }

    #[test]
    fn workload_spec_setters_chain() {
        let spec = WorkloadSpec::new("tif-abc", "poiesis:latest", vec!["poiesis".to_string()])
            .kind(WorkloadKind::Job)
            .pvc("pvc-abc")
            .service_account("poiesis-sa")
            .ttl_seconds(300)
            .hardened(true);
        assert_eq!(spec.restart_policy, "Never");
        assert_eq!(spec.pvc.as_deref(), Some("pvc-abc"));
        assert!(spec.hardened);
    }
}
