// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes object construction from workload descriptions.

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, ConfigMapVolumeSource, Container, EnvFromSource, EnvVar,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, Pod,
    PodSecurityContext, PodSpec, PodTemplateSpec, ResourceRequirements, SeccompProfile,
    SecretEnvSource, SecurityContext, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use super::spec::{PvcSpec, WorkloadSpec};
use super::MANAGED_BY_LABEL;

const TASK_VOLUME: &str = "task-volume";

fn labels_of(extra: &[(String, String)]) -> BTreeMap<String, String> {
    let mut labels: BTreeMap<String, String> =
        [(MANAGED_BY_LABEL.0.to_string(), MANAGED_BY_LABEL.1.to_string())].into_iter().collect();
    for (k, v) in extra {
        labels.insert(k.clone(), v.clone());
    }
    labels
}

fn metadata(name: &str, labels: &[(String, String)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        labels: Some(labels_of(labels)),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}

fn container(spec: &WorkloadSpec) -> Container {
    let mut volume_mounts = Vec::new();
    if spec.pvc.is_some() {
        for mount in &spec.mounts {
            volume_mounts.push(VolumeMount {
                name: TASK_VOLUME.to_string(),
                mount_path: mount.mount_path.clone(),
                sub_path: Some(mount.sub_path.clone()),
                read_only: mount.read_only.then_some(true),
                ..Default::default()
            });
        }
    }
    for (configmap, mount_path) in &spec.config_mounts {
        volume_mounts.push(VolumeMount {
            name: format!("cm-{configmap}"),
            mount_path: mount_path.clone(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    let mut env_from = Vec::new();
    for configmap in &spec.env_from_configmaps {
        env_from.push(EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: configmap.clone(),
                optional: Some(false),
            }),
            ..Default::default()
        });
    }
    for secret in &spec.env_from_secrets {
        env_from.push(EnvFromSource {
            secret_ref: Some(SecretEnvSource { name: secret.name.clone(), optional: Some(false) }),
            ..Default::default()
        });
    }

    let resources = spec.resources.as_ref().and_then(|r| {
        let mut requests = BTreeMap::new();
        if let Some(cpu) = r.cpu_cores {
            requests.insert("cpu".to_string(), Quantity(cpu.to_string()));
        }
        if let Some(ram) = r.ram_gb {
            requests.insert("memory".to_string(), Quantity(format!("{}Mi", (ram * 1024.0) as i64)));
        }
        (!requests.is_empty()).then(|| ResourceRequirements {
            requests: Some(requests),
            ..Default::default()
        })
    });

    Container {
        name: "main".to_string(),
        image: Some(spec.image.clone()),
        image_pull_policy: spec.image_pull_policy.clone(),
        command: Some(spec.command.clone()),
        working_dir: spec.workdir.clone(),
        env: Some(spec.env.iter().map(|(k, v)| env_var(k, v)).collect()),
        env_from: (!env_from.is_empty()).then_some(env_from),
        volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
        resources,
        security_context: spec.hardened.then(|| SecurityContext {
            allow_privilege_escalation: Some(false),
            privileged: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_spec(spec: &WorkloadSpec) -> PodSpec {
    let mut volumes = Vec::new();
    if let Some(claim) = &spec.pvc {
        volumes.push(Volume {
            name: TASK_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    for (configmap, _) in &spec.config_mounts {
        volumes.push(Volume {
            name: format!("cm-{configmap}"),
            config_map: Some(ConfigMapVolumeSource {
                name: configmap.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    PodSpec {
        containers: vec![container(spec)],
        volumes: (!volumes.is_empty()).then_some(volumes),
        restart_policy: Some(spec.restart_policy.clone()),
        service_account_name: spec.service_account.clone(),
        security_context: spec.hardened.then(|| PodSecurityContext {
            run_as_non_root: Some(true),
            seccomp_profile: Some(SeccompProfile {
                type_: "RuntimeDefault".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a bare pod (executor steps).
pub(super) fn build_pod(spec: &WorkloadSpec) -> Pod {
    Pod {
        metadata: metadata(&spec.name, &spec.labels),
        spec: Some(pod_spec(spec)),
        ..Default::default()
    }
}

/// Build a one-shot Job (orchestrator and filer workloads).
pub(super) fn build_job(spec: &WorkloadSpec) -> Job {
    Job {
        metadata: metadata(&spec.name, &spec.labels),
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            ttl_seconds_after_finished: spec.ttl_seconds,
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels_of(&spec.labels)),
                    ..Default::default()
                }),
                spec: Some(pod_spec(spec)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the task volume claim.
pub(super) fn build_pvc(spec: &PvcSpec) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(&spec.name, &spec.labels),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![spec.access_mode.clone()]),
            storage_class_name: spec.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(
                    [("storage".to_string(), Quantity(spec.size_quantity()))]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
