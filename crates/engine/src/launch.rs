// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child workload construction.
//!
//! The API launches the orchestrator; the orchestrator launches the
//! filers and TExAM; TExAM launches one pod per executor. All engine
//! workloads run the engine image with a subcommand and find the task
//! id in `POIESIS_TASK_ID`; executor pods run the user's image.

use poiesis_adapters::{ResourceRequest, SecretEnvSpec, WorkloadKind, WorkloadSpec};
use poiesis_core::{
    executor_pod_name, job_name, CoreConfig, Executor, Phase, Resources, Task, TaskId,
};

use crate::mounts::task_mounts;

/// Env var engine workloads read their task id from.
pub const TASK_ID_ENV: &str = "POIESIS_TASK_ID";

fn task_labels(id: &TaskId) -> Vec<(String, String)> {
    vec![("poiesis.io/task-id".to_string(), id.as_str().to_string())]
}

/// Secrets a workload gets via `envFrom`, filtered to the ones that are
/// configured.
fn secret_refs(config: &CoreConfig, with_object_store: bool) -> Vec<SecretEnvSpec> {
    let mut names = vec![config.mongo_secret.clone(), config.redis_secret.clone()];
    if with_object_store {
        names.push(config.s3_secret.clone());
    }
    names.into_iter().flatten().map(|name| SecretEnvSpec { name }).collect()
}

fn engine_workload(
    config: &CoreConfig,
    id: &TaskId,
    name: String,
    subcommand: &[&str],
    with_object_store: bool,
) -> WorkloadSpec {
    let mut command = vec!["poiesis".to_string()];
    command.extend(subcommand.iter().map(|s| s.to_string()));

    let mut spec = WorkloadSpec::new(name, &config.image, command)
        .kind(WorkloadKind::Job)
        .env(vec![(TASK_ID_ENV.to_string(), id.as_str().to_string())])
        .env_from_configmaps(vec![config.core_configmap.clone()])
        .env_from_secrets(secret_refs(config, with_object_store))
        .labels(task_labels(id))
        .restart_policy(config.restart_policy.clone())
        .service_account(config.service_account.clone())
        .ttl_seconds(config.job_ttl_seconds)
        .image_pull_policy(config.image_pull_policy.clone())
        .hardened(config.infra_security_context);
    if let (true, Some(path)) = (config.infra_security_context, &config.security_context_path) {
        spec = spec.config_mounts(vec![("poiesis-security-context".to_string(), path.clone())]);
    }
    spec
}

/// The per-task orchestrator Job, launched by the API on create.
pub fn orchestrator_job(config: &CoreConfig, id: &TaskId) -> WorkloadSpec {
    engine_workload(config, id, job_name(Phase::Orchestrator, id), &["orchestrator"], false)
}

/// A filer Job (input or output), launched by the orchestrator.
pub fn filer_job(config: &CoreConfig, task: &Task, phase: Phase) -> WorkloadSpec {
    let subcommand: &[&str] = match phase {
        Phase::InputFiler => &["filer", "input"],
        Phase::OutputFiler => &["filer", "output"],
        // Only filer phases are valid here; anything else is a caller bug
        // surfaced as the input filer to keep the signature total.
        _ => &["filer", "input"],
    };
    engine_workload(config, &task.id, job_name(phase, &task.id), subcommand, true)
        .pvc(poiesis_core::pvc_name(&task.id))
        .mounts(task_mounts(task))
}

/// The execution-and-monitor Job, launched by the orchestrator.
pub fn texam_job(config: &CoreConfig, task: &Task) -> WorkloadSpec {
    engine_workload(config, &task.id, job_name(Phase::Executor, &task.id), &["texam"], false)
        .pvc(poiesis_core::pvc_name(&task.id))
        .mounts(task_mounts(task))
}

/// One executor's pod, launched by TExAM.
pub fn executor_pod(config: &CoreConfig, task: &Task, index: usize) -> WorkloadSpec {
    let executor = &task.executors[index];
    let env: Vec<(String, String)> = executor
        .env
        .as_ref()
        .map(|env| env.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let mut spec = WorkloadSpec::new(
        executor_pod_name(&task.id, index),
        &executor.image,
        executor_command(executor),
    )
    .kind(WorkloadKind::Pod)
    .env(env)
    .labels(task_labels(&task.id))
    .pvc(poiesis_core::pvc_name(&task.id))
    .mounts(task_mounts(task))
    .hardened(config.executor_security_context);
    if let Some(workdir) = &executor.workdir {
        spec = spec.workdir(workdir.clone());
    }
    if let Some(request) = task.resources.as_ref().and_then(resource_request) {
        spec = spec.resources(request);
    }
    spec
}

/// Compute request for an executor container, if the task asks for one.
fn resource_request(resources: &Resources) -> Option<ResourceRequest> {
    (resources.cpu_cores.is_some() || resources.ram_gb.is_some())
        .then(|| ResourceRequest { cpu_cores: resources.cpu_cores, ram_gb: resources.ram_gb })
}

/// The command an executor container runs. Plain commands pass through;
/// stdio redirections wrap in `sh -c` with shell-quoted words.
pub fn executor_command(executor: &Executor) -> Vec<String> {
    let needs_shell =
        executor.stdin.is_some() || executor.stdout.is_some() || executor.stderr.is_some();
    if !needs_shell {
        return executor.command.clone();
    }

    let mut line = executor.command.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" ");
    if let Some(stdin) = &executor.stdin {
        line.push_str(&format!(" < {}", quote(stdin)));
    }
    if let Some(stdout) = &executor.stdout {
        line.push_str(&format!(" > {}", quote(stdout)));
    }
    if let Some(stderr) = &executor.stderr {
        line.push_str(&format!(" 2> {}", quote(stderr)));
    }
    vec!["/bin/sh".to_string(), "-c".to_string(), line]
}

/// Single-quote a word for `sh -c`, escaping embedded quotes.
fn quote(word: &str) -> String {
    if !word.is_empty()
        && word.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
