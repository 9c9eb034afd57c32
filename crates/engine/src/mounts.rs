// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task volume mount derivation.
//!
//! The task's one PVC is mounted into each container by sub-path: every
//! distinct first component of a declared absolute path (`/data/f` →
//! sub-path `data` at `/data`) becomes a mount, so executors and filers
//! see identical paths without sharing the whole volume root.

use poiesis_adapters::MountSpec;
use poiesis_core::validate::has_wildcard;
use poiesis_core::Task;

/// First path component of an absolute path, if any.
fn first_component(path: &str) -> Option<&str> {
    path.trim_start_matches('/').split('/').next().filter(|c| !c.is_empty())
}

/// Mounts covering every path the task declares.
pub fn task_mounts(task: &Task) -> Vec<MountSpec> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |component: Option<&str>| {
        if let Some(c) = component {
            if !names.iter().any(|existing| existing == c) {
                names.push(c.to_string());
            }
        }
    };

    for input in &task.inputs {
        push(first_component(&input.path));
    }
    for output in &task.outputs {
        // Wildcard paths resolve under path_prefix
        if has_wildcard(&output.path) {
            if let Some(prefix) = &output.path_prefix {
                push(first_component(prefix));
            }
        } else {
            push(first_component(&output.path));
        }
    }
    for volume in &task.volumes {
        push(first_component(volume));
    }
    for exec in &task.executors {
        for path in
            [&exec.workdir, &exec.stdin, &exec.stdout, &exec.stderr].into_iter().flatten()
        {
            push(first_component(path));
        }
    }

    names.sort();
    names
        .into_iter()
        .map(|component| MountSpec {
            mount_path: format!("/{component}"),
            sub_path: component,
            read_only: false,
        })
        .collect()
}

#[cfg(test)]
#[path = "mounts_tests.rs"]
mod tests;
