// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use poiesis_core::{Executor, Input, Output};

#[test]
fn mounts_cover_all_declared_roots_once() {
    let task = poiesis_core::Task::builder()
        .inputs(vec![
            Input { content: Some("x".to_string()), path: "/data/a".to_string(), ..Input::default() },
            Input { content: Some("y".to_string()), path: "/data/b".to_string(), ..Input::default() },
        ])
        .outputs(vec![Output {
            url: "s3://b/out".to_string(),
            path: "/results/r.txt".to_string(),
            ..Output::default()
        }])
        .volumes(vec!["/scratch".to_string()])
        .executors(vec![Executor {
            image: "ubuntu:20.04".to_string(),
            command: vec!["/bin/true".to_string()],
            workdir: Some("/data/".to_string()),
            stdout: Some("/logs/out.txt".to_string()),
            ..Executor::default()
        }])
        .build();

    let mounts = task_mounts(&task);
    let paths: Vec<_> = mounts.iter().map(|m| m.mount_path.as_str()).collect();
    assert_eq!(paths, vec!["/data", "/logs", "/results", "/scratch"]);
    assert!(mounts.iter().all(|m| !m.read_only));
    assert_eq!(mounts[0].sub_path, "data");
}

#[test]
fn wildcard_output_mounts_its_prefix() {
    let task = poiesis_core::Task::builder()
        .outputs(vec![Output {
            url: "s3://b/out".to_string(),
            path: "/work/*.txt".to_string(),
            path_prefix: Some("/work".to_string()),
            ..Output::default()
        }])
        .build();
    let mounts = task_mounts(&task);
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].mount_path, "/work");
}

#[test]
fn no_declared_paths_means_no_mounts() {
    let task = poiesis_core::Task::builder().build();
    assert!(task_mounts(&task).is_empty());
}
