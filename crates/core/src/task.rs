// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TES v1.1.0 task document model.
//!
//! Field names follow the TES OpenAPI document (snake_case on the wire).
//! The same structs are persisted to the document store and served over
//! HTTP; view projection happens in [`crate::view`].

use crate::id::TaskId;
use crate::state::TaskState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether an input or output names a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IoType {
    #[default]
    File,
    Directory,
}

crate::simple_display! {
    IoType {
        File => "FILE",
        Directory => "DIRECTORY",
    }
}

/// A declared task input, staged into the shared volume before execution.
///
/// Exactly one of `url` or `content` is set (enforced by
/// [`crate::validate::validate_task`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Input {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline literal file content, written verbatim to `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Absolute path inside the shared task volume.
    pub path: String,
    #[serde(default, rename = "type")]
    pub r#type: IoType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streamable: Option<bool>,
}

/// A declared task output, collected from the shared volume after the
/// last executor finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    /// Absolute path inside the shared task volume; may contain POSIX
    /// glob wildcards, in which case `path_prefix` is required.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: IoType,
}

/// Requested execution resources; advisory except where the cluster
/// enforces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preemptible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_parameters_strict: Option<bool>,
}

/// One containerized step of a task. Executors run sequentially against
/// the shared task volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Executor {
    pub image: String,
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    /// Continue to the next executor even if this one exits non-zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_error: Option<bool>,
}

impl Executor {
    pub fn ignores_error(&self) -> bool {
        self.ignore_error.unwrap_or(false)
    }
}

/// Log for a single executor run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutorLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// One uploaded output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFileLog {
    pub url: String,
    pub path: String,
    pub size_bytes: i64,
}

/// Log for one task attempt (currently always exactly one per task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    /// Per-executor logs, index-aligned with `Task::executors`.
    #[serde(default)]
    pub logs: Vec<ExecutorLog>,
    #[serde(default)]
    pub outputs: Vec<OutputFileLog>,
    #[serde(default)]
    pub system_logs: Vec<String>,
}

/// The root task document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Subject that created the task; every later read and write is
    /// scoped on it. Persisted with the document, cleared by view
    /// projection so it never reaches clients.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Input>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
    pub executors: Vec<Executor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<TaskLog>,
}

impl Task {
    /// The log entry for the current (only) attempt, if started.
    pub fn current_log(&self) -> Option<&TaskLog> {
        self.logs.last()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A task as submitted by a client: everything server-populated absent.
///
/// `CreateTask` bodies deserialize into this, are validated, then turned
/// into a [`Task`] by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
    #[serde(default)]
    pub executors: Vec<Executor>,
    #[serde(default)]
    pub volumes: Vec<String>,
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            user_id: String = "user-test",
        }
        set {
            id: TaskId = TaskId::from_string("tsk-testtask0000000000"),
            state: TaskState = TaskState::Queued,
            tags: HashMap<String, String> = HashMap::new(),
            inputs: Vec<Input> = Vec::new(),
            outputs: Vec<Output> = Vec::new(),
            executors: Vec<Executor> = vec![Executor {
                image: "ubuntu:20.04".to_string(),
                command: vec!["/bin/true".to_string()],
                ..Executor::default()
            }],
            volumes: Vec<String> = Vec::new(),
            logs: Vec<TaskLog> = Vec::new(),
        }
        option {
            name: String = None,
            description: String = None,
            creation_time: String = None,
            resources: Resources = None,
        }
    }
}

crate::builder! {
    pub struct InputBuilder => Input {
        into {
            path: String = "/data/in",
        }
        set {
            r#type: IoType = IoType::File,
        }
        option {
            name: String = None,
            description: String = None,
            url: String = None,
            content: String = None,
            streamable: bool = None,
        }
    }
}

crate::builder! {
    pub struct OutputBuilder => Output {
        into {
            url: String = "file:///tmp/out",
            path: String = "/data/out",
        }
        set {
            r#type: IoType = IoType::File,
        }
        option {
            name: String = None,
            description: String = None,
            path_prefix: String = None,
        }
    }
}

crate::builder! {
    pub struct ExecutorBuilder => Executor {
        into {
            image: String = "ubuntu:20.04",
        }
        set {
            command: Vec<String> = vec!["/bin/true".to_string()],
        }
        option {
            workdir: String = None,
            stdin: String = None,
            stdout: String = None,
            stderr: String = None,
            env: HashMap<String, String> = None,
            ignore_error: bool = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
