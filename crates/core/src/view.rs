// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field projection for task reads.

use crate::task::Task;
use serde::{Deserialize, Serialize};

/// How much of a task to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    /// `id` and `state` only.
    #[default]
    Minimal,
    /// Everything except stdout/stderr, inline input content, and
    /// system logs.
    Basic,
    /// The whole document.
    Full,
}

crate::simple_display! {
    View {
        Minimal => "MINIMAL",
        Basic => "BASIC",
        Full => "FULL",
    }
}

impl std::str::FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MINIMAL" => Ok(View::Minimal),
            "BASIC" => Ok(View::Basic),
            "FULL" => Ok(View::Full),
            other => Err(format!("unknown view {other:?}")),
        }
    }
}

impl View {
    /// Apply the projection, consuming the full document.
    ///
    /// Every view clears `user_id`: the owner is a scoping key, not a
    /// client-visible field.
    pub fn project(self, task: Task) -> Task {
        let task = Task { user_id: String::new(), ..task };
        match self {
            View::Full => task,
            View::Minimal => Task {
                name: None,
                description: None,
                tags: Default::default(),
                creation_time: None,
                inputs: Vec::new(),
                outputs: Vec::new(),
                resources: None,
                executors: Vec::new(),
                volumes: Vec::new(),
                logs: Vec::new(),
                ..task
            },
            View::Basic => {
                let mut task = task;
                for input in &mut task.inputs {
                    input.content = None;
                }
                for log in &mut task.logs {
                    log.system_logs.clear();
                    for exec_log in &mut log.logs {
                        exec_log.stdout = None;
                        exec_log.stderr = None;
                    }
                }
                task
            }
        }
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
