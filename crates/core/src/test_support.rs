// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::task::{Executor, Input, Task, TaskRequest};
use crate::TaskId;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::state::TaskState;
    use proptest::prelude::*;

    pub fn arb_task_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::Unknown),
            Just(TaskState::Queued),
            Just(TaskState::Initializing),
            Just(TaskState::Running),
            Just(TaskState::Paused),
            Just(TaskState::Complete),
            Just(TaskState::ExecutorError),
            Just(TaskState::SystemError),
            Just(TaskState::Canceled),
            Just(TaskState::Canceling),
            Just(TaskState::Preempted),
        ]
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// A fresh queued task owned by `user` with a single no-op executor.
pub fn queued_task(user: &str) -> Task {
    Task::builder().id(TaskId::new()).user_id(user).build()
}

/// A create request containing one inline-content input, the way the
/// simple-echo scenario submits it.
pub fn echo_request(content: &str, path: &str) -> TaskRequest {
    TaskRequest {
        inputs: vec![Input {
            content: Some(content.to_string()),
            path: path.to_string(),
            ..Input::default()
        }],
        executors: vec![Executor {
            image: "ubuntu:20.04".to_string(),
            command: vec!["/bin/cat".to_string(), path.to_string()],
            ..Executor::default()
        }],
        ..TaskRequest::default()
    }
}

/// An executor that exits with `code` (busybox true/false style).
pub fn exiting_executor(code: i32, ignore_error: bool) -> Executor {
    Executor {
        image: "busybox".to_string(),
        command: vec![if code == 0 { "/bin/true" } else { "/bin/false" }.to_string()],
        ignore_error: ignore_error.then_some(true),
        ..Executor::default()
    }
}
