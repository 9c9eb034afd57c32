// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task state machine.
//!
//! States and the legal transition graph come from TES v1.1.0. The store
//! enforces the graph atomically (compare-and-set on `(id, from)`); this
//! module is the single source of truth for which edges exist.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Unknown,
    Queued,
    Initializing,
    Running,
    Paused,
    Complete,
    ExecutorError,
    SystemError,
    Canceled,
    Canceling,
    Preempted,
}

crate::simple_display! {
    TaskState {
        Unknown => "UNKNOWN",
        Queued => "QUEUED",
        Initializing => "INITIALIZING",
        Running => "RUNNING",
        Paused => "PAUSED",
        Complete => "COMPLETE",
        ExecutorError => "EXECUTOR_ERROR",
        SystemError => "SYSTEM_ERROR",
        Canceled => "CANCELED",
        Canceling => "CANCELING",
        Preempted => "PREEMPTED",
    }
}

/// Attempted an edge that is not in the transition graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal task state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskState,
    pub to: TaskState,
}

impl TaskState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Complete
                | TaskState::ExecutorError
                | TaskState::SystemError
                | TaskState::Canceled
                | TaskState::Preempted
        )
    }

    /// Whether the `self -> to` edge exists in the transition graph.
    ///
    /// Graph:
    /// - `QUEUED -> INITIALIZING -> RUNNING -> COMPLETE`
    /// - `QUEUED | INITIALIZING | RUNNING -> EXECUTOR_ERROR | SYSTEM_ERROR | PREEMPTED`
    /// - any non-terminal `-> CANCELING`; `CANCELING -> CANCELED`
    pub fn may_transition(self, to: TaskState) -> bool {
        use TaskState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, to) {
            (_, Canceling) => !matches!(self, Canceling),
            (Canceling, Canceled) => true,
            (Queued, Initializing) => true,
            (Initializing, Running) => true,
            (Running, Complete) => true,
            (Queued | Initializing | Running, ExecutorError | SystemError | Preempted) => true,
            _ => false,
        }
    }

    /// Validate the `self -> to` edge, returning the edge on failure.
    pub fn transition(self, to: TaskState) -> Result<TaskState, TransitionError> {
        if self.may_transition(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
