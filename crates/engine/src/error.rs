// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload failure classification.

use poiesis_adapters::{BusError, ClusterError, TransferError};
use poiesis_core::TaskState;
use poiesis_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("bus: {0}")]
    Bus(#[from] BusError),
    #[error("cluster: {0}")]
    Cluster(#[from] ClusterError),
    #[error("transfer: {0}")]
    Transfer(#[from] TransferError),
    #[error("executor {index} exited with code {exit_code}")]
    ExecutorFailed { index: usize, exit_code: i32 },
    #[error("preempted: {0}")]
    Preempted(String),
    #[error("task canceled")]
    Canceled,
    #[error("{0}")]
    System(String),
}

impl WorkloadError {
    /// Terminal state a failure maps to, if any. Cancellation has its
    /// own path (`CANCELING -> CANCELED`) and maps to none.
    pub fn terminal_state(&self) -> Option<TaskState> {
        match self {
            WorkloadError::ExecutorFailed { .. } => Some(TaskState::ExecutorError),
            WorkloadError::Preempted(_) => Some(TaskState::Preempted),
            WorkloadError::Canceled => None,
            _ => Some(TaskState::SystemError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_mapping() {
        assert_eq!(
            WorkloadError::ExecutorFailed { index: 0, exit_code: 1 }.terminal_state(),
            Some(TaskState::ExecutorError)
        );
        assert_eq!(
            WorkloadError::Preempted("node reclaimed".to_string()).terminal_state(),
            Some(TaskState::Preempted)
        );
        assert_eq!(
            WorkloadError::System("filer failed".to_string()).terminal_state(),
            Some(TaskState::SystemError)
        );
        assert_eq!(WorkloadError::Canceled.terminal_state(), None);
        assert_eq!(
            WorkloadError::Storage(StorageError::Unavailable("down".to_string()))
                .terminal_state(),
            Some(TaskState::SystemError)
        );
    }
}
