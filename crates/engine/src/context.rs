// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared workload context.

use std::sync::Arc;

use poiesis_adapters::{Bus, ClusterDriver};
use poiesis_core::{Clock, CoreConfig, SystemClock, Task, TaskId, TaskState};
use poiesis_storage::{StorageError, TaskStore};

use crate::WorkloadError;

/// Everything a phase workload needs: configuration plus the three
/// external seams. Built once per process and passed down explicitly.
#[derive(Clone)]
pub struct Ctx<C: Clock = SystemClock> {
    pub task_id: TaskId,
    pub config: CoreConfig,
    pub store: Arc<dyn TaskStore>,
    pub bus: Arc<dyn Bus>,
    pub cluster: Arc<dyn ClusterDriver>,
    pub clock: C,
}

impl<C: Clock> Ctx<C> {
    pub async fn task(&self) -> Result<Task, WorkloadError> {
        Ok(self.store.load(&self.task_id).await?)
    }

    /// Whether a cancel request has been persisted for this task.
    pub async fn cancel_requested(&self) -> Result<bool, WorkloadError> {
        Ok(self.task().await?.state == TaskState::Canceling)
    }

    /// CAS that treats "already there" as success: a `Conflict` whose
    /// current state equals `to` means another writer (or a previous
    /// attempt of this one) already made the move.
    pub async fn transition(&self, from: TaskState, to: TaskState) -> Result<(), WorkloadError> {
        match self.store.transition(&self.task_id, from, to).await {
            Ok(()) => Ok(()),
            Err(StorageError::Conflict(detail)) => {
                let current = self.task().await?.state;
                if current == to {
                    Ok(())
                } else {
                    Err(WorkloadError::Storage(StorageError::Conflict(detail)))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn system_log(&self, text: &str) {
        if let Err(e) = self.store.append_system_log(&self.task_id, text).await {
            tracing::warn!(task_id = %self.task_id, error = %e, "failed to append system log");
        }
    }
}
