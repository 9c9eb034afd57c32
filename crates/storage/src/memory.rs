// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory task store for tests and single-process development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use poiesis_core::{
    Clock, ExecutorLog, OutputFileLog, SystemClock, Task, TaskId, TaskLog, TaskRequest, TaskState,
};

use crate::store::{
    decode_page_token, encode_page_token, listing_order, tags_match, ListQuery, StorageError,
    TaskPage, TaskStore,
};

/// Hash-map-backed [`TaskStore`]. State transitions hold the map lock,
/// so CAS semantics match the document-store implementation.
pub struct MemoryStore<C: Clock = SystemClock> {
    tasks: Mutex<HashMap<String, Task>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { tasks: Mutex::new(HashMap::new()), clock }
    }

    fn with_task<T>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut Task) -> T,
    ) -> Result<T, StorageError> {
        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(id.as_str()).ok_or(StorageError::NotFound)?;
        Ok(f(task))
    }

    fn with_current_log<T>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut TaskLog) -> T,
    ) -> Result<T, StorageError> {
        self.with_task(id, |task| {
            if task.logs.is_empty() {
                task.logs.push(TaskLog::default());
            }
            // Index valid: pushed above when empty.
            f(&mut task.logs[0])
        })
    }
}

#[async_trait]
impl<C: Clock> TaskStore for MemoryStore<C> {
    async fn create(&self, user_id: &str, request: TaskRequest) -> Result<TaskId, StorageError> {
        let id = TaskId::new();
        let task = Task {
            id,
            user_id: user_id.to_string(),
            state: TaskState::Queued,
            name: request.name,
            description: request.description,
            tags: request.tags,
            creation_time: Some(self.clock.rfc3339()),
            inputs: request.inputs,
            outputs: request.outputs,
            resources: request.resources,
            executors: request.executors,
            volumes: request.volumes,
            logs: vec![TaskLog::default()],
        };
        self.tasks.lock().insert(id.as_str().to_string(), task);
        Ok(id)
    }

    async fn get(&self, id: &TaskId, user_id: &str) -> Result<Task, StorageError> {
        let tasks = self.tasks.lock();
        tasks
            .get(id.as_str())
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn load(&self, id: &TaskId) -> Result<Task, StorageError> {
        self.tasks.lock().get(id.as_str()).cloned().ok_or(StorageError::NotFound)
    }

    async fn list(&self, query: &ListQuery) -> Result<TaskPage, StorageError> {
        let mut matches: Vec<Task> = {
            let tasks = self.tasks.lock();
            tasks
                .values()
                .filter(|t| t.user_id == query.user_id)
                .filter(|t| match &query.name_prefix {
                    Some(prefix) => {
                        t.name.as_deref().is_some_and(|name| name.starts_with(prefix))
                    }
                    None => true,
                })
                .filter(|t| query.state.is_none_or(|s| t.state == s))
                .filter(|t| tags_match(t, &query.tags))
                .cloned()
                .collect()
        };
        matches.sort_by(listing_order);

        if let Some((time, id)) = query.page_token.as_deref().and_then(decode_page_token) {
            matches.retain(|t| {
                let tt = t.creation_time.as_deref().unwrap_or("");
                tt < time.as_str() || (tt == time && t.id.as_str() > id.as_str())
            });
        }

        let page_size = query.effective_page_size() as usize;
        let next_page_token =
            (matches.len() > page_size).then(|| encode_page_token(&matches[page_size - 1]));
        matches.truncate(page_size);
        let tasks = matches.into_iter().map(|t| query.view.project(t)).collect();
        Ok(TaskPage { tasks, next_page_token })
    }

    async fn transition(
        &self,
        id: &TaskId,
        from: TaskState,
        to: TaskState,
    ) -> Result<(), StorageError> {
        from.transition(to).map_err(|e| StorageError::Conflict(e.to_string()))?;
        self.with_task(id, |task| {
            if task.state != from {
                return Err(StorageError::Conflict(format!(
                    "expected {from}, found {}",
                    task.state
                )));
            }
            task.state = to;
            Ok(())
        })?
    }

    async fn append_system_log(&self, id: &TaskId, text: &str) -> Result<(), StorageError> {
        self.with_current_log(id, |log| log.system_logs.push(text.to_string()))
    }

    async fn append_executor_log(
        &self,
        id: &TaskId,
        entry: ExecutorLog,
    ) -> Result<usize, StorageError> {
        self.with_current_log(id, |log| {
            log.logs.push(entry);
            log.logs.len() - 1
        })
    }

    async fn append_output_log(
        &self,
        id: &TaskId,
        entry: OutputFileLog,
    ) -> Result<(), StorageError> {
        self.with_current_log(id, |log| log.outputs.push(entry))
    }

    async fn set_start_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError> {
        self.with_current_log(id, |log| log.start_time = Some(time.to_string()))
    }

    async fn set_end_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError> {
        self.with_current_log(id, |log| log.end_time = Some(time.to_string()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
