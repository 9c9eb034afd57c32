// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task store seam.

use async_trait::async_trait;
use poiesis_core::{
    ExecutorLog, OutputFileLog, Task, TaskId, TaskRequest, TaskState, View,
};
use thiserror::Error;

/// Default page size for task listings.
pub const DEFAULT_PAGE_SIZE: u32 = 256;
/// Hard ceiling; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("task not found")]
    NotFound,
    /// CAS mismatch or illegal state edge. Callers that observe the
    /// current state already equal to their target treat this as
    /// success-equivalent.
    #[error("state conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Task listing parameters.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub user_id: String,
    pub name_prefix: Option<String>,
    pub state: Option<TaskState>,
    /// `(key, value)` pairs, all of which must match. An empty value
    /// matches any value but not an absent key.
    pub tags: Vec<(String, String)>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub view: View,
}

impl ListQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), ..Self::default() }
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of a task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub next_page_token: Option<String>,
}

/// Persisted task documents and state transitions.
///
/// Log-append operations are monotonic: they only ever add entries to
/// the current attempt's log, so concurrent writers cannot clobber each
/// other. State mutation goes exclusively through [`transition`], a
/// compare-and-set that also rejects edges outside the state graph.
///
/// [`transition`]: TaskStore::transition
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a validated request as a new `QUEUED` task and return its
    /// server-assigned id.
    async fn create(&self, user_id: &str, request: TaskRequest) -> Result<TaskId, StorageError>;

    /// Fetch a task scoped by owner. A foreign or unknown id is
    /// indistinguishable: both are `NotFound`.
    async fn get(&self, id: &TaskId, user_id: &str) -> Result<Task, StorageError>;

    /// Fetch a task by id alone. Engine-internal: phase workloads hold
    /// the id as a capability and are not subject-scoped.
    async fn load(&self, id: &TaskId) -> Result<Task, StorageError>;

    /// List tasks for a user, newest first (ties broken by `id asc`),
    /// with token pagination and view projection applied.
    async fn list(&self, query: &ListQuery) -> Result<TaskPage, StorageError>;

    /// Atomically move `id` from `from` to `to`. Fails with `Conflict`
    /// if the stored state is not `from` or the edge is not in the graph.
    async fn transition(
        &self,
        id: &TaskId,
        from: TaskState,
        to: TaskState,
    ) -> Result<(), StorageError>;

    async fn append_system_log(&self, id: &TaskId, text: &str) -> Result<(), StorageError>;

    /// Append the log of a finished executor. Returns the index it
    /// landed at (aligned with `Task::executors`).
    async fn append_executor_log(
        &self,
        id: &TaskId,
        log: ExecutorLog,
    ) -> Result<usize, StorageError>;

    async fn append_output_log(&self, id: &TaskId, log: OutputFileLog)
        -> Result<(), StorageError>;

    async fn set_start_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError>;

    async fn set_end_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError>;
}

/// Encode the resume position after `task` for a page token.
pub(crate) fn encode_page_token(task: &Task) -> String {
    format!("{}~{}", task.creation_time.as_deref().unwrap_or(""), task.id)
}

/// Split a page token back into `(creation_time, id)`.
pub(crate) fn decode_page_token(token: &str) -> Option<(String, String)> {
    let (time, id) = token.split_once('~')?;
    if id.is_empty() {
        return None;
    }
    Some((time.to_string(), id.to_string()))
}

/// Listing order: `creation_time desc, id asc`.
pub(crate) fn listing_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    let at = a.creation_time.as_deref().unwrap_or("");
    let bt = b.creation_time.as_deref().unwrap_or("");
    bt.cmp(at).then_with(|| a.id.as_str().cmp(b.id.as_str()))
}

/// Whether `task` matches the tag filter pairs.
pub(crate) fn tags_match(task: &Task, tags: &[(String, String)]) -> bool {
    tags.iter().all(|(k, v)| match task.tags.get(k) {
        Some(actual) => v.is_empty() || actual == v,
        None => false,
    })
}
