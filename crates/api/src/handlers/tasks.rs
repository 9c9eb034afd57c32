// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task endpoints: create, list, get, cancel.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use poiesis_adapters::Subject;
use poiesis_core::{
    executor_pod_name, job_name, validate_task, Phase, Task, TaskId, TaskRequest, TaskState, View,
};
use poiesis_engine::launch::orchestrator_job;
use poiesis_storage::ListQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// How many times a cancel retries a lost CAS race before giving up.
const CANCEL_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: TaskId,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// `POST /tasks`
pub async fn create(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_task(&request)?;

    let id = state.store.create(&subject.user_id, request).await?;
    tracing::info!(task_id = %id, user_id = %subject.user_id, "task created");

    // The orchestrator Job is the task's engine; if it cannot launch the
    // task would sit QUEUED forever, so fail it loudly instead.
    if let Err(e) = state.cluster.create_job(&orchestrator_job(&state.config, &id)).await {
        state
            .store
            .transition(&id, TaskState::Queued, TaskState::SystemError)
            .await
            .ok();
        state
            .store
            .append_system_log(&id, &format!("orchestrator launch failed: {e}"))
            .await
            .ok();
        return Err(e.into());
    }
    Ok(Json(CreatedResponse { id }))
}

#[derive(Debug, Deserialize)]
pub struct GetParams {
    view: Option<String>,
}

/// `GET /tasks/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<String>,
    Query(params): Query<GetParams>,
) -> Result<Json<Task>, AppError> {
    let view = parse_view(params.view.as_deref())?;
    let task = state.store.get(&parse_task_id(&id)?, &subject.user_id).await?;
    Ok(Json(view.project(task)))
}

/// `GET /tasks` — filters arrive as repeated query pairs so tag keys
/// and values can be zipped positionally.
pub async fn list(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ListResponse>, AppError> {
    let mut query = ListQuery::for_user(subject.user_id.as_str());
    let mut tag_keys: Vec<String> = Vec::new();
    let mut tag_values: Vec<String> = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "name_prefix" => query.name_prefix = Some(value),
            "state" => {
                let state = serde_json::from_value(Value::String(value.clone()))
                    .map_err(|_| AppError::BadRequest(format!("unknown state {value:?}")))?;
                query.state = Some(state);
            }
            "tag_key" => tag_keys.push(value),
            "tag_value" => tag_values.push(value),
            "page_size" => {
                let size: u32 = value
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("bad page_size {value:?}")))?;
                query.page_size = Some(size);
            }
            "page_token" => query.page_token = Some(value),
            "view" => query.view = parse_view(Some(&value))?,
            _ => {}
        }
    }

    if tag_values.len() > tag_keys.len() {
        return Err(AppError::BadRequest("more tag_value entries than tag_key".to_string()));
    }
    let mut values = tag_values.into_iter();
    query.tags =
        tag_keys.into_iter().map(|k| (k, values.next().unwrap_or_default())).collect();

    let page = state.store.list(&query).await?;
    Ok(Json(ListResponse { tasks: page.tasks, next_page_token: page.next_page_token }))
}

/// `POST /tasks/{id}:cancel`
///
/// The `{id}:cancel` suffix is part of the final path segment.
pub async fn cancel(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = raw.strip_suffix(":cancel").ok_or(AppError::NotFound)?;
    let id = parse_task_id(id)?;

    for _ in 0..CANCEL_ATTEMPTS {
        let task = state.store.get(&id, &subject.user_id).await?;
        // Idempotent: canceling a settled or already-canceling task is a no-op
        if task.is_terminal() || task.state == TaskState::Canceling {
            return Ok(Json(json!({})));
        }
        match state.store.transition(&id, task.state, TaskState::Canceling).await {
            Ok(()) => {
                tracing::info!(task_id = %id, "cancel requested");
                reap_children(&state, &task).await;
                return Ok(Json(json!({})));
            }
            Err(poiesis_storage::StorageError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal("cancel lost repeated state races".to_string()))
}

/// Best-effort teardown of phase Jobs and executor pods. The
/// orchestrator's own Job is spared so it can finish the
/// `CANCELING -> CANCELED` transition and delete the volume.
async fn reap_children(state: &AppState, task: &Task) {
    for phase in [Phase::InputFiler, Phase::Executor, Phase::OutputFiler] {
        let name = job_name(phase, &task.id);
        if let Err(e) = state.cluster.delete_job(&name).await {
            tracing::warn!(task_id = %task.id, %name, error = %e, "cancel: Job deletion failed");
        }
    }
    for index in 0..task.executors.len() {
        let name = executor_pod_name(&task.id, index);
        if let Err(e) = state.cluster.delete_pod(&name).await {
            tracing::warn!(task_id = %task.id, %name, error = %e, "cancel: pod deletion failed");
        }
    }
}

/// Ids longer than the generated width can't exist; map them straight
/// to 404 instead of letting them near the fixed-size id buffer.
fn parse_task_id(raw: &str) -> Result<TaskId, AppError> {
    if raw.is_empty() || raw.len() > poiesis_core::id::ID_MAX_LEN {
        return Err(AppError::NotFound);
    }
    Ok(TaskId::from_string(raw))
}

fn parse_view(raw: Option<&str>) -> Result<View, AppError> {
    match raw {
        None => Ok(View::Minimal),
        Some(value) => value.parse().map_err(AppError::BadRequest),
    }
}
