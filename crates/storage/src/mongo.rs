// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MongoDB-backed task store.
//!
//! One `tasks` collection holds the documents described by
//! [`poiesis_core::Task`]. State CAS uses `findOneAndUpdate` on
//! `(id, state)`; log appends use `$push`/`$set` on `logs.0`, so they
//! are monotonic regardless of writer interleaving.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use poiesis_core::{
    ExecutorLog, MongoConfig, OutputFileLog, SystemClock, Task, TaskId, TaskLog, TaskRequest,
    TaskState, Clock,
};

use crate::store::{
    decode_page_token, encode_page_token, ListQuery, StorageError, TaskPage, TaskStore,
};

const COLLECTION: &str = "tasks";

pub struct MongoStore {
    tasks: Collection<Task>,
    clock: SystemClock,
}

impl From<mongodb::error::Error> for StorageError {
    fn from(e: mongodb::error::Error) -> Self {
        StorageError::Unavailable(e.to_string())
    }
}

impl MongoStore {
    /// Connect and ensure the indexes the listing queries rely on.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StorageError> {
        let mut options = ClientOptions::parse(config.connection_uri()).await?;
        options.max_pool_size = Some(config.max_pool_size);
        let client = Client::with_options(options)?;
        let tasks = client.database(&config.database).collection::<Task>(COLLECTION);

        let unique = IndexOptions::builder().unique(true).build();
        let indexes = [
            IndexModel::builder().keys(doc! { "id": 1 }).options(unique).build(),
            IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
            IndexModel::builder().keys(doc! { "user_id": 1, "name": 1 }).build(),
            IndexModel::builder().keys(doc! { "user_id": 1, "state": 1 }).build(),
            IndexModel::builder().keys(doc! { "creation_time": -1, "id": 1 }).build(),
        ];
        for index in indexes {
            tasks.create_index(index).await?;
        }
        tracing::info!(database = %config.database, "connected to document store");
        Ok(Self { tasks, clock: SystemClock })
    }

    async fn require(&self, filter: Document) -> Result<Task, StorageError> {
        self.tasks.find_one(filter).await?.ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl TaskStore for MongoStore {
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
        self.tasks.insert_one(&task).await?;
        Ok(id)
    }

    async fn get(&self, id: &TaskId, user_id: &str) -> Result<Task, StorageError> {
        self.require(doc! { "id": id.as_str(), "user_id": user_id }).await
    }

    async fn load(&self, id: &TaskId) -> Result<Task, StorageError> {
        self.require(doc! { "id": id.as_str() }).await
    }

    async fn list(&self, query: &ListQuery) -> Result<TaskPage, StorageError> {
        let filter = list_filter(query);
        let page_size = query.effective_page_size() as usize;
        let mut tasks: Vec<Task> = self
            .tasks
            .find(filter)
            .sort(doc! { "creation_time": -1, "id": 1 })
            .limit(page_size as i64 + 1)
            .await?
            .try_collect()
            .await?;

        let next_page_token =
            (tasks.len() > page_size).then(|| encode_page_token(&tasks[page_size - 1]));
        tasks.truncate(page_size);
        let tasks = tasks.into_iter().map(|t| query.view.project(t)).collect();
        Ok(TaskPage { tasks, next_page_token })
    }

    async fn transition(
        &self,
        id: &TaskId,
        from: TaskState,
        to: TaskState,
    ) -> Result<(), StorageError> {
        from.transition(to).map_err(|e| StorageError::Conflict(e.to_string()))?;
        let updated = self
            .tasks
            .find_one_and_update(
                doc! { "id": id.as_str(), "state": from.to_string() },
                doc! { "$set": { "state": to.to_string() } },
            )
            .await?;
        match updated {
            Some(_) => Ok(()),
            None => {
                // Distinguish a lost CAS race from a missing document.
                let current = self.load(id).await?;
                Err(StorageError::Conflict(format!("expected {from}, found {}", current.state)))
            }
        }
    }

    async fn append_system_log(&self, id: &TaskId, text: &str) -> Result<(), StorageError> {
        self.push_to_log(id, doc! { "$push": { "logs.0.system_logs": text } }).await?;
        Ok(())
    }

    async fn append_executor_log(
        &self,
        id: &TaskId,
        entry: ExecutorLog,
    ) -> Result<usize, StorageError> {
        let entry = mongodb::bson::to_bson(&entry)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let task = self.push_to_log(id, doc! { "$push": { "logs.0.logs": entry } }).await?;
        Ok(task.current_log().map(|l| l.logs.len().saturating_sub(1)).unwrap_or(0))
    }

    async fn append_output_log(
        &self,
        id: &TaskId,
        entry: OutputFileLog,
    ) -> Result<(), StorageError> {
        let entry = mongodb::bson::to_bson(&entry)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.push_to_log(id, doc! { "$push": { "logs.0.outputs": entry } }).await?;
        Ok(())
    }

    async fn set_start_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError> {
        self.push_to_log(id, doc! { "$set": { "logs.0.start_time": time } }).await?;
        Ok(())
    }

    async fn set_end_time(&self, id: &TaskId, time: &str) -> Result<(), StorageError> {
        self.push_to_log(id, doc! { "$set": { "logs.0.end_time": time } }).await?;
        Ok(())
    }
}

impl MongoStore {
    async fn push_to_log(&self, id: &TaskId, update: Document) -> Result<Task, StorageError> {
        self.tasks
            .find_one_and_update(doc! { "id": id.as_str() }, update)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StorageError::NotFound)
    }
}

/// Build the find filter for a listing query.
fn list_filter(query: &ListQuery) -> Document {
    let mut filter = doc! { "user_id": &query.user_id };
    if let Some(prefix) = &query.name_prefix {
        filter.insert(
            "name",
            Bson::RegularExpression(mongodb::bson::Regex {
                pattern: format!("^{}", escape_regex(prefix)),
                options: String::new(),
            }),
        );
    }
    if let Some(state) = query.state {
        filter.insert("state", state.to_string());
    }
    for (key, value) in &query.tags {
        if value.is_empty() {
            filter.insert(format!("tags.{key}"), doc! { "$exists": true });
        } else {
            filter.insert(format!("tags.{key}"), value.as_str());
        }
    }
    if let Some((time, id)) = query.page_token.as_deref().and_then(decode_page_token) {
        filter.insert(
            "$or",
            vec![
                doc! { "creation_time": { "$lt": &time } },
                doc! { "creation_time": &time, "id": { "$gt": id } },
            ],
        );
    }
    filter
}

/// Escape a literal string for embedding in a regular expression.
fn escape_regex(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if !c.is_ascii_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
#[path = "mongo_tests.rs"]
mod tests;
