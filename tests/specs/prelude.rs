// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for lifecycle specs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use poiesis_adapters::{DummyAuthenticator, FakeCluster, MemoryBus, TransferRouter};
use poiesis_api::{build_router, AppState};
use poiesis_core::{CoreConfig, RuntimeEnv, SystemClock, TaskId, TaskState};
use poiesis_engine::{input_filer, orchestrator, output_filer, texam, Ctx};
use poiesis_storage::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub fn spec_config(monitor_timeout: Option<Duration>) -> CoreConfig {
    CoreConfig {
        env: RuntimeEnv::Development,
        namespace: "poiesis".to_string(),
        service_account: "poiesis-sa".to_string(),
        image: "poiesis:latest".to_string(),
        image_pull_policy: "IfNotPresent".to_string(),
        restart_policy: "Never".to_string(),
        job_ttl_seconds: 300,
        pvc_access_mode: "ReadWriteOnce".to_string(),
        pvc_storage_class: None,
        monitor_timeout,
        core_configmap: "poiesis-core".to_string(),
        mongo_secret: None,
        redis_secret: None,
        s3_secret: None,
        infra_security_context: false,
        executor_security_context: false,
        security_context_path: None,
    }
}

#[derive(Clone)]
pub struct World {
    pub store: Arc<MemoryStore>,
    pub bus: MemoryBus,
    pub cluster: FakeCluster,
    pub config: CoreConfig,
    pub router: Router,
}

impl World {
    pub fn new(monitor_timeout: Option<Duration>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = MemoryBus::new();
        let cluster = FakeCluster::new();
        let config = spec_config(monitor_timeout);
        let state = AppState {
            store: store.clone(),
            cluster: Arc::new(cluster.clone()),
            authenticator: Arc::new(DummyAuthenticator),
            config: Arc::new(config.clone()),
        };
        let router = build_router(state);
        Self { store, bus, cluster, config, router }
    }

    pub fn ctx(&self, id: TaskId) -> Ctx {
        Ctx {
            task_id: id,
            config: self.config.clone(),
            store: self.store.clone(),
            bus: Arc::new(self.bus.clone()),
            cluster: Arc::new(self.cluster.clone()),
            clock: SystemClock,
        }
    }

    // ── HTTP helpers ────────────────────────────────────────────────────

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn create_task(&self, token: &str, body: Value) -> TaskId {
        let (status, json) = self.send("POST", "/ga4gh/tes/v1/tasks", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        TaskId::from_string(json["id"].as_str().unwrap())
    }

    pub async fn get_full(&self, token: &str, id: TaskId) -> Value {
        let uri = format!("/ga4gh/tes/v1/tasks/{id}?view=FULL");
        let (status, json) = self.send("GET", &uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json
    }

    pub async fn cancel(&self, token: &str, id: TaskId) {
        let uri = format!("/ga4gh/tes/v1/tasks/{id}:cancel");
        let (status, _) = self.send("POST", &uri, Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    // ── Engine driving ──────────────────────────────────────────────────

    /// Run the orchestrator for `id` with a stand-in Job controller
    /// dispatching phase workloads as their Jobs appear. Returns the
    /// terminal state the orchestrator left the task in.
    pub async fn run_to_terminal(&self, id: TaskId) -> TaskState {
        let dispatcher = tokio::spawn(dispatch_phases(self.clone(), id));
        let state = orchestrator::run(&self.ctx(id)).await.unwrap();
        dispatcher.abort();
        state
    }

    /// Wait (bounded) until some executor pod exists.
    pub async fn wait_for_executor_pod(&self) {
        for _ in 0..2000 {
            if !self.cluster.pod_names().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("no executor pod appeared");
    }
}

/// Stand-in for the cluster's Job controller: run each phase workload
/// once its Job shows up. The short delay lets the orchestrator's
/// subscribe begin before the phase can publish its signal.
async fn dispatch_phases(world: World, id: TaskId) {
    let mut started: HashSet<String> = HashSet::new();
    loop {
        for job in world.cluster.job_names() {
            if !started.insert(job.clone()) {
                continue;
            }
            let ctx = world.ctx(id);
            if job.starts_with("tif-") {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let _ = input_filer::run(&ctx, &TransferRouter::with_local_schemes()).await;
                });
            } else if job.starts_with("texam-") {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let _ = texam::run(&ctx).await;
                });
            } else if job.starts_with("tof-") {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let _ = output_filer::run(&ctx, &TransferRouter::with_local_schemes()).await;
                });
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
