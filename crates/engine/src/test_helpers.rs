// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use std::sync::Arc;
use std::time::Duration;

use poiesis_adapters::{Bus, FakeCluster, MemoryBus};
use poiesis_core::{
    channel, CoreConfig, FakeClock, Phase, PhaseSignal, RuntimeEnv, TaskId, TaskRequest,
};
use poiesis_storage::{MemoryStore, TaskStore};

use crate::Ctx;

pub fn test_config() -> CoreConfig {
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
        monitor_timeout: Some(Duration::from_millis(20)),
        core_configmap: "poiesis-core".to_string(),
        mongo_secret: Some("poiesis-mongo".to_string()),
        redis_secret: Some("poiesis-redis".to_string()),
        s3_secret: Some("poiesis-s3".to_string()),
        infra_security_context: false,
        executor_security_context: false,
        security_context_path: None,
    }
}

pub struct Harness {
    pub ctx: Ctx<FakeClock>,
    pub store: Arc<MemoryStore<FakeClock>>,
    pub bus: MemoryBus,
    pub cluster: FakeCluster,
    pub clock: FakeClock,
}

impl Harness {
    /// Create a harness around a freshly persisted `QUEUED` task.
    pub async fn with_task(request: TaskRequest) -> Self {
        let clock = FakeClock::new();
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let bus = MemoryBus::new();
        let cluster = FakeCluster::new();
        let task_id = store.create("user-test", request).await.unwrap();
        let ctx = Ctx {
            task_id,
            config: test_config(),
            store: store.clone(),
            bus: Arc::new(bus.clone()),
            cluster: Arc::new(cluster.clone()),
            clock: clock.clone(),
        };
        Self { ctx, store, bus, cluster, clock }
    }

    pub fn task_id(&self) -> TaskId {
        self.ctx.task_id
    }

    /// Subscribe to a phase channel before the workload under test runs.
    pub fn listen(&self, phase: Phase) -> tokio::task::JoinHandle<PhaseSignal> {
        let bus = self.bus.clone();
        let channel_name = channel(phase, &self.ctx.task_id);
        tokio::spawn(async move {
            bus.subscribe(&channel_name, Some(Duration::from_secs(5))).await.unwrap()
        })
    }

    /// Pod name the fake cluster reports for a phase Job.
    pub fn phase_pod(&self, phase: Phase) -> String {
        format!("{}-pod", poiesis_core::job_name(phase, &self.ctx.task_id))
    }
}
