// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workload wiring: resolve configuration, connect the production
//! adapters, run the requested engine entry point.

use std::sync::Arc;

use anyhow::Context as _;
use poiesis_adapters::{
    DummyAuthenticator, KubeDriver, OidcAuthenticator, RedisBus, S3Client, TransferRouter,
};
use poiesis_api::{build_router, AppState};
use poiesis_core::{
    ApiConfig, AuthKind, BusConfig, CoreConfig, MongoConfig, OidcConfig, S3Config, SystemClock,
    TaskId,
};
use poiesis_engine::Ctx;
use poiesis_storage::MongoStore;

/// Serve the TES API until SIGTERM/ctrl-c.
pub async fn serve_api() -> anyhow::Result<()> {
    let config = CoreConfig::from_env()?;
    let api_config = ApiConfig::from_env()?;
    let mongo_config = MongoConfig::from_env()?;

    let store = MongoStore::connect(&mongo_config).await.context("document store")?;
    let cluster = KubeDriver::connect(&config.namespace).await.context("cluster driver")?;
    let authenticator: Arc<dyn poiesis_adapters::Authenticator> = match api_config.auth {
        AuthKind::Dummy => Arc::new(DummyAuthenticator),
        AuthKind::Oidc => Arc::new(OidcAuthenticator::new(OidcConfig::from_env()?)),
    };

    let state = AppState {
        store: Arc::new(store),
        cluster: Arc::new(cluster),
        authenticator,
        config: Arc::new(config),
    };
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", api_config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "serving TES API");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("API shut down");
    Ok(())
}

pub async fn orchestrate(task_id: &str) -> anyhow::Result<()> {
    let ctx = build_ctx(task_id).await?;
    let state = poiesis_engine::orchestrator::run(&ctx).await?;
    tracing::info!(%task_id, %state, "orchestrator finished");
    Ok(())
}

pub async fn file_inputs(task_id: &str) -> anyhow::Result<()> {
    let ctx = build_ctx(task_id).await?;
    let router = transfer_router();
    poiesis_engine::input_filer::run(&ctx, &router).await?;
    Ok(())
}

pub async fn file_outputs(task_id: &str) -> anyhow::Result<()> {
    let ctx = build_ctx(task_id).await?;
    let router = transfer_router();
    poiesis_engine::output_filer::run(&ctx, &router).await?;
    Ok(())
}

pub async fn execute(task_id: &str) -> anyhow::Result<()> {
    let ctx = build_ctx(task_id).await?;
    poiesis_engine::texam::run(&ctx).await?;
    Ok(())
}

/// Connect the production store, bus, and cluster driver.
async fn build_ctx(task_id: &str) -> anyhow::Result<Ctx> {
    anyhow::ensure!(
        !task_id.is_empty() && task_id.len() <= poiesis_core::id::ID_MAX_LEN,
        "malformed task id {task_id:?}"
    );
    let config = CoreConfig::from_env()?;
    let mongo_config = MongoConfig::from_env()?;
    let bus_config = BusConfig::from_env()?;

    let store = MongoStore::connect(&mongo_config).await.context("document store")?;
    let bus = RedisBus::connect(&bus_config).await.context("message broker")?;
    let cluster = KubeDriver::connect(&config.namespace).await.context("cluster driver")?;

    Ok(Ctx {
        task_id: TaskId::from_string(task_id),
        config,
        store: Arc::new(store),
        bus: Arc::new(bus),
        cluster: Arc::new(cluster),
        clock: SystemClock,
    })
}

/// Local schemes always; S3 only when its credentials are present.
fn transfer_router() -> TransferRouter {
    let mut router = TransferRouter::with_local_schemes();
    match S3Config::from_env() {
        Ok(s3_config) => router.register("s3", Arc::new(S3Client::new(&s3_config))),
        Err(e) => tracing::debug!(reason = %e, "s3 scheme not configured"),
    }
    router
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
