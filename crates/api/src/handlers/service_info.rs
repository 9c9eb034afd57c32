// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /service-info` — unauthenticated service description.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;
use crate::TES_VERSION;

#[derive(Debug, Serialize)]
pub struct ServiceType {
    pub group: &'static str,
    pub artifact: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Organization {
    pub name: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub description: &'static str,
    pub organization: Organization,
    pub version: &'static str,
    pub environment: String,
    /// Storage notes, including the documented executor log cap.
    pub storage: Vec<String>,
}

pub async fn get(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        id: "io.poiesis.tes",
        name: "Poiesis",
        service_type: ServiceType { group: "org.ga4gh", artifact: "tes", version: TES_VERSION },
        description: "Task execution service backed by a container orchestration cluster",
        organization: Organization { name: "Poiesis", url: "https://github.com/JaeAeich/poiesis" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.env.to_string(),
        storage: vec![
            "s3, ftp, file and inline-content URLs are supported for task inputs and outputs"
                .to_string(),
            format!(
                "executor stdout/stderr are truncated to {} bytes per stream",
                poiesis_engine::MAX_LOG_BYTES
            ),
        ],
    })
}
