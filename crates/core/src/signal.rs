// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase hand-off signal carried over the bus.
//!
//! Each phase workload publishes exactly one signal on its channel when
//! it finishes. The bus is a wake-up hint, not a source of truth: a
//! subscriber that misses the signal falls back to store inspection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Ok,
    Error,
}

crate::simple_display! {
    SignalStatus {
        Ok => "ok",
        Error => "error",
    }
}

/// Payload published on `task/<id>/...` channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSignal {
    pub status: SignalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Detail prefix marking an executor non-zero exit.
const EXECUTOR_FAILURE_PREFIX: &str = "executor ";
/// Detail prefix marking cluster preemption.
const PREEMPTION_PREFIX: &str = "preempted";

impl PhaseSignal {
    pub fn ok() -> Self {
        Self { status: SignalStatus::Ok, detail: None }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self { status: SignalStatus::Error, detail: Some(detail.into()) }
    }

    /// Error signal for an executor that exited non-zero. The detail
    /// prefix is how the orchestrator tells `EXECUTOR_ERROR` apart from
    /// `SYSTEM_ERROR` without a second store read.
    pub fn executor_error(index: usize, exit_code: i32) -> Self {
        Self::error(format!("{EXECUTOR_FAILURE_PREFIX}{index} exited with code {exit_code}"))
    }

    /// Error signal for a pod the cluster preempted.
    pub fn preempted(detail: impl Into<String>) -> Self {
        Self::error(format!("{PREEMPTION_PREFIX}: {}", detail.into()))
    }

    pub fn is_ok(&self) -> bool {
        self.status == SignalStatus::Ok
    }

    pub fn is_executor_failure(&self) -> bool {
        self.detail.as_deref().is_some_and(|d| d.starts_with(EXECUTOR_FAILURE_PREFIX))
    }

    pub fn is_preemption(&self) -> bool {
        self.detail.as_deref().is_some_and(|d| d.starts_with(PREEMPTION_PREFIX))
    }

    pub fn detail_or(&self, fallback: &str) -> String {
        self.detail.clone().unwrap_or_else(|| fallback.to_string())
    }
}
