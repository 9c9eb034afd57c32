// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handler state.

use std::sync::Arc;

use poiesis_adapters::{Authenticator, ClusterDriver};
use poiesis_core::CoreConfig;
use poiesis_storage::TaskStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub cluster: Arc<dyn ClusterDriver>,
    pub authenticator: Arc<dyn Authenticator>,
    pub config: Arc<CoreConfig>,
}
