// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router construction.

use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::handlers;
use crate::state::AppState;
use crate::BASE_PATH;

/// Build the full TES router with auth middleware and tracing.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/tasks", post(handlers::tasks::create).get(handlers::tasks::list))
        // TES's cancel URL is `/tasks/{id}:cancel` — one path segment, so
        // the POST handler peels the `:cancel` suffix itself.
        .route("/tasks/:id", get(handlers::tasks::get_one).post(handlers::tasks::cancel))
        .layer(axum_mw::from_fn_with_state(state.clone(), require_bearer));

    let public = Router::new().route("/service-info", get(handlers::service_info::get));

    Router::new()
        .nest(BASE_PATH, public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
