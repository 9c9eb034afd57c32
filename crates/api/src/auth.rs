// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates it against the
//! configured authenticator, and injects the [`Subject`] into request
//! extensions. Everything except `/service-info` sits behind this.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("expected 'Bearer <token>' Authorization header".to_string())
    })?;

    let subject = state.authenticator.authenticate(token).await?;
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}
