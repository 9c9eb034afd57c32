// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token authentication.
//!
//! The API hands every request's token to an [`Authenticator`] and gets
//! back the [`Subject`] all per-user scoping hangs off.

mod dummy;
mod oidc;

pub use dummy::DummyAuthenticator;
pub use oidc::OidcAuthenticator;

use async_trait::async_trait;
use thiserror::Error;

/// Authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// The verifier itself is unreachable (issuer discovery, JWKS).
    #[error("authentication unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Subject, AuthError>;
}
