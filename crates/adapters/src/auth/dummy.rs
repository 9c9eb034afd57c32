// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Development authenticator: any non-empty bearer token is accepted
//! and the token string itself is the subject.

use async_trait::async_trait;

use super::{AuthError, Authenticator, Subject};

#[derive(Clone, Default)]
pub struct DummyAuthenticator;

#[async_trait]
impl Authenticator for DummyAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Subject, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken("empty bearer token".to_string()));
        }
        Ok(Subject { user_id: token.to_string() })
    }
}
