// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synthetic client for inline `content` inputs.
//!
//! "Download" writes the literal bytes it was handed; there is no
//! upload direction and nothing to list.

use std::path::Path;

use async_trait::async_trait;

use super::{TransferClient, TransferError};

#[derive(Debug)]
pub struct ContentClient;

impl ContentClient {
    /// Write an inline literal to the task volume.
    pub async fn stage(&self, content: &str, path: &Path) -> Result<(), TransferError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl TransferClient for ContentClient {
    async fn download(&self, literal: &str, path: &Path) -> Result<(), TransferError> {
        self.stage(literal, path).await
    }

    async fn upload(&self, _path: &Path, _url: &str) -> Result<u64, TransferError> {
        Err(TransferError::Unsupported("upload of inline content"))
    }

    async fn list(&self, _url: &str) -> Result<Vec<String>, TransferError> {
        Err(TransferError::Unsupported("listing inline content"))
    }
}
