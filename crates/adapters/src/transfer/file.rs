// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `file://` client over the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{walk_files, TransferClient, TransferError};

#[derive(Debug)]
pub struct FileClient;

fn local_path(url: &str) -> Result<PathBuf, TransferError> {
    let rest = url.strip_prefix("file://").ok_or_else(|| TransferError::BadUrl(url.to_string()))?;
    if rest.is_empty() {
        return Err(TransferError::BadUrl(url.to_string()));
    }
    Ok(PathBuf::from(rest))
}

async fn ensure_parent(path: &Path) -> Result<(), TransferError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl TransferClient for FileClient {
    async fn download(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        let source = local_path(url)?;
        if !source.exists() {
            return Err(TransferError::NotFound(url.to_string()));
        }
        ensure_parent(path).await?;
        tokio::fs::copy(&source, path).await?;
        Ok(())
    }

    async fn upload(&self, path: &Path, url: &str) -> Result<u64, TransferError> {
        let dest = local_path(url)?;
        ensure_parent(&dest).await?;
        Ok(tokio::fs::copy(path, &dest).await?)
    }

    async fn list(&self, url: &str) -> Result<Vec<String>, TransferError> {
        let root = local_path(url)?;
        if !root.is_dir() {
            return Err(TransferError::NotFound(url.to_string()));
        }
        let files = walk_files(&root)?;
        Ok(files
            .iter()
            .filter_map(|f| f.strip_prefix(&root).ok())
            .map(|rel| rel.to_string_lossy().into_owned())
            .collect())
    }
}
