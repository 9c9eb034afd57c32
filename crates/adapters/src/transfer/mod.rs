// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object transfer — byte movement between the task volume and
//! external storage, polymorphic over URL scheme.
//!
//! # Module layout
//!
//! - [`file`] — `file://` local filesystem client
//! - [`content`] — synthetic inline-literal client
//! - [`s3`] — S3-compatible client
//! - [`ftp`] — anonymous-by-default FTP client
//! - [`wildcard`] — output glob expansion and URL construction

mod content;
mod file;
mod ftp;
mod s3;
pub mod wildcard;

pub use content::ContentClient;
pub use file::FileClient;
pub use ftp::FtpClient;
pub use s3::S3Client;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("no client registered for scheme {0:?}")]
    UnknownScheme(String),
    #[error("malformed url {0:?}")]
    BadUrl(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("{0} is not supported by this scheme")]
    Unsupported(&'static str),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Byte-level transfer capabilities of one URL scheme.
#[async_trait]
pub trait TransferClient: Send + Sync + std::fmt::Debug {
    /// Fetch `url` to a local `path`, creating parent directories.
    async fn download(&self, url: &str, path: &Path) -> Result<(), TransferError>;

    /// Store the file at `path` under `url`, returning its size in bytes.
    async fn upload(&self, path: &Path, url: &str) -> Result<u64, TransferError>;

    /// Keys under the `url` prefix, relative to it. Used for recursive
    /// directory downloads.
    async fn list(&self, url: &str) -> Result<Vec<String>, TransferError>;
}

/// Scheme-dispatch table. Data-driven so tests can register fakes.
#[derive(Clone, Default)]
pub struct TransferRouter {
    schemes: HashMap<String, Arc<dyn TransferClient>>,
}

impl TransferRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the built-in local schemes (`file://`, `ftp://`).
    /// S3 is added by the caller once credentials are resolved.
    pub fn with_local_schemes() -> Self {
        let mut router = Self::new();
        router.register("file", Arc::new(FileClient));
        router.register("ftp", Arc::new(FtpClient));
        router
    }

    pub fn register(&mut self, scheme: &str, client: Arc<dyn TransferClient>) {
        self.schemes.insert(scheme.to_string(), client);
    }

    pub fn client_for(&self, url: &str) -> Result<&Arc<dyn TransferClient>, TransferError> {
        let scheme = scheme_of(url).ok_or_else(|| TransferError::BadUrl(url.to_string()))?;
        self.schemes
            .get(scheme)
            .ok_or_else(|| TransferError::UnknownScheme(scheme.to_string()))
    }
}

/// The scheme of a URL, if it has one.
pub fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once("://")?;
    (!scheme.is_empty()).then_some(scheme)
}

/// Join a directory URL and a relative path with exactly one slash.
pub fn join_url(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
}

/// Every regular file under `dir`, recursively, in sorted order.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, TransferError> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
