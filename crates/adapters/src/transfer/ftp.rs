// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FTP client, anonymous by default.

use std::path::Path;

use async_trait::async_trait;
use suppaftp::AsyncFtpStream;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

use super::{TransferClient, TransferError};

#[derive(Debug)]
pub struct FtpClient;

struct FtpUrl {
    user: String,
    password: String,
    host: String,
    port: u16,
    path: String,
}

fn unavailable(e: impl std::fmt::Display) -> TransferError {
    TransferError::Unavailable(e.to_string())
}

fn parse_ftp_url(url: &str) -> Result<FtpUrl, TransferError> {
    let rest = url.strip_prefix("ftp://").ok_or_else(|| TransferError::BadUrl(url.to_string()))?;
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (credentials, host_port) = match authority.rsplit_once('@') {
        Some((creds, hp)) => (Some(creds), hp),
        None => (None, authority),
    };
    let (user, password) = match credentials {
        Some(creds) => match creds.split_once(':') {
            Some((u, p)) => (u.to_string(), p.to_string()),
            None => (creds.to_string(), String::new()),
        },
        None => ("anonymous".to_string(), "anonymous".to_string()),
    };
    let (host, port) = match host_port.split_once(':') {
        Some((h, p)) => {
            (h.to_string(), p.parse().map_err(|_| TransferError::BadUrl(url.to_string()))?)
        }
        None => (host_port.to_string(), 21),
    };
    if host.is_empty() {
        return Err(TransferError::BadUrl(url.to_string()));
    }
    Ok(FtpUrl { user, password, host, port, path: format!("/{path}") })
}

async fn connect(target: &FtpUrl) -> Result<AsyncFtpStream, TransferError> {
    let mut stream = AsyncFtpStream::connect(format!("{}:{}", target.host, target.port))
        .await
        .map_err(unavailable)?;
    stream.login(&target.user, &target.password).await.map_err(unavailable)?;
    stream.transfer_type(suppaftp::types::FileType::Binary).await.map_err(unavailable)?;
    Ok(stream)
}

#[async_trait]
impl TransferClient for FtpClient {
    async fn download(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        let target = parse_ftp_url(url)?;
        let mut stream = connect(&target).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        let mut reader = stream.retr_as_stream(&target.path).await.map_err(unavailable)?;
        futures_util::io::copy(&mut reader, &mut file.compat_write())
            .await
            .map_err(TransferError::Io)?;
        stream.finalize_retr_stream(reader).await.map_err(unavailable)?;
        stream.quit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn upload(&self, path: &Path, url: &str) -> Result<u64, TransferError> {
        let target = parse_ftp_url(url)?;
        let size = tokio::fs::metadata(path).await?.len();
        let mut stream = connect(&target).await?;

        let file = tokio::fs::File::open(path).await?;
        let mut writer = stream.put_with_stream(&target.path).await.map_err(unavailable)?;
        let mut reader = file.compat();
        futures_util::io::copy(&mut reader, &mut writer).await.map_err(TransferError::Io)?;
        stream.finalize_put_stream(writer).await.map_err(unavailable)?;
        stream.quit().await.map_err(unavailable)?;
        Ok(size)
    }

    /// Flat name listing of a directory. Nested FTP trees are outside
    /// what anonymous mirrors commonly serve.
    async fn list(&self, url: &str) -> Result<Vec<String>, TransferError> {
        let target = parse_ftp_url(url)?;
        let mut stream = connect(&target).await?;
        let names = stream.nlst(Some(&target.path)).await.map_err(unavailable)?;
        stream.quit().await.map_err(unavailable)?;
        Ok(names
            .into_iter()
            .map(|name| {
                name.strip_prefix(target.path.trim_end_matches('/'))
                    .map(|rel| rel.trim_start_matches('/').to_string())
                    .unwrap_or(name)
            })
            .filter(|name| !name.is_empty())
            .collect())
    }
}
