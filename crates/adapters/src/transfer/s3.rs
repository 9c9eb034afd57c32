// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3-compatible client.
//!
//! Credentials come from [`S3Config`] (environment or mounted secret).
//! Uploads above [`MULTIPART_THRESHOLD`] go through the multipart API.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use poiesis_core::S3Config;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{TransferClient, TransferError};

/// Files larger than this are uploaded in parts of this size.
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

#[derive(Debug)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

fn unavailable(e: impl std::fmt::Display) -> TransferError {
    TransferError::Unavailable(e.to_string())
}

/// Split `s3://bucket/key` into `(bucket, key)`.
fn parse_s3_url(url: &str) -> Result<(&str, &str), TransferError> {
    let rest = url.strip_prefix("s3://").ok_or_else(|| TransferError::BadUrl(url.to_string()))?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(TransferError::BadUrl(url.to_string()));
    }
    Ok((bucket, key))
}

impl S3Client {
    pub fn new(config: &S3Config) -> Self {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "poiesis");
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(&config.url)
            .credentials_provider(credentials)
            .force_path_style(config.path_style)
            .build();
        Self { client: aws_sdk_s3::Client::from_conf(sdk_config) }
    }

    async fn upload_multipart(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        size: u64,
    ) -> Result<(), TransferError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(unavailable)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| TransferError::Unavailable("missing multipart upload id".to_string()))?
            .to_string();

        let mut file = tokio::fs::File::open(path).await?;
        let mut remaining = size;
        let mut part_number = 1i32;
        let mut completed = Vec::new();
        while remaining > 0 {
            let chunk_len = remaining.min(MULTIPART_THRESHOLD) as usize;
            let mut buffer = vec![0u8; chunk_len];
            file.read_exact(&mut buffer).await?;
            remaining -= chunk_len as u64;

            let part = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buffer))
                .send()
                .await
                .map_err(unavailable)?;
            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(part.e_tag().map(str::to_string))
                    .build(),
            );
            part_number += 1;
        }

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder().set_parts(Some(completed)).build(),
            )
            .send()
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl TransferClient for S3Client {
    async fn download(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        let (bucket, key) = parse_s3_url(url)?;
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                aws_sdk_s3::operation::get_object::GetObjectError::NoSuchKey(_) => {
                    TransferError::NotFound(url.to_string())
                }
                other => unavailable(other),
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        let mut body = object.body;
        while let Some(chunk) = body.try_next().await.map_err(unavailable)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn upload(&self, path: &Path, url: &str) -> Result<u64, TransferError> {
        let (bucket, key) = parse_s3_url(url)?;
        let size = tokio::fs::metadata(path).await?.len();
        if size > MULTIPART_THRESHOLD {
            self.upload_multipart(path, bucket, key, size).await?;
        } else {
            let body = ByteStream::from_path(path).await.map_err(unavailable)?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(unavailable)?;
        }
        Ok(size)
    }

    async fn list(&self, url: &str) -> Result<Vec<String>, TransferError> {
        let (bucket, key) = parse_s3_url(url)?;
        let prefix =
            if key.is_empty() || key.ends_with('/') { key.to_string() } else { format!("{key}/") };
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(unavailable)?;
            for object in page.contents() {
                if let Some(full_key) = object.key() {
                    if let Some(relative) = full_key.strip_prefix(&prefix) {
                        if !relative.is_empty() {
                            keys.push(relative.to_string());
                        }
                    }
                }
            }
            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }
        Ok(keys)
    }
}
