// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! poiesis-adapters: bindings to the engine's external collaborators.
//!
//! Each seam is a trait (`Bus`, `ClusterDriver`, `TransferClient`,
//! `Authenticator`) with a production implementation and, behind the
//! `test-support` feature, a fake the engine tests drive directly.

pub mod auth;
pub mod bus;
pub mod cluster;
pub mod retry;
pub mod transfer;

pub use auth::{AuthError, Authenticator, DummyAuthenticator, OidcAuthenticator, Subject};
pub use bus::{Bus, BusError, MemoryBus, RedisBus};
#[cfg(any(test, feature = "test-support"))]
pub use cluster::FakeCluster;
pub use cluster::{
    ClusterDriver, ClusterError, KubeDriver, MountSpec, PodOutcome, PodPhase, PvcSpec,
    ResourceRequest, SecretEnvSpec, WorkloadKind, WorkloadSpec,
};
pub use retry::{with_backoff, Backoff};
pub use transfer::{
    join_url, scheme_of, ContentClient, FileClient, FtpClient, S3Client, TransferClient,
    TransferError, TransferRouter,
};
