// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase hand-off bus.
//!
//! Named channels with publish and timed subscribe. The bus is a
//! wake-up hint, never authoritative: subscribers that time out fall
//! back to reading the store, so a lost message cannot wedge a task.

mod memory;
mod redis;

pub use memory::MemoryBus;
pub use redis::RedisBus;

use async_trait::async_trait;
use poiesis_core::PhaseSignal;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No message arrived within the subscribe deadline.
    #[error("timed out waiting on channel")]
    Timeout,
    #[error("bus unavailable: {0}")]
    Unavailable(String),
    #[error("undecodable bus payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, channel: &str, signal: &PhaseSignal) -> Result<(), BusError>;

    /// Block until the first message published on `channel` after this
    /// call began, or until `timeout` elapses. `None` waits forever.
    async fn subscribe(
        &self,
        channel: &str,
        timeout: Option<Duration>,
    ) -> Result<PhaseSignal, BusError>;
}
