// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bus over tokio broadcast channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use poiesis_core::PhaseSignal;
use tokio::sync::broadcast;

use super::{Bus, BusError};

const CHANNEL_CAPACITY: usize = 16;

/// Broadcast-backed [`Bus`] for tests and single-process development.
///
/// Clones share channels, so one instance wired into every workload
/// behaves like a shared broker.
#[derive(Clone, Default)]
pub struct MemoryBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<PhaseSignal>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<PhaseSignal> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &str, signal: &PhaseSignal) -> Result<(), BusError> {
        // A send with no subscribers is a dropped hint, not an error.
        let _ = self.sender(channel).send(signal.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        timeout: Option<Duration>,
    ) -> Result<PhaseSignal, BusError> {
        let mut rx = self.sender(channel).subscribe();
        let recv = async {
            rx.recv().await.map_err(|e| BusError::Unavailable(e.to_string()))
        };
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, recv).await {
                Ok(result) => result,
                Err(_) => Err(BusError::Timeout),
            },
            None => recv.await,
        }
    }
}
