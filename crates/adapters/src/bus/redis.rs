// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis pub/sub bus binding.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use poiesis_core::{BusConfig, PhaseSignal};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{Bus, BusError};

pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl From<redis::RedisError> for BusError {
    fn from(e: redis::RedisError) -> Self {
        BusError::Unavailable(e.to_string())
    }
}

impl RedisBus {
    pub async fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let client = redis::Client::open(config.connection_uri())?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        tracing::info!(host = %config.host, port = config.port, "connected to message broker");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, signal: &PhaseSignal) -> Result<(), BusError> {
        let payload =
            serde_json::to_string(signal).map_err(|e| BusError::Decode(e.to_string()))?;
        let mut conn = self.publisher.clone();
        let _: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        timeout: Option<Duration>,
    ) -> Result<PhaseSignal, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        let wait = async {
            let mut stream = pubsub.on_message();
            loop {
                let msg = stream
                    .next()
                    .await
                    .ok_or_else(|| BusError::Unavailable("subscription closed".to_string()))?;
                let payload: String =
                    msg.get_payload().map_err(|e| BusError::Decode(e.to_string()))?;
                match serde_json::from_str::<PhaseSignal>(&payload) {
                    Ok(signal) => return Ok(signal),
                    // Foreign payloads on our channel are ignored, not fatal
                    Err(e) => {
                        tracing::warn!(%channel, error = %e, "ignoring undecodable bus payload");
                    }
                }
            }
        };
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => Err(BusError::Timeout),
            },
            None => wait.await,
        }
    }
}
