// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped exponential backoff for transient driver errors.
//!
//! The engine never retries failed *phases*; this helper only papers
//! over transient store/bus/cluster hiccups at the call site before the
//! failure is promoted to a system error.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { attempts: 3, base: Duration::from_millis(500), cap: Duration::from_secs(5) }
    }
}

impl Backoff {
    /// Delay before the retry following attempt `n` (0-based).
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Run `op` up to `policy.attempts` times, sleeping between attempts,
/// retrying only while `retryable` holds for the error.
pub async fn with_backoff<T, E, Fut>(
    policy: Backoff,
    what: &str,
    retryable: impl Fn(&E) -> bool,
    mut op: impl FnMut() -> Fut,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.attempts && retryable(&e) => {
                let delay = policy.delay(attempt);
                tracing::warn!(%what, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
