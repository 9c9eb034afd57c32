// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output filer (TOF): collects declared outputs from the task volume.

use poiesis_adapters::transfer::wildcard::expand_output;
use poiesis_adapters::{with_backoff, Backoff, TransferError, TransferRouter};
use poiesis_core::{channel, Clock, Output, OutputFileLog, Phase, PhaseSignal};

use crate::{Ctx, WorkloadError};

/// Upload every declared output, appending an [`OutputFileLog`] per
/// file as it lands. A failure stops the loop; logs already appended
/// remain.
pub async fn run<C: Clock>(ctx: &Ctx<C>, router: &TransferRouter) -> Result<(), WorkloadError> {
    let task = ctx.task().await?;
    let channel_name = channel(Phase::OutputFiler, &ctx.task_id);

    if ctx.cancel_requested().await? {
        ctx.system_log("output collection skipped: cancel requested").await;
        ctx.bus.publish(&channel_name, &PhaseSignal::error("canceled")).await?;
        return Err(WorkloadError::Canceled);
    }

    match collect_all(ctx, &task.outputs, router).await {
        Ok(count) => {
            ctx.system_log(&format!("collected {count} output file(s)")).await;
            ctx.bus.publish(&channel_name, &PhaseSignal::ok()).await?;
            tracing::info!(task_id = %ctx.task_id, count, "outputs collected");
            Ok(())
        }
        Err(e) => {
            let detail = format!("output collection failed: {e}");
            ctx.system_log(&detail).await;
            ctx.bus.publish(&channel_name, &PhaseSignal::error(&detail)).await?;
            Err(e)
        }
    }
}

async fn collect_all<C: Clock>(
    ctx: &Ctx<C>,
    outputs: &[Output],
    router: &TransferRouter,
) -> Result<usize, WorkloadError> {
    let mut uploaded = 0usize;
    for (index, output) in outputs.iter().enumerate() {
        let matches = expand_output(output)
            .map_err(|e| WorkloadError::System(format!("outputs[{index}]: {e}")))?;
        for m in matches {
            let client = router
                .client_for(&m.url)
                .map_err(|e| WorkloadError::System(format!("outputs[{index}]: {e}")))?;
            let size = with_backoff(
                Backoff::default(),
                "upload",
                |e: &TransferError| matches!(e, TransferError::Unavailable(_)),
                || async { client.upload(&m.source, &m.url).await },
            )
            .await
            .map_err(|e| {
                WorkloadError::System(format!("outputs[{index}] {}: {e}", m.source.display()))
            })?;

            ctx.store
                .append_output_log(
                    &ctx.task_id,
                    OutputFileLog {
                        url: m.url.clone(),
                        path: m.source.to_string_lossy().into_owned(),
                        size_bytes: size as i64,
                    },
                )
                .await?;
            uploaded += 1;
            tracing::debug!(url = %m.url, size, "output uploaded");
        }
    }
    Ok(uploaded)
}

#[cfg(test)]
#[path = "output_filer_tests.rs"]
mod tests;
