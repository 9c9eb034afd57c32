// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input filer (TIF): stages declared inputs onto the task volume.

use std::path::Path;

use poiesis_adapters::{
    join_url, with_backoff, Backoff, ContentClient, TransferError, TransferRouter,
};
use poiesis_core::{channel, Clock, Input, IoType, Phase, PhaseSignal};

use crate::{Ctx, WorkloadError};

/// Stage every input in order, then publish the phase signal. Exits
/// non-zero (an `Err`) if any input fails; inputs staged before the
/// failure stay on the volume.
pub async fn run<C: Clock>(ctx: &Ctx<C>, router: &TransferRouter) -> Result<(), WorkloadError> {
    let task = ctx.task().await?;
    let channel_name = channel(Phase::InputFiler, &ctx.task_id);

    if ctx.cancel_requested().await? {
        ctx.system_log("input staging skipped: cancel requested").await;
        ctx.bus.publish(&channel_name, &PhaseSignal::error("canceled")).await?;
        return Err(WorkloadError::Canceled);
    }

    match stage_all(&task.inputs, router).await {
        Ok(()) => {
            ctx.system_log(&format!("staged {} input(s)", task.inputs.len())).await;
            ctx.bus.publish(&channel_name, &PhaseSignal::ok()).await?;
            tracing::info!(task_id = %ctx.task_id, count = task.inputs.len(), "inputs staged");
            Ok(())
        }
        Err(e) => {
            let detail = format!("input staging failed: {e}");
            ctx.system_log(&detail).await;
            ctx.bus.publish(&channel_name, &PhaseSignal::error(&detail)).await?;
            Err(e)
        }
    }
}

async fn stage_all(inputs: &[Input], router: &TransferRouter) -> Result<(), WorkloadError> {
    for (index, input) in inputs.iter().enumerate() {
        stage_one(input, router)
            .await
            .map_err(|e| WorkloadError::System(format!("inputs[{index}]: {e}")))?;
        tracing::debug!(index, path = %input.path, "input staged");
    }
    Ok(())
}

async fn stage_one(input: &Input, router: &TransferRouter) -> Result<(), TransferError> {
    if let Some(content) = &input.content {
        return ContentClient.stage(content, Path::new(&input.path)).await;
    }
    // Validation guarantees a url when content is absent
    let url = input.url.as_deref().unwrap_or_default();
    let client = router.client_for(url)?;

    match input.r#type {
        IoType::File => download(router, url, Path::new(&input.path)).await,
        IoType::Directory => {
            let keys = client.list(url).await?;
            if keys.is_empty() {
                tokio::fs::create_dir_all(&input.path).await?;
                return Ok(());
            }
            for key in keys {
                let dest = Path::new(&input.path).join(&key);
                download(router, &join_url(url, &key), &dest).await?;
            }
            Ok(())
        }
    }
}

async fn download(
    router: &TransferRouter,
    url: &str,
    dest: &Path,
) -> Result<(), TransferError> {
    let client = router.client_for(url)?;
    with_backoff(
        Backoff::default(),
        "download",
        |e: &TransferError| matches!(e, TransferError::Unavailable(_)),
        || async { client.download(url, dest).await },
    )
    .await
}

#[cfg(test)]
#[path = "input_filer_tests.rs"]
mod tests;
