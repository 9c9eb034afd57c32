// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The `poiesis` binary: one subcommand per engine workload.
//!
//! The API serves HTTP; the orchestrator, filers, and TExAM each run as
//! a single-shot cluster Job and exit non-zero on failure so the Job
//! status reflects the outcome.

mod workloads;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "poiesis", version, about = "GA4GH Task Execution Service for Kubernetes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the TES v1.1.0 HTTP API
    Api,
    /// Drive one task's lifecycle to a terminal state
    Orchestrator(TaskArgs),
    /// Stage inputs onto, or collect outputs from, the task volume
    Filer {
        #[command(subcommand)]
        direction: FilerDirection,
    },
    /// Run the task's executors in order and record their logs
    Texam(TaskArgs),
}

#[derive(Debug, Subcommand)]
enum FilerDirection {
    Input(TaskArgs),
    Output(TaskArgs),
}

#[derive(Debug, Args)]
struct TaskArgs {
    /// Task to operate on; injected into workload Jobs as POIESIS_TASK_ID
    #[arg(long = "task-id", env = "POIESIS_TASK_ID")]
    task_id: String,
}

fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Api => workloads::serve_api().await,
        Command::Orchestrator(args) => workloads::orchestrate(&args.task_id).await,
        Command::Filer { direction: FilerDirection::Input(args) } => {
            workloads::file_inputs(&args.task_id).await
        }
        Command::Filer { direction: FilerDirection::Output(args) } => {
            workloads::file_outputs(&args.task_id).await
        }
        Command::Texam(args) => workloads::execute(&args.task_id).await,
    }
}
