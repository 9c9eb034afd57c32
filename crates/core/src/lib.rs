// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! poiesis-core: task model, state machine, and shared plumbing for the
//! Poiesis task execution engine.

pub mod macros;

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod names;
pub mod signal;
pub mod state;
pub mod task;
pub mod validate;
pub mod view;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ApiConfig, AuthKind, BusConfig, ConfigError, CoreConfig, MongoConfig, OidcConfig, RuntimeEnv,
    S3Config,
};
pub use error::ValidationError;
pub use id::TaskId;
pub use names::{channel, executor_pod_name, job_name, pvc_name, Phase};
pub use signal::{PhaseSignal, SignalStatus};
pub use state::{TaskState, TransitionError};
#[cfg(any(test, feature = "test-support"))]
pub use task::{ExecutorBuilder, InputBuilder, OutputBuilder, TaskBuilder};
pub use task::{
    Executor, ExecutorLog, Input, IoType, Output, OutputFileLog, Resources, Task, TaskLog,
    TaskRequest,
};
pub use validate::validate_task;
pub use view::View;
