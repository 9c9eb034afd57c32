// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::TaskState::*;
use super::*;
use proptest::prelude::*;

const ALL: [TaskState; 11] = [
    Unknown,
    Queued,
    Initializing,
    Running,
    Paused,
    Complete,
    ExecutorError,
    SystemError,
    Canceled,
    Canceling,
    Preempted,
];

#[yare::parameterized(
    queued_to_initializing   = { Queued, Initializing },
    initializing_to_running  = { Initializing, Running },
    running_to_complete      = { Running, Complete },
    queued_to_system_error   = { Queued, SystemError },
    running_to_executor_err  = { Running, ExecutorError },
    initializing_to_preempt  = { Initializing, Preempted },
    paused_to_canceling      = { Paused, Canceling },
    queued_to_canceling      = { Queued, Canceling },
    canceling_to_canceled    = { Canceling, Canceled },
)]
fn legal_edges(from: TaskState, to: TaskState) {
    assert!(from.may_transition(to), "{from} -> {to} should be legal");
}

#[yare::parameterized(
    complete_to_running      = { Complete, Running },
    canceled_to_canceling    = { Canceled, Canceling },
    queued_to_complete       = { Queued, Complete },
    running_to_initializing  = { Running, Initializing },
    queued_to_running        = { Queued, Running },
    canceling_to_complete    = { Canceling, Complete },
    system_error_to_anything = { SystemError, Queued },
    canceling_to_canceling   = { Canceling, Canceling },
)]
fn illegal_edges(from: TaskState, to: TaskState) {
    assert!(!from.may_transition(to), "{from} -> {to} should be illegal");
    let err = from.transition(to).unwrap_err();
    assert_eq!(err, TransitionError { from, to });
}

#[test]
fn terminal_states() {
    for s in [Complete, ExecutorError, SystemError, Canceled, Preempted] {
        assert!(s.is_terminal());
    }
    for s in [Unknown, Queued, Initializing, Running, Paused, Canceling] {
        assert!(!s.is_terminal());
    }
}

#[test]
fn serde_uses_screaming_snake_case() {
    assert_eq!(serde_json::to_string(&ExecutorError).unwrap(), "\"EXECUTOR_ERROR\"");
    let s: TaskState = serde_json::from_str("\"CANCELING\"").unwrap();
    assert_eq!(s, Canceling);
}

proptest! {
    /// No edge ever leaves a terminal state.
    #[test]
    fn terminal_states_are_sinks(from_idx in 0..ALL.len(), to_idx in 0..ALL.len()) {
        let (from, to) = (ALL[from_idx], ALL[to_idx]);
        if from.is_terminal() {
            prop_assert!(!from.may_transition(to));
        }
    }

    /// Any random walk through `transition` stays on graph edges, so an
    /// observed state sequence is always a path in the graph.
    #[test]
    fn random_walks_stay_on_graph(steps in proptest::collection::vec(0..ALL.len(), 0..24)) {
        let mut state = Queued;
        for idx in steps {
            let next = ALL[idx];
            if let Ok(s) = state.transition(next) {
                prop_assert!(state.may_transition(s));
                state = s;
            }
        }
    }
}
