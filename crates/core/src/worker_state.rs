// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-slot lifecycle state tracked by the worker launcher.

use serde::{Deserialize, Serialize};

/// State of a single worker slot, as tracked by `WorkerLauncher`.
///
/// Transitions are monotone: `Pending -> Starting -> Running -> Finished`,
/// with `Destroyed` reachable from any non-terminal state when the launcher
/// forcibly tears a slot down. `Finished` and `Destroyed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerState {
    /// Slot reserved but no process has been launched yet.
    Pending,
    /// Process launch requested, not yet confirmed running.
    Starting,
    /// Process confirmed running and executing the test script.
    Running,
    /// Process exited on its own after completing its run.
    Finished,
    /// Process was torn down by the launcher before it finished naturally.
    Destroyed,
}

impl WorkerState {
    /// True for `Finished` or `Destroyed` — no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Destroyed)
    }
}

crate::simple_display! {
    WorkerState {
        Pending => "pending",
        Starting => "starting",
        Running => "running",
        Finished => "finished",
        Destroyed => "destroyed",
    }
}

/// `true` iff every slot has reached a terminal state.
///
/// Used by `WorkerLauncher` to decide when a test run has fully wound down:
/// `allFinished` holds exactly when each slot is `Finished` or `Destroyed`.
pub fn all_finished(states: &[WorkerState]) -> bool {
    states.iter().all(|s| s.is_terminal())
}

#[cfg(test)]
#[path = "worker_state_tests.rs"]
mod tests;
