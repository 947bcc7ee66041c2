// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message types exchanged with the console.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use swarmload_core::{ConsoleMessageFlags, Properties};

/// Payload of a `StartGrinder` message: the console's overrides for the next
/// test run, merged over the agent's own properties during `PREPARING_RUN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGrinder {
    pub properties: Properties,
    /// Worker number assigned to this agent for the run, or `None` when the
    /// console leaves it unassigned (the agent then defaults to `-1`).
    pub agent_number: Option<i32>,
}

/// Payload of a file-distribution message, consumed by the file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPayload {
    /// Path of the file relative to the file store's root.
    pub relative_path: PathBuf,
    pub contents: Vec<u8>,
}

/// A message received from the console.
///
/// Each variant corresponds to exactly one bit of [`ConsoleMessageFlags`];
/// [`ConsoleMessage::flag`] gives the mapping used by `ConsoleListener` to
/// record arrivals as flag bits rather than queued values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleMessage {
    StartGrinder(StartGrinder),
    Stop,
    Shutdown,
    Reset,
    Distribution(DistributionPayload),
}

impl ConsoleMessage {
    /// The single flag bit this message class sets when it arrives.
    ///
    /// Distribution messages carry no flag of their own: they are consumed
    /// entirely by the file store and never reach the console listener's
    /// flag word.
    pub const fn flag(&self) -> ConsoleMessageFlags {
        match self {
            Self::StartGrinder(_) => ConsoleMessageFlags::START,
            Self::Stop => ConsoleMessageFlags::STOP,
            Self::Shutdown => ConsoleMessageFlags::SHUTDOWN,
            Self::Reset => ConsoleMessageFlags::RESET,
            Self::Distribution(_) => ConsoleMessageFlags::NONE,
        }
    }

    /// True for the message classes the file store claims before they ever
    /// reach the agent's own `ConsoleListener`.
    pub const fn is_distribution(&self) -> bool {
        matches!(self, Self::Distribution(_))
    }
}

/// `AgentProcessReport.state`: the three points in a session's lifecycle the
/// agent reports to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerReportState {
    Started,
    Running,
    Finished,
}

swarmload_core::simple_display! {
    WorkerReportState {
        Started => "STARTED",
        Running => "RUNNING",
        Finished => "FINISHED",
    }
}

/// A status report sent from the agent to the console: on session open,
/// every heartbeat, and session close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProcessReport {
    pub state: WorkerReportState,
    pub cache_high_water_mark: u64,
}

impl AgentProcessReport {
    pub const fn new(state: WorkerReportState, cache_high_water_mark: u64) -> Self {
        Self { state, cache_high_water_mark }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
