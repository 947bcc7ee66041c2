// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the console and the agent runtime.
//!
//! Messages are tagged JSON (`#[serde(tag = "type")]`); framing and
//! transport live in `swarmload-agent`, not here.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod dispatch;
mod message;

pub use dispatch::{Dispatcher, HandlerOutcome};
pub use message::{
    AgentProcessReport, ConsoleMessage, DistributionPayload, StartGrinder, WorkerReportState,
};
