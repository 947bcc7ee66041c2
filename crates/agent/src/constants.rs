// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed timing constants named directly in SPEC_FULL.md §4-§5.

use std::time::Duration;

/// Delay before the first heartbeat after a session starts.
pub const AGENT_HEARTBEAT_DELAY: Duration = Duration::from_secs(1);

/// Interval between `STATE_RUNNING` heartbeats thereafter.
pub const AGENT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Producer slots on the live worker fan-out sender.
pub const AGENT_FANOUT_STREAM_THREAD_COUNT: usize = 4;

/// Grace period granted after the first non-`START` console message during
/// `RUNNING` before `destroy_all_workers` is called.
pub const MAX_SHUTDOWN_MS: u64 = 5000;

/// Default ramp-up period when `grinder.processIncrementInterval` is unset.
pub const DEFAULT_PROCESS_INCREMENT_INTERVAL_MS: u64 = 60_000;
