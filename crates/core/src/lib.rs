// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swarmload-core: data model shared by the agent runtime and its wire protocol.

pub mod macros;

pub mod clock;
pub mod connector;
pub mod identity;
pub mod message_flags;
pub mod properties;
pub mod script;
pub mod worker_state;

pub use clock::{Clock, FakeClock, SystemClock};
pub use connector::{Connector, ConnectionType};
pub use identity::AgentIdentity;
pub use message_flags::ConsoleMessageFlags;
pub use properties::{Properties, PropertiesError};
pub use script::ScriptLocation;
pub use worker_state::WorkerState;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
