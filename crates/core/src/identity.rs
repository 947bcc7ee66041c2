// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity: the `(hostName, name, number)` triple a console uses to
//! address this process.

use serde::{Deserialize, Serialize};

/// Identity of this agent as presented to the console.
///
/// `name` defaults from properties and may be overridden per the
/// `grinder.hostID` key; `number` is assigned per test run from the
/// console's start message, or `-1` when running stand-alone. Two
/// identities are equal iff all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub host_name: String,
    pub name: String,
    pub number: i32,
}

/// `number` value meaning "no console-assigned number" (stand-alone agent).
pub const NO_AGENT_NUMBER: i32 = -1;

impl AgentIdentity {
    /// Build an identity defaulting `name` to `host_name` and `number` to
    /// [`NO_AGENT_NUMBER`].
    pub fn new(host_name: impl Into<String>) -> Self {
        let host_name = host_name.into();
        Self { name: host_name.clone(), host_name, number: NO_AGENT_NUMBER }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_number(mut self, number: i32) -> Self {
        self.number = number;
        self
    }

    pub fn is_standalone(&self) -> bool {
        self.number == NO_AGENT_NUMBER
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
