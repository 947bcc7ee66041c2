// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{AgentIdentity, ConnectionType, Connector, Properties, ScriptLocation, WorkerState};
use std::path::PathBuf;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core data-model types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::WorkerState;
    use proptest::prelude::*;

    pub fn arb_worker_state() -> impl Strategy<Value = WorkerState> {
        prop_oneof![
            Just(WorkerState::Pending),
            Just(WorkerState::Starting),
            Just(WorkerState::Running),
            Just(WorkerState::Finished),
            Just(WorkerState::Destroyed),
        ]
    }

    pub fn arb_properties_entry() -> impl Strategy<Value = (String, String)> {
        ("[a-z][a-z0-9._-]{0,16}", "[^\n\r]{0,32}")
    }
}

// ── Factory functions ────────────────────────────────────────────────────

/// A minimal agent identity, named `test-agent`, with no console-assigned number.
pub fn standalone_identity() -> AgentIdentity {
    AgentIdentity::new("test-agent")
}

/// An agent identity as it would appear after a console start message
/// assigned it number `number`.
pub fn numbered_identity(number: i32) -> AgentIdentity {
    AgentIdentity::new("test-agent").with_number(number)
}

/// A console connector pointing at `127.0.0.1:16001`, the agent-session port.
pub fn test_connector() -> Connector {
    Connector::new("127.0.0.1", 16001, ConnectionType::Agent)
}

/// An empty `Properties` rooted at a fake `agent.properties` path under `dir`.
pub fn test_properties(dir: &std::path::Path) -> Properties {
    Properties::with_base_file(dir.join("agent.properties"))
}

/// A script location under `dir/scripts`, pointing at `dir/scripts/hello.py`.
pub fn test_script(dir: &std::path::Path) -> ScriptLocation {
    let directory = dir.join("scripts");
    let file = directory.join("hello.py");
    ScriptLocation::new(directory, file).expect("script file is under script directory")
}

/// `count` worker slots, all in `Pending` state.
pub fn pending_slots(count: usize) -> Vec<WorkerState> {
    vec![WorkerState::Pending; count]
}

/// Resolve `name` relative to a fresh `tempfile::TempDir`-style root; callers
/// that need an actual temp directory should use `tempfile::tempdir()`
/// directly and pass its path here for script/properties fixtures.
pub fn fixture_path(root: &std::path::Path, name: &str) -> PathBuf {
    root.join(name)
}
