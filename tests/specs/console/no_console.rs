// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 3 (`SPEC_FULL.md` §8): the console endpoint is unreachable but
//! `proceedWithoutConsole` is set, so the loop skips `AWAITING_START`
//! entirely, builds workers from local properties, and the agent's
//! identity number defaults to -1 (no console ever assigned one).

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use swarmload_agent::control_loop::AgentControlLoop;
use swarmload_core::identity::NO_AGENT_NUMBER;
use swarmload_core::SystemClock;
use tempfile::tempdir;

use crate::support::{self, TEST_HOSTNAME};

#[tokio::test]
#[serial]
async fn unreachable_console_with_proceed_runs_workers_standalone() {
    std::env::set_var("SWARMLOAD_HOSTNAME", TEST_HOSTNAME);

    let home = tempdir().expect("tempdir");
    let script_path = home.path().join("standalone.py");
    std::fs::write(&script_path, "").expect("write script");

    // Bind and immediately drop a loopback listener so the port is (almost
    // certainly) refused rather than merely slow to time out.
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };

    let mut config = support::test_config(home.path(), closed_port);
    config.proceed_without_console = true;
    config.properties.set("grinder.script", script_path.to_string_lossy().into_owned());

    let control_loop = Arc::new(AgentControlLoop::new(config, SystemClock));
    let runner = control_loop.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    // No console session is ever built, so DRAINING's `session_dead` check
    // is immediately true and the loop terminates on its own.
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run() should terminate without any external signal")
        .expect("run() task should not panic");
    assert!(result.is_ok());

    assert_eq!(control_loop.identity().number, NO_AGENT_NUMBER);

    std::env::remove_var("SWARMLOAD_HOSTNAME");
}
