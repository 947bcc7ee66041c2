// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 4 (`SPEC_FULL.md` §8): a `StartGrinder` arrives mid-session
//! carrying a different console host/port (with `agent.useSameConsole`
//! turned off so the override isn't immediately overwritten). The current
//! session must be shut down (`FINISHED` sent to the old console) before a
//! new one is built against the new address (`STARTED` sent to the new
//! console), and the run then proceeds normally from there.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use swarmload_agent::control_loop::AgentControlLoop;
use swarmload_core::{Properties, SystemClock};
use swarmload_wire::{ConsoleMessage, StartGrinder, WorkerReportState};
use tempfile::tempdir;

use crate::support::{self, FakeConsole, TEST_HOSTNAME};

#[tokio::test]
#[serial]
async fn start_message_with_new_console_host_rebuilds_the_session() {
    std::env::set_var("SWARMLOAD_HOSTNAME", TEST_HOSTNAME);

    let home = tempdir().expect("tempdir");
    let mut first_console = FakeConsole::start().await;
    let config = support::test_config(home.path(), first_console.port);
    support::seed_script(&config, "a.py");

    let control_loop = Arc::new(AgentControlLoop::new(config, SystemClock));
    let runner = control_loop.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let started = first_console.next_report().await;
    assert_eq!(started.state, WorkerReportState::Started);

    let mut first_start = Properties::new();
    first_start.set("agent.useSameConsole", "false");
    first_start.set("grinder.script", "a.py");
    first_console.send(ConsoleMessage::StartGrinder(StartGrinder {
        properties: first_start,
        agent_number: Some(1),
    }));

    // The first run's in-process worker finishes almost immediately; give
    // the loop time to reach DRAINING and re-block in `waitForMessage`.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(control_loop.identity().number, 1);

    let mut second_console = FakeConsole::start().await;
    let mut second_properties = Properties::new();
    second_properties.set("agent.useSameConsole", "false");
    second_properties.set("grinder.consoleHost", "127.0.0.1");
    second_properties.set("grinder.consolePort", second_console.port.to_string());
    second_properties.set("grinder.script", "a.py");
    first_console.send(ConsoleMessage::StartGrinder(StartGrinder {
        properties: second_properties,
        agent_number: Some(2),
    }));

    // The old session is shut down before the new one is built.
    let old_finished = first_console.wait_for_report(WorkerReportState::Finished).await;
    assert_eq!(old_finished.state, WorkerReportState::Finished);

    let new_started = second_console.next_report().await;
    assert_eq!(new_started.state, WorkerReportState::Started);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(control_loop.identity().number, 2);

    second_console.send(ConsoleMessage::Stop);

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run() should terminate once the new session sees STOP")
        .expect("run() task should not panic");
    assert!(result.is_ok());

    std::env::remove_var("SWARMLOAD_HOSTNAME");
}
