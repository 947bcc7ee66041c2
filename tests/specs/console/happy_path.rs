// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario 1 (`SPEC_FULL.md` §8): console accepts, sends a `StartGrinder`
//! for an already-distributed script, the worker pool runs to completion,
//! and `Stop` cleanly ends the session with exactly one `STARTED` and one
//! `FINISHED` report.

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
async fn happy_path_no_rampup_reports_started_then_finished() {
    std::env::set_var("SWARMLOAD_HOSTNAME", TEST_HOSTNAME);

    let home = tempdir().expect("tempdir");
    let mut console = FakeConsole::start().await;
    let config = support::test_config(home.path(), console.port);
    support::seed_script(&config, "a.py");

    let control_loop = Arc::new(AgentControlLoop::new(config, SystemClock));
    let runner = control_loop.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    let started = console.next_report().await;
    assert_eq!(started.state, WorkerReportState::Started);

    let mut start_properties = Properties::new();
    start_properties.set("grinder.script", "a.py");
    start_properties.set("grinder.processes", "2");
    console.send(ConsoleMessage::StartGrinder(StartGrinder {
        properties: start_properties,
        agent_number: Some(3),
    }));

    // Workers under `debug.singleprocess` complete near-instantly, so the
    // loop reaches DRAINING and idles well before any heartbeat would fire.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(control_loop.identity().number, 3);

    console.send(ConsoleMessage::Stop);

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run() should terminate once STOP is processed")
        .expect("run() task should not panic");
    assert!(result.is_ok());

    let finished = console.wait_for_report(WorkerReportState::Finished).await;
    assert_eq!(finished.state, WorkerReportState::Finished);

    std::env::remove_var("SWARMLOAD_HOSTNAME");
}
