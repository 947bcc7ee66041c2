// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use swarmload_core::Properties;

#[test]
fn start_grinder_maps_to_start_flag() {
    let msg = ConsoleMessage::StartGrinder(StartGrinder {
        properties: Properties::new(),
        agent_number: Some(3),
    });
    assert_eq!(msg.flag(), ConsoleMessageFlags::START);
    assert!(!msg.is_distribution());
}

#[test]
fn stop_shutdown_reset_map_to_their_own_bit() {
    assert_eq!(ConsoleMessage::Stop.flag(), ConsoleMessageFlags::STOP);
    assert_eq!(ConsoleMessage::Shutdown.flag(), ConsoleMessageFlags::SHUTDOWN);
    assert_eq!(ConsoleMessage::Reset.flag(), ConsoleMessageFlags::RESET);
}

#[test]
fn distribution_carries_no_flag() {
    let msg = ConsoleMessage::Distribution(DistributionPayload {
        relative_path: "grinder.properties".into(),
        contents: vec![1, 2, 3],
    });
    assert!(msg.flag().is_empty());
    assert!(msg.is_distribution());
}

#[test]
fn console_message_round_trips_through_json() {
    let mut properties = Properties::new();
    properties.set("grinder.processes", "4");
    let original = ConsoleMessage::StartGrinder(StartGrinder {
        properties,
        agent_number: Some(7),
    });
    let json = serde_json::to_string(&original).unwrap();
    assert!(json.contains("\"type\":\"StartGrinder\""));
    let decoded: ConsoleMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn unit_variants_round_trip_through_json() {
    for msg in [ConsoleMessage::Stop, ConsoleMessage::Shutdown, ConsoleMessage::Reset] {
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: ConsoleMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, msg);
    }
}

#[test]
fn worker_report_state_display_matches_wire_names() {
    assert_eq!(WorkerReportState::Started.to_string(), "STARTED");
    assert_eq!(WorkerReportState::Running.to_string(), "RUNNING");
    assert_eq!(WorkerReportState::Finished.to_string(), "FINISHED");
}

#[test]
fn agent_process_report_round_trips_through_json() {
    let report = AgentProcessReport::new(WorkerReportState::Running, 42);
    let json = serde_json::to_string(&report).unwrap();
    let decoded: AgentProcessReport = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, report);
}
