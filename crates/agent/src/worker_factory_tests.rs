// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::WorkerExit;
use std::collections::BTreeMap;
use tempfile::tempdir;

#[test]
fn command_line_build_collects_program_args_and_classpath() {
    let dir = tempdir().expect("tempdir");
    let script_path = dir.path().join("grinder.py");
    std::fs::write(&script_path, "").expect("write script");
    let script = ScriptLocation::new(dir.path().to_path_buf(), script_path).expect("script location");

    let mut props = Properties::new();
    props.set("grinder.jvm.command", "java");
    let built = BuiltProperties { jvm_arguments: "-Xmx256m".to_string(), classpath: "/lib/a.jar".to_string() };

    let command_line = WorkerProcessCommandLine::build(&props, &built, script, BTreeMap::new());
    assert_eq!(command_line.program, "java");
    assert_eq!(command_line.base_args, vec!["-Xmx256m".to_string()]);
    assert_eq!(command_line.classpath, "/lib/a.jar");
}

#[test]
fn command_for_includes_worker_number_and_script() {
    let dir = tempdir().expect("tempdir");
    let script_path = dir.path().join("grinder.py");
    std::fs::write(&script_path, "").expect("write script");
    let script = ScriptLocation::new(dir.path().to_path_buf(), script_path.clone()).expect("script");

    let command_line = WorkerProcessCommandLine {
        program: "java".to_string(),
        base_args: vec![],
        classpath: "/lib/a.jar".to_string(),
        script,
        env: BTreeMap::new(),
    };

    let cmd = command_line.command_for(2);
    let debug = format!("{cmd:?}");
    assert!(debug.contains("-Dgrinder.agent.number=2"));
    assert!(debug.contains("-cp"));
}

#[tokio::test]
async fn process_worker_factory_spawns_a_real_process() {
    let dir = tempdir().expect("tempdir");
    let script_path = dir.path().join("grinder.py");
    std::fs::write(&script_path, "").expect("write script");
    let script = ScriptLocation::new(dir.path().to_path_buf(), script_path).expect("script");

    let command_line = WorkerProcessCommandLine {
        program: "true".to_string(),
        base_args: vec![],
        classpath: String::new(),
        script,
        env: BTreeMap::new(),
    };
    let factory = ProcessWorkerFactory::new(command_line);
    let worker = factory.create(0).expect("spawn should succeed");
    assert_eq!(worker.wait_for().await, WorkerExit::Completed);
}

#[tokio::test]
async fn process_worker_factory_reports_start_error_for_missing_program() {
    let dir = tempdir().expect("tempdir");
    let script_path = dir.path().join("grinder.py");
    std::fs::write(&script_path, "").expect("write script");
    let script = ScriptLocation::new(dir.path().to_path_buf(), script_path).expect("script");

    let command_line = WorkerProcessCommandLine {
        program: "/no/such/swarmload-worker-binary".to_string(),
        base_args: vec![],
        classpath: String::new(),
        script,
        env: BTreeMap::new(),
    };
    let factory = ProcessWorkerFactory::new(command_line);
    let err = factory.create(0).expect_err("missing binary should fail to spawn");
    assert_eq!(err.worker_number, 0);
}

#[tokio::test]
async fn in_process_worker_factory_runs_then_completes() {
    let script = ScriptLocation::for_file("/scripts/grinder.py");
    let factory = InProcessWorkerFactory::new(script, "-Xmx256m".to_string());
    assert_eq!(factory.ignored_jvm_arguments(), "-Xmx256m");

    let worker = factory.create(0).expect("create");
    assert_eq!(worker.wait_for().await, WorkerExit::Completed);
}
