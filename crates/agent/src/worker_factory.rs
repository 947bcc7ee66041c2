// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Construct one worker invocation from a script location plus properties.
//!
//! Two variants per §4.3: [`ProcessWorkerFactory`] launches a real child
//! process per worker (grounded on the daemon crate's
//! `adapters/agent/coop/spawn.rs` `tokio::process::Command` construction and
//! reaper-task logging), [`InProcessWorkerFactory`] spawns a co-operative
//! task sharing the agent's address space, used only when
//! `grinder.debug.singleprocess` is set.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use swarmload_core::{Properties, ScriptLocation};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

use crate::error::WorkerStartError;
use crate::property_builder::BuiltProperties;
use crate::worker::{InProcessWorker, Worker};

/// A worker invocation command line, computed once per test run and reused
/// to spawn each worker slot (the per-worker-number arguments are applied
/// at `create` time, everything else is fixed).
#[derive(Debug, Clone)]
pub struct WorkerProcessCommandLine {
    pub program: String,
    pub base_args: Vec<String>,
    pub classpath: String,
    pub script: ScriptLocation,
    pub env: BTreeMap<String, String>,
}

impl WorkerProcessCommandLine {
    /// Compute the command line once per test from the merged properties,
    /// the host's own environment overrides, the built JVM arguments, and
    /// the resolved script.
    pub fn build(
        properties: &Properties,
        built: &BuiltProperties,
        script: ScriptLocation,
        extra_env: BTreeMap<String, String>,
    ) -> Self {
        let program = properties.get_string("grinder.jvm.command", "java");
        let base_args: Vec<String> =
            built.jvm_arguments.split_whitespace().map(str::to_string).collect();
        Self { program, base_args, classpath: built.classpath.clone(), script, env: extra_env }
    }

    /// Build the `tokio::process::Command` for worker slot `worker_number`.
    pub fn command_for(&self, worker_number: u32) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.base_args);
        if !self.classpath.is_empty() {
            cmd.arg("-cp").arg(&self.classpath);
        }
        cmd.arg(format!("-Dgrinder.agent.number={worker_number}"));
        cmd.arg(self.script.file());
        cmd.current_dir(self.script.directory());
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd
    }
}

/// Constructs one worker invocation per `create` call.
pub trait WorkerFactory: Send + Sync {
    fn create(&self, worker_number: u32) -> Result<Arc<dyn Worker>, WorkerStartError>;
}

/// Launches each worker as a real child process.
pub struct ProcessWorkerFactory {
    command_line: WorkerProcessCommandLine,
}

impl ProcessWorkerFactory {
    pub fn new(command_line: WorkerProcessCommandLine) -> Self {
        Self { command_line }
    }
}

impl WorkerFactory for ProcessWorkerFactory {
    fn create(&self, worker_number: u32) -> Result<Arc<dyn Worker>, WorkerStartError> {
        let mut cmd = self.command_line.command_for(worker_number);
        let mut child = cmd.spawn().map_err(|err| WorkerStartError {
            worker_number,
            reason: format!("failed to spawn worker process: {err}"),
        })?;

        info!(worker_number, program = %self.command_line.program, "worker process spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        spawn_output_reaper(worker_number, stdout, stderr);

        let worker = crate::worker::ProcessWorker::spawn(child);
        Ok(Arc::new(worker))
    }
}

/// Drain a worker's stdout/stderr pipes into the agent's own log. The
/// worker process is a black box per §1 — we don't interpret its output —
/// but `Stdio::piped()` means *something* has to read these pipes or the
/// worker blocks on its own `write()` once the OS pipe buffer fills.
fn spawn_output_reaper(
    worker_number: u32,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
) {
    if let Some(stdout) = stdout {
        tokio::spawn(drain_lines(worker_number, "stdout", stdout));
    }
    if let Some(stderr) = stderr {
        tokio::spawn(drain_lines(worker_number, "stderr", stderr));
    }
}

async fn drain_lines<R>(worker_number: u32, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(worker_number, stream, "{line}"),
            Ok(None) => break,
            Err(err) => {
                warn!(worker_number, stream, error = %err, "failed reading worker output");
                break;
            }
        }
    }
}

/// Spawns each worker as a co-operative task inside the agent's own
/// process. Any JVM-argument-like setting is logged and otherwise ignored,
/// per §4.3.
pub struct InProcessWorkerFactory {
    script: ScriptLocation,
    jvm_arguments_ignored: String,
}

impl InProcessWorkerFactory {
    pub fn new(script: ScriptLocation, jvm_arguments_ignored: String) -> Self {
        if !jvm_arguments_ignored.trim().is_empty() {
            warn!(
                jvm_arguments = %jvm_arguments_ignored,
                "grinder.debug.singleprocess is set; JVM arguments are ignored"
            );
        }
        Self { script, jvm_arguments_ignored }
    }

    /// The JVM-argument string that was logged and otherwise dropped.
    pub fn ignored_jvm_arguments(&self) -> &str {
        &self.jvm_arguments_ignored
    }
}

impl WorkerFactory for InProcessWorkerFactory {
    fn create(&self, worker_number: u32) -> Result<Arc<dyn Worker>, WorkerStartError> {
        let script: PathBuf = self.script.file().to_path_buf();
        info!(worker_number, script = %script.display(), "in-process worker starting");

        let worker = InProcessWorker::spawn(move |cancel| {
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = run_script_cooperatively(worker_number, script) => {}
                }
            })
        });
        Ok(Arc::new(worker))
    }
}

/// Stand-in for the in-task script interpreter loop. The script interpreter
/// itself is out of scope (§1); this just occupies the task until it would
/// naturally complete, which in the absence of a real interpreter is
/// immediately.
async fn run_script_cooperatively(worker_number: u32, script: PathBuf) {
    info!(worker_number, script = %script.display(), "in-process worker completed");
}

#[cfg(test)]
#[path = "worker_factory_tests.rs"]
mod tests;
