// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An opaque handle to one running worker slot: `wait_for` blocks until
//! termination, `destroy` forcibly tears it down and is idempotent.
//!
//! Two implementations ground §4.3's two factory variants: [`ProcessWorker`]
//! (a real child process, grounded on the daemon crate's
//! `adapters/agent/coop/spawn.rs` process-plus-reaper shape) and
//! [`InProcessWorker`] (a co-operative `tokio` task sharing the agent's own
//! address space, used only under `grinder.debug.singleprocess`).

use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How a worker slot ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The worker ran to completion on its own.
    Completed,
    /// The worker was forcibly destroyed before it finished naturally.
    Destroyed,
    /// The worker exited or could not be waited on; the message is
    /// diagnostic only, not part of the state machine.
    Failed(String),
}

/// An opaque running worker. `wait_for` and `destroy` both need to be
/// callable from separate tasks (the launcher's completion-tracking task
/// and the control loop's forced-shutdown path), so `destroy` takes `&self`.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn wait_for(&self) -> WorkerExit;
    fn destroy(&self);
}

/// A worker launched as a real OS process.
///
/// `child` is owned by a single supervising task spawned at construction
/// time, which races `child.wait()` against `cancel` in a `select!` —
/// mirroring [`InProcessWorker`]'s shape rather than stashing the `Child`
/// behind a mutex for `wait_for` to take. Taking it out for a separate
/// `wait_for` call would race `destroy()`: once `wait_for` has claimed the
/// `Child`, a concurrent `destroy()` would find nothing left to kill.
pub struct ProcessWorker {
    handle: Mutex<Option<JoinHandle<WorkerExit>>>,
    cancel: CancellationToken,
}

impl ProcessWorker {
    pub fn spawn(mut child: Child) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    if let Err(err) = child.start_kill() {
                        warn!(error = %err, "failed to signal worker process for kill");
                    }
                    match child.wait().await {
                        Ok(_) => WorkerExit::Destroyed,
                        Err(err) => WorkerExit::Failed(err.to_string()),
                    }
                }
                result = child.wait() => exit_from_result(result),
            }
        });
        Self { handle: Mutex::new(Some(handle)), cancel }
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    async fn wait_for(&self) -> WorkerExit {
        let taken = self.handle.lock().take();
        let Some(handle) = taken else {
            // wait_for was already called once; a second caller shouldn't
            // happen in practice (the launcher awaits it exactly once per
            // slot), but answer consistently with the cancellation state.
            return if self.cancel.is_cancelled() { WorkerExit::Destroyed } else { WorkerExit::Completed };
        };
        match handle.await {
            Ok(exit) => exit,
            Err(err) => WorkerExit::Failed(err.to_string()),
        }
    }

    fn destroy(&self) {
        self.cancel.cancel();
    }
}

fn exit_from_result(result: std::io::Result<ExitStatus>) -> WorkerExit {
    match result {
        Ok(status) if status.success() => WorkerExit::Completed,
        Ok(status) => WorkerExit::Failed(format!("exited with {status}")),
        Err(err) => WorkerExit::Failed(err.to_string()),
    }
}

/// A worker running as a co-operative task inside the agent's own process,
/// used only under `grinder.debug.singleprocess`.
pub struct InProcessWorker {
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl InProcessWorker {
    /// Spawn `body` as a task that stops as soon as `cancel` fires.
    pub fn spawn<F>(body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> tokio::task::JoinHandle<()>,
    {
        let cancel = CancellationToken::new();
        let handle = body(cancel.clone());
        Self { handle: Arc::new(Mutex::new(Some(handle))), cancel }
    }
}

#[async_trait]
impl Worker for InProcessWorker {
    async fn wait_for(&self) -> WorkerExit {
        let taken = self.handle.lock().take();
        let Some(handle) = taken else {
            return if self.cancel.is_cancelled() { WorkerExit::Destroyed } else { WorkerExit::Completed };
        };
        match handle.await {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    WorkerExit::Destroyed
                } else {
                    WorkerExit::Completed
                }
            }
            Err(err) => WorkerExit::Failed(err.to_string()),
        }
    }

    fn destroy(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
