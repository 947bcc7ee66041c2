// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool: starts workers in increments, tracks completion,
//! supports graceful (`dont_start_any_more`) and forced (`destroy_all_workers`)
//! shutdown.
//!
//! Grounded on the daemon crate's `engine/runtime/handlers/worker/*`
//! bounded-pool shape — a worker table guarded by a shared lock, with
//! completion notifications routed back to a single condition so
//! `all_finished` can be polled or awaited from any task.

use std::sync::Arc;

use parking_lot::Mutex;
use swarmload_core::WorkerState;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::worker::{Worker, WorkerExit};
use crate::worker_factory::WorkerFactory;

struct Inner {
    states: Vec<WorkerState>,
    workers: Vec<Option<Arc<dyn Worker>>>,
    started: u32,
    /// Set by `dont_start_any_more`: no slot past this count may start.
    cap: Option<u32>,
}

/// A bounded pool of `size` worker slots, numbered `0..size` in the order
/// they are started.
pub struct WorkerLauncher {
    factory: Arc<dyn WorkerFactory>,
    size: u32,
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl WorkerLauncher {
    pub fn new(factory: Arc<dyn WorkerFactory>, size: u32) -> Self {
        let states = vec![WorkerState::Pending; size as usize];
        let workers = (0..size).map(|_| None).collect();
        Self {
            factory,
            size,
            inner: Arc::new(Mutex::new(Inner { states, workers, started: 0, cap: None })),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn started_count(&self) -> u32 {
        self.inner.lock().started
    }

    /// Current state of each slot, in worker-number order.
    pub fn states(&self) -> Vec<WorkerState> {
        self.inner.lock().states.clone()
    }

    /// Start up to `k` additional workers, respecting the remaining
    /// capacity (`size`, or less if `dont_start_any_more` was already
    /// called). Returns `true` iff capacity remains for a further call to
    /// increase the started count.
    pub fn start_some_workers(&self, k: u32) -> bool {
        let (start_from, to_start) = {
            let mut inner = self.inner.lock();
            let cap = inner.cap.unwrap_or(self.size);
            let remaining = cap.saturating_sub(inner.started);
            let to_start = k.min(remaining);
            let start_from = inner.started;
            inner.started += to_start;
            for number in start_from..start_from + to_start {
                inner.states[number as usize] = WorkerState::Starting;
            }
            (start_from, to_start)
        };

        for number in start_from..start_from + to_start {
            self.launch(number);
        }

        let inner = self.inner.lock();
        inner.started < inner.cap.unwrap_or(self.size)
    }

    /// Start every worker that capacity still allows.
    pub fn start_all_workers(&self) -> bool {
        let remaining = {
            let inner = self.inner.lock();
            inner.cap.unwrap_or(self.size).saturating_sub(inner.started)
        };
        self.start_some_workers(remaining)
    }

    /// Cap future starts at the current started count; workers already
    /// `Starting`/`Running` run to completion.
    pub fn dont_start_any_more(&self) {
        let mut inner = self.inner.lock();
        inner.cap = Some(inner.started);
    }

    /// Implies `dont_start_any_more`; issues `destroy()` on every
    /// non-terminal worker.
    pub fn destroy_all_workers(&self) {
        self.dont_start_any_more();
        let inner = self.inner.lock();
        for (number, state) in inner.states.iter().enumerate() {
            if !state.is_terminal() {
                if let Some(worker) = &inner.workers[number] {
                    worker.destroy();
                } else {
                    warn!(worker_number = number, "destroy requested before worker handle existed");
                }
            }
        }
    }

    /// `true` iff every slot has reached `Finished` or `Destroyed`.
    pub fn all_finished(&self) -> bool {
        swarmload_core::worker_state::all_finished(&self.inner.lock().states)
    }

    /// Block until `all_finished()` holds.
    pub async fn shutdown(&self) {
        loop {
            // Register interest in the next notification *before* checking
            // the condition, per `tokio::sync::Notify`'s documented pattern —
            // otherwise a completion between the check and the `.await`
            // below is a permanently lost wakeup (there is no timeout on
            // this call, unlike `wait_for_completion_or`).
            let notified = self.notify.notified();
            if self.all_finished() {
                return;
            }
            notified.await;
        }
    }

    /// Wait for the next completion notification, or return immediately if
    /// already finished. Exposed for the control loop's `RUNNING` poll.
    pub async fn wait_for_completion_or(&self, timeout: std::time::Duration) {
        if self.all_finished() {
            return;
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }

    fn launch(&self, worker_number: u32) {
        match self.factory.create(worker_number) {
            Ok(worker) => {
                {
                    let mut inner = self.inner.lock();
                    inner.states[worker_number as usize] = WorkerState::Running;
                    inner.workers[worker_number as usize] = Some(worker.clone());
                }
                info!(worker_number, "worker started");
                self.spawn_supervisor(worker_number, worker);
            }
            Err(err) => {
                error!(worker_number, error = %err, "worker failed to start");
                let mut inner = self.inner.lock();
                inner.states[worker_number as usize] = WorkerState::Finished;
                drop(inner);
                self.notify.notify_waiters();
            }
        }
    }

    fn spawn_supervisor(&self, worker_number: u32, worker: Arc<dyn Worker>) {
        let inner = self.inner.clone();
        let notify = self.notify.clone();
        tokio::spawn(async move {
            let exit = worker.wait_for().await;
            let final_state = match exit {
                WorkerExit::Completed => WorkerState::Finished,
                WorkerExit::Destroyed => WorkerState::Destroyed,
                WorkerExit::Failed(reason) => {
                    warn!(worker_number, reason = %reason, "worker ended abnormally");
                    WorkerState::Finished
                }
            };
            {
                let mut inner = inner.lock();
                inner.states[worker_number as usize] = final_state;
            }
            notify.notify_waiters();
        });
    }
}

#[cfg(test)]
#[path = "worker_launcher_tests.rs"]
mod tests;
