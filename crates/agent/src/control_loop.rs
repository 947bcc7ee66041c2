// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state machine gluing connection lifecycle, property/script
//! resolution, and the worker pool together across repeated test runs.
//!
//! Grounded on the daemon crate's `DaemonState::shutdown()` idempotent
//! cleanup pattern plus the state table SPEC_FULL.md §4.6 spells out
//! directly. Implemented as a single driving loop over local variables
//! (`properties`, `pending_start`, `script`) rather than a stored state
//! enum, matching the upstream design note that this is not meant to be a
//! persisted discriminant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use swarmload_core::{AgentIdentity, Clock, ConnectionType, Connector, Properties, ScriptLocation, SystemClock};
use swarmload_wire::StartGrinder;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::AgentConfig;
use crate::console_communication::{ConsoleCommunication, FanoutSender};
use crate::console_listener::ConsoleListener;
use crate::constants::MAX_SHUTDOWN_MS;
use crate::error::AgentError;
use crate::file_store::FileStore;
use crate::property_builder;
use crate::worker_factory::{InProcessWorkerFactory, ProcessWorkerFactory, WorkerFactory, WorkerProcessCommandLine};
use crate::worker_launcher::WorkerLauncher;

/// Internal driver state. Never stored outside `run()` — a local variable
/// only, not a field on [`AgentControlLoop`].
#[derive(Debug)]
enum Step {
    Connecting,
    AwaitingStart,
    PreparingRun,
    Running,
    Draining,
    Terminated,
}

/// Glues [`ConsoleCommunication`], [`ConsoleListener`], and
/// [`WorkerLauncher`] together across the repeated connect/run/drain
/// cycle described in SPEC_FULL.md §4.6.
///
/// Generic over the clock, mirroring the daemon crate's
/// `Runtime<A, N, C>` generic-adapter shape rather than a trait object —
/// `Clock` carries a `Clone` supertrait (§9's testability requirement for
/// `FakeClock`), which rules out `dyn Clock`.
pub struct AgentControlLoop<C: Clock = SystemClock> {
    config: AgentConfig,
    identity: Mutex<AgentIdentity>,
    listener: ConsoleListener,
    fanout: FanoutSender,
    file_store_cell: Arc<OnceCell<FileStore>>,
    clock: C,
    current_comms: Mutex<Option<Arc<ConsoleCommunication>>>,
    current_launcher: Mutex<Option<Arc<WorkerLauncher>>>,
    rampup_cancel: Mutex<Option<CancellationToken>>,
    shutdown_once: Arc<AtomicBool>,
}

impl<C: Clock + 'static> AgentControlLoop<C> {
    pub fn new(config: AgentConfig, clock: C) -> Self {
        let host_name = local_hostname();
        Self {
            config,
            identity: Mutex::new(AgentIdentity::new(host_name)),
            listener: ConsoleListener::new(),
            fanout: FanoutSender::new(),
            file_store_cell: Arc::new(OnceCell::new()),
            clock,
            current_comms: Mutex::new(None),
            current_launcher: Mutex::new(None),
            rampup_cancel: Mutex::new(None),
            shutdown_once: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn identity(&self) -> AgentIdentity {
        self.identity.lock().clone()
    }

    pub fn listener(&self) -> &ConsoleListener {
        &self.listener
    }

    /// External, idempotent shutdown entry point (§5, §7): cancels the
    /// heartbeat and ramp-up timers, tears down any live worker pool,
    /// shuts down the console session and the listener. Safe to call any
    /// number of times, including concurrently with normal termination.
    pub fn shutdown(&self) {
        if self.shutdown_once.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(cancel) = self.rampup_cancel.lock().take() {
            cancel.cancel();
        }
        self.fanout.shutdown();
        if let Some(launcher) = self.current_launcher.lock().clone() {
            launcher.destroy_all_workers();
        }
        if let Some(comms) = self.current_comms.lock().clone() {
            comms.shutdown();
        }
        self.listener.shutdown();
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_once.load(Ordering::SeqCst)
    }

    fn teardown_comms(&self) {
        if let Some(comms) = self.current_comms.lock().take() {
            comms.shutdown();
        }
    }

    /// Drive the state machine until `TERMINATED`. Cleanup (§7) always
    /// runs before returning, including on error paths.
    pub async fn run(&self) -> Result<(), AgentError> {
        let mut properties = self.config.properties.clone();
        let mut pending_start: Option<StartGrinder> = None;
        let mut agent_number: Option<i32> = None;
        let mut script: Option<ScriptLocation> = None;
        let mut resume_preparing_run = false;
        let mut terminal_error: Option<AgentError> = None;
        let mut step = Step::Connecting;

        loop {
            step = match step {
                Step::Terminated => break,

                Step::Connecting => {
                    if self.is_shutting_down() {
                        Step::Terminated
                    } else if !properties.get_bool("grinder.useConsole", true) {
                        resume_preparing_run = false;
                        Step::PreparingRun
                    } else {
                        match self.connect(&properties).await {
                            ConnectOutcome::UpToDate | ConnectOutcome::Connected => {
                                if resume_preparing_run || pending_start.is_some() {
                                    resume_preparing_run = false;
                                    Step::PreparingRun
                                } else {
                                    Step::AwaitingStart
                                }
                            }
                            ConnectOutcome::FailedProceeding => {
                                resume_preparing_run = false;
                                Step::PreparingRun
                            }
                            ConnectOutcome::FailedFatal(err) => {
                                terminal_error = Some(err.into());
                                Step::Terminated
                            }
                        }
                    }
                }

                Step::AwaitingStart => {
                    self.listener.wait_for_message().await;
                    if self.listener.check_for_message(swarmload_core::ConsoleMessageFlags::START) {
                        pending_start = self.listener.take_last_start_grinder_message();
                        Step::PreparingRun
                    } else if self.is_shutting_down() {
                        Step::Terminated
                    } else {
                        self.listener.discard_messages(swarmload_core::ConsoleMessageFlags::ANY);
                        Step::AwaitingStart
                    }
                }

                Step::PreparingRun => {
                    if let Some(start) = pending_start.take() {
                        agent_number = start.agent_number;
                        properties.put_all(&start.properties);
                    }

                    let use_same_console = properties.get_bool("agent.useSameConsole", true);
                    if use_same_console {
                        let host = self
                            .config
                            .properties
                            .get("agent.controllerServerHost")
                            .map(str::to_string)
                            .unwrap_or_else(|| {
                                self.config.properties.get_string("grinder.consoleHost", "localhost")
                            });
                        properties.set("grinder.consoleHost", host);
                    }

                    {
                        let mut identity = self.identity.lock();
                        let default_name = identity.host_name.clone();
                        identity.name = properties.get_string("grinder.hostID", &default_name);
                        identity.number = agent_number.unwrap_or(swarmload_core::identity::NO_AGENT_NUMBER);
                    }

                    let console_in_use = properties.get_bool("grinder.useConsole", true);
                    let connector_changed = console_in_use
                        && match self.current_comms.lock().as_ref() {
                            Some(comms) => comms.connector() != &compute_connector(&properties),
                            None => false,
                        };

                    if connector_changed {
                        self.teardown_comms();
                        resume_preparing_run = true;
                        Step::Connecting
                    } else {
                        match resolve_script(&properties, self.current_file_store_dir()) {
                            Some(resolved) => {
                                script = Some(resolved);
                                Step::Running
                            }
                            None => {
                                warn!("script unreadable, returning to await a new start message");
                                script = None;
                                Step::AwaitingStart
                            }
                        }
                    }
                }

                Step::Running => match script.clone() {
                    None => Step::Draining,
                    Some(current_script) => {
                        let launcher = self.build_launcher(&mut properties, current_script);
                        *self.current_launcher.lock() = Some(launcher.clone());
                        self.apply_rampup_policy(&properties, launcher.clone());

                        let mut console_signal_time: Option<std::time::Instant> = None;
                        loop {
                            if launcher.all_finished() {
                                break;
                            }
                            launcher.wait_for_completion_or(Duration::from_millis(200)).await;

                            // Non-consuming: DRAINING is the one that actually
                            // clears STOP/SHUTDOWN/RESET once the pool has
                            // finished, so the bit that triggered this grace
                            // period is still there for DRAINING to act on
                            // (see §4.6's DRAINING transition table).
                            let non_start = swarmload_core::ConsoleMessageFlags::ANY
                                .difference(swarmload_core::ConsoleMessageFlags::START);
                            if self.listener.received(non_start) && console_signal_time.is_none() {
                                console_signal_time = Some(self.clock.now());
                                launcher.dont_start_any_more();
                            }

                            if let Some(signalled_at) = console_signal_time {
                                if self.clock.now().duration_since(signalled_at)
                                    > Duration::from_millis(MAX_SHUTDOWN_MS)
                                {
                                    launcher.destroy_all_workers();
                                }
                            }

                            if self.is_shutting_down() {
                                launcher.destroy_all_workers();
                            }
                        }
                        Step::Draining
                    }
                },

                Step::Draining => {
                    if let Some(cancel) = self.rampup_cancel.lock().take() {
                        cancel.cancel();
                    }
                    if let Some(launcher) = self.current_launcher.lock().take() {
                        launcher.shutdown().await;
                    }

                    let session_dead = self.current_comms.lock().as_ref().map_or(true, |c| c.is_dead());
                    if session_dead && properties.get_bool("grinder.useConsole", true) {
                        Step::Terminated
                    } else {
                        self.listener.discard_messages(swarmload_core::ConsoleMessageFlags::START);
                        if !self.listener.received(swarmload_core::ConsoleMessageFlags::ANY) {
                            self.listener.wait_for_message().await;
                        }

                        if self.listener.check_for_message(swarmload_core::ConsoleMessageFlags::START) {
                            pending_start = self.listener.take_last_start_grinder_message();
                            Step::PreparingRun
                        } else if self.listener.check_for_message(
                            swarmload_core::ConsoleMessageFlags::STOP
                                | swarmload_core::ConsoleMessageFlags::SHUTDOWN,
                        ) {
                            Step::Terminated
                        } else {
                            // Covers both an explicit RESET and a spurious wake
                            // with no flags set (SPEC_FULL.md §9's open question:
                            // this implementation re-arms rather than treating a
                            // spurious wake as a natural death).
                            self.listener.discard_messages(swarmload_core::ConsoleMessageFlags::RESET);
                            pending_start = None;
                            Step::AwaitingStart
                        }
                    }
                }
            };
        }

        self.shutdown();

        match terminal_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn current_file_store_dir(&self) -> Option<std::path::PathBuf> {
        self.file_store_cell.get().map(|store| store.directory().to_path_buf())
    }

    async fn connect(&self, properties: &Properties) -> ConnectOutcome {
        let desired = compute_connector(properties);

        if let Some(comms) = self.current_comms.lock().as_ref() {
            if comms.connector() == &desired {
                return ConnectOutcome::UpToDate;
            }
        }

        let identity = self.identity.lock().clone();
        match ConsoleCommunication::connect(
            desired,
            &identity,
            &self.file_store_cell,
            &self.config.file_store_root,
            &identity.name,
            self.listener.clone(),
            self.fanout.clone(),
        )
        .await
        {
            Ok(comms) => {
                comms.start();
                *self.current_comms.lock() = Some(Arc::new(comms));
                ConnectOutcome::Connected
            }
            Err(err) => {
                warn!(error = %err, "failed to connect to console");
                if self.config.proceed_without_console {
                    ConnectOutcome::FailedProceeding
                } else {
                    ConnectOutcome::FailedFatal(err)
                }
            }
        }
    }

    fn build_launcher(&self, properties: &mut Properties, script: ScriptLocation) -> Arc<WorkerLauncher> {
        let size = properties.get_int("grinder.processes", 1).max(0) as u32;
        let single_process = properties.get_bool("grinder.debug.singleprocess", false);

        let factory: Arc<dyn WorkerFactory> = if single_process {
            Arc::new(InProcessWorkerFactory::new(
                script,
                properties.get_string("grinder.jvm.arguments", ""),
            ))
        } else {
            let hostname = self.identity().host_name;
            let built = property_builder::build(
                properties,
                script.directory(),
                properties.get_bool("grinder.security", false),
                &properties.get_string("ngrinder.etc.hosts", ""),
                &hostname,
                properties.get_bool("agent.servermode", false),
                properties.get_bool("agent.useXmxLimit", true),
                &self.config.log_root,
            );
            let command_line =
                WorkerProcessCommandLine::build(properties, &built, script, Default::default());
            Arc::new(ProcessWorkerFactory::new(command_line))
        };

        Arc::new(WorkerLauncher::new(factory, size))
    }

    fn apply_rampup_policy(&self, properties: &Properties, launcher: Arc<WorkerLauncher>) {
        let increment = properties.get_int("grinder.processIncrement", 0).max(0) as u32;
        if increment == 0 {
            launcher.start_all_workers();
            return;
        }

        let initial = properties.get_int("grinder.initialProcesses", increment as i64).max(0) as u32;
        launcher.start_some_workers(initial);

        let interval_ms = properties
            .get_int("grinder.processIncrementInterval", crate::constants::DEFAULT_PROCESS_INCREMENT_INTERVAL_MS as i64)
            .max(1) as u64;

        let cancel = CancellationToken::new();
        *self.rampup_cancel.lock() = Some(cancel.clone());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.tick().await; // first tick fires immediately; consume it
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if !launcher.start_some_workers(increment) {
                            break;
                        }
                    }
                }
            }
        });
    }
}

enum ConnectOutcome {
    UpToDate,
    Connected,
    FailedProceeding,
    FailedFatal(crate::error::CommunicationError),
}

fn compute_connector(properties: &Properties) -> Connector {
    let host = properties.get_string("grinder.consoleHost", "localhost");
    let port = properties.get_int("grinder.consolePort", 6372).clamp(0, u16::MAX as i64) as u16;
    Connector::new(host, port, ConnectionType::Agent)
}

/// Resolve the script to run: prefer the start message's `SCRIPT` property
/// (already merged into `properties` as `grinder.script`) relative to the
/// file-store directory; fall back to the agent's own default only when no
/// file-store-relative script is readable.
fn resolve_script(properties: &Properties, file_store_dir: Option<std::path::PathBuf>) -> Option<ScriptLocation> {
    let script_name = properties.get_string("grinder.script", crate::config::DEFAULT_SCRIPT);
    let script_path = std::path::Path::new(&script_name);

    if let Some(dir) = &file_store_dir {
        let candidate = dir.join(script_path);
        if candidate.is_file() {
            return ScriptLocation::new(dir.clone(), candidate).ok();
        }
    }

    let default_dir = properties.resolve_relative_file(std::path::Path::new("."));
    let candidate = properties.get_file("grinder.script", script_path);
    if candidate.is_file() {
        let directory = candidate.parent().map(std::path::Path::to_path_buf).unwrap_or(default_dir);
        return ScriptLocation::new(directory, candidate).ok();
    }

    None
}

fn local_hostname() -> String {
    std::env::var("SWARMLOAD_HOSTNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
#[path = "control_loop_tests.rs"]
mod tests;
