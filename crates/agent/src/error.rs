// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the agent runtime: one variant family per §7 of the
//! concern it belongs to, collected under [`AgentError`] for `run()`'s
//! return type.

use std::path::PathBuf;

use swarmload_core::PropertiesError;

/// Bad configuration: an unreadable script, a malformed property, a
/// console endpoint that cannot be built from the merged properties.
/// Aborts the current `PREPARING_RUN` and returns to the outer loop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("script {0:?} is not readable")]
    ScriptUnreadable(PathBuf),

    #[error("invalid property: {0}")]
    Property(#[from] PropertiesError),

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("failed to read config file {path:?}: {source}")]
    ReadFile { path: PathBuf, #[source] source: std::io::Error },
}

/// A failure to establish or maintain the console session: connect refused,
/// the inbound pump's read failed. With `proceed_without_console` this is
/// swallowed and the loop proceeds on local properties only; otherwise it
/// is fatal for the process.
#[derive(Debug, thiserror::Error)]
pub enum CommunicationError {
    #[error("failed to connect to console at {0}")]
    ConnectFailed(String),

    #[error("console session closed unexpectedly")]
    SessionClosed,

    #[error("failed to send message to console: {0}")]
    SendFailed(String),
}

/// A write into the file store failed. Fatal for the current session: the
/// control loop tears the session down and reconnects.
#[derive(Debug, thiserror::Error)]
#[error("file store write failed at {path:?}: {source}")]
pub struct FileStoreError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A worker factory declined to start a worker. Logged; the slot is marked
/// `Finished` and the launcher continues with the remaining slots.
#[derive(Debug, thiserror::Error)]
#[error("worker {worker_number} failed to start: {reason}")]
pub struct WorkerStartError {
    pub worker_number: u32,
    pub reason: String,
}

/// Top-level error returned by [`crate::control_loop::AgentControlLoop::run`].
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Communication(#[from] CommunicationError),

    #[error(transparent)]
    FileStore(#[from] FileStoreError),
}
