// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplex session with the console: inbound pump, outbound sender, periodic
//! heartbeat.
//!
//! Grounded on the daemon crate's `lifecycle/startup.rs` task-spawning
//! shape (spawn pump, spawn event forwarder) and the lightweight
//! `tokio-tungstenite`-based client style of
//! `adapters/agent/coop/http.rs`'s sibling adapters, repurposed here as the
//! actual duplex client channel to the console rather than a local coop
//! socket.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use swarmload_core::{AgentIdentity, Connector};
use swarmload_wire::{AgentProcessReport, ConsoleMessage, Dispatcher, WorkerReportState};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, broadcast, OnceCell};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::console_listener::ConsoleListener;
use crate::constants::{AGENT_HEARTBEAT_DELAY, AGENT_HEARTBEAT_INTERVAL, AGENT_FANOUT_STREAM_THREAD_COUNT};
use crate::error::{CommunicationError, FileStoreError};
use crate::file_store::FileStore;

/// Broadcasts console control messages to live workers. Has
/// `AGENT_FANOUT_STREAM_THREAD_COUNT` producer slots (the broadcast
/// channel's buffer depth); wrapped so a worker-side `Shutdown` never
/// leaks out through the file-store tee (§4.2).
#[derive(Clone)]
pub struct FanoutSender {
    sender: broadcast::Sender<ConsoleMessage>,
    cancel: CancellationToken,
}

impl FanoutSender {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(AGENT_FANOUT_STREAM_THREAD_COUNT);
        Self { sender, cancel: CancellationToken::new() }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleMessage> {
        self.sender.subscribe()
    }

    /// Forward `message` to every live subscriber. Best-effort: a send
    /// error just means there are currently no subscribers.
    pub fn forward(&self, message: ConsoleMessage) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.sender.send(message);
    }

    /// Idempotent: stop forwarding further messages.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Default for FanoutSender {
    fn default() -> Self {
        Self::new()
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected session to the console. Lives for the duration of one
/// connection; the control loop tears it down and builds a fresh one
/// whenever the desired [`Connector`] changes between runs.
pub struct ConsoleCommunication {
    connector: Connector,
    file_store: FileStore,
    outbound: mpsc::UnboundedSender<WsMessage>,
    alive: Arc<AtomicBool>,
    heartbeat_cancel: CancellationToken,
    pump_cancel: CancellationToken,
    shutdown_once: Arc<AtomicBool>,
}

impl ConsoleCommunication {
    /// Open a session to `connector`, lazily initializing the process-wide
    /// file store, sending the initial `STARTED` report, and wiring the
    /// dispatch chain (file store first, console listener + fan-out as its
    /// fallback tee).
    pub async fn connect(
        connector: Connector,
        identity: &AgentIdentity,
        file_store_cell: &OnceCell<FileStore>,
        file_store_root: &Path,
        user_name: &str,
        listener: ConsoleListener,
        fanout: FanoutSender,
    ) -> Result<Self, CommunicationError> {
        let url = format!("ws://{}:{}/agent/{}", connector.host, connector.port, identity.name);
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|err| CommunicationError::ConnectFailed(err.to_string()))?;

        let file_store = file_store_cell
            .get_or_try_init(|| async { FileStore::new(file_store_root, user_name) })
            .await
            .map_err(|err: FileStoreError| CommunicationError::ConnectFailed(err.to_string()))?
            .clone();

        let (mut sink, stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<WsMessage>();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(err) = sink.send(message).await {
                    warn!(error = %err, "failed to send message to console");
                    break;
                }
            }
        });

        let alive = Arc::new(AtomicBool::new(true));

        let mut dispatcher: Dispatcher<ConsoleMessage> = Dispatcher::new();
        file_store.register_message_handlers(
            &mut dispatcher,
            listener.clone(),
            Some(fanout.clone()),
            alive.clone(),
        );

        let pump_cancel = CancellationToken::new();
        spawn_pump(stream, dispatcher, alive.clone(), pump_cancel.clone());

        let comms = Self {
            connector,
            file_store,
            outbound: outbound_tx,
            alive,
            heartbeat_cancel: CancellationToken::new(),
            pump_cancel,
            shutdown_once: Arc::new(AtomicBool::new(false)),
        };

        comms.send_report(WorkerReportState::Started);
        Ok(comms)
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn file_store(&self) -> &FileStore {
        &self.file_store
    }

    /// `true` once the inbound pump has observed the session end (read
    /// error or clean close).
    pub fn is_dead(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }

    /// Schedule the periodic `STATE_RUNNING` heartbeat. A heartbeat failure
    /// cancels the heartbeat task only, per §5; the session itself is left
    /// alone.
    pub fn start(&self) {
        let outbound = self.outbound.clone();
        let file_store = self.file_store.clone();
        let cancel = self.heartbeat_cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AGENT_HEARTBEAT_DELAY).await;
            let mut ticker = tokio::time::interval(AGENT_HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = AgentProcessReport::new(
                            WorkerReportState::Running,
                            file_store.cache_high_water_mark(),
                        );
                        if let Err(err) = send(&outbound, &report) {
                            warn!(error = %err, "heartbeat send failed, cancelling heartbeat task");
                            break;
                        }
                    }
                }
            }
        });
    }

    fn send_report(&self, state: WorkerReportState) {
        let report = AgentProcessReport::new(state, self.file_store.cache_high_water_mark());
        if let Err(err) = send(&self.outbound, &report) {
            warn!(error = %err, state = %state, "failed to send process report");
        }
    }

    /// Cancel the heartbeat, best-effort send `FINISHED`, stop the pump.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown_once.swap(true, Ordering::SeqCst) {
            return;
        }
        self.heartbeat_cancel.cancel();
        self.send_report(WorkerReportState::Finished);
        self.pump_cancel.cancel();
        info!(connector = %self.connector, "console communication shut down");
    }
}

fn send(
    outbound: &mpsc::UnboundedSender<WsMessage>,
    report: &AgentProcessReport,
) -> Result<(), CommunicationError> {
    let text = serde_json::to_string(report)
        .map_err(|err| CommunicationError::SendFailed(err.to_string()))?;
    outbound
        .send(WsMessage::Text(text.into()))
        .map_err(|err| CommunicationError::SendFailed(err.to_string()))
}

fn spawn_pump(
    mut stream: futures_util::stream::SplitStream<WsStream>,
    mut dispatcher: Dispatcher<ConsoleMessage>,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                frame = stream.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<ConsoleMessage>(&text) {
                                Ok(message) => dispatcher.dispatch(&message),
                                Err(err) => warn!(error = %err, "dropping malformed console message"),
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            error!(error = %err, "console pump read failed");
                            break;
                        }
                        None => {
                            info!("console connection closed");
                            break;
                        }
                    }
                }
            }
        }
        alive.store(false, Ordering::SeqCst);
    });
}

#[cfg(test)]
#[path = "console_communication_tests.rs"]
mod tests;
