// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal fake console: accepts exactly one websocket connection,
//! records every `AgentProcessReport` the agent sends, and lets the test
//! push `ConsoleMessage`s back at will. Mirrors
//! `swarmload_agent::console_communication`'s own `with_console_server`
//! test helper, one layer up.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use swarmload_agent::config::AgentConfig;
use swarmload_wire::{AgentProcessReport, ConsoleMessage};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Environment-variable override consumed by `AgentControlLoop::new` (via
/// `local_hostname`) so tests get a deterministic, known `AgentIdentity`
/// rather than whatever the sandbox's real hostname happens to be.
pub const TEST_HOSTNAME: &str = "spec-host";

/// How long a test will wait for a single expected report or message
/// before concluding the scenario is broken rather than just slow.
const WAIT: Duration = Duration::from_secs(5);

/// A fake console: one accepted websocket connection, wired to two
/// channels so a test can drive it without touching async combinators
/// directly.
pub struct FakeConsole {
    pub port: u16,
    reports: mpsc::UnboundedReceiver<AgentProcessReport>,
    outbound: mpsc::UnboundedSender<ConsoleMessage>,
}

impl FakeConsole {
    /// Bind a loopback port and spawn a task that accepts exactly one
    /// connection, pumping inbound `AgentProcessReport`s out to `reports`
    /// and outbound `ConsoleMessage`s in from `outbound`.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();

        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ConsoleMessage>();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else { return };
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    frame = stream.next() => {
                        match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                if let Ok(report) = serde_json::from_str::<AgentProcessReport>(&text) {
                                    if report_tx.send(report).is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        }
                    }
                    outgoing = outbound_rx.recv() => {
                        match outgoing {
                            Some(message) => {
                                let text = serde_json::to_string(&message).expect("serialize message");
                                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });

        Self { port, reports: report_rx, outbound: outbound_tx }
    }

    /// Push a message to the connected agent. Panics if the agent has
    /// already disconnected — every spec that calls this expects the
    /// session to still be live.
    pub fn send(&self, message: ConsoleMessage) {
        self.outbound.send(message).expect("fake console has no live agent connection");
    }

    /// Wait for the next `AgentProcessReport`, failing the test rather
    /// than hanging forever if none arrives.
    pub async fn next_report(&mut self) -> AgentProcessReport {
        tokio::time::timeout(WAIT, self.reports.recv())
            .await
            .expect("timed out waiting for a process report")
            .expect("fake console channel closed before a report arrived")
    }

    /// Drain reports until one matching `state` arrives (or the wait
    /// budget is exhausted), skipping any heartbeats in between.
    pub async fn wait_for_report(&mut self, state: swarmload_wire::WorkerReportState) -> AgentProcessReport {
        tokio::time::timeout(WAIT, async {
            loop {
                let report = self.reports.recv().await.expect("fake console channel closed");
                if report.state == state {
                    return report;
                }
            }
        })
        .await
        .expect("timed out waiting for the expected report state")
    }
}

/// Build an `AgentConfig` rooted at `home`, with `grinder.consoleHost` /
/// `grinder.consolePort` already pointed at `console_port` and
/// `grinder.debug.singleprocess` set so no real worker process is ever
/// spawned.
pub fn test_config(home: &std::path::Path, console_port: u16) -> AgentConfig {
    let mut config = AgentConfig::load_from(home.to_path_buf()).expect("load config");
    config.properties.set("grinder.consoleHost", "127.0.0.1");
    config.properties.set("grinder.consolePort", console_port.to_string());
    config.properties.set("grinder.debug.singleprocess", "true");
    config.properties.set("grinder.processes", "1");
    config
}

/// Path the agent's file store will use for `TEST_HOSTNAME`, matching
/// `AgentConfig::file_store_root` joined with the identity name the
/// control loop starts with (before any `grinder.hostID` override).
pub fn file_store_dir(config: &AgentConfig) -> PathBuf {
    config.file_store_root.join(TEST_HOSTNAME)
}

/// Write `name` as an empty, readable script file under the (lazily
/// created) file store directory, as if the console had already
/// distributed it.
pub fn seed_script(config: &AgentConfig, name: &str) {
    let dir = file_store_dir(config);
    std::fs::create_dir_all(&dir).expect("create file store dir");
    std::fs::write(dir.join(name), "").expect("write script");
}
