// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user disk area fed by console file-distribution messages.
//!
//! Grounded on the daemon crate's `storage` directory-scoping idiom: a
//! plain directory path plus a monotonic counter, no WAL or snapshot —
//! SPEC_FULL.md's Non-goals exclude historical persistence, and the file
//! store is explicitly "cache layout on disk", out of scope at that level
//! of detail.
//!
//! Only one `FileStore` exists per agent process lifetime, created lazily
//! on the first successful console connection (`ConsoleCommunication::new`
//! holds it behind a `tokio::sync::OnceCell`, per SPEC_FULL.md §9's "global
//! mutable state" note).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use swarmload_wire::{ConsoleMessage, Dispatcher, DistributionPayload, HandlerOutcome};
use tracing::{error, info};

use crate::console_listener::ConsoleListener;
use crate::error::FileStoreError;

/// Scoped per-user disk area, populated by the console's distribution
/// messages. `cache_high_water_mark` is echoed in every
/// `AgentProcessReport` so the console knows whether a redistribution is
/// needed.
#[derive(Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    user: String,
    watermark: Arc<AtomicU64>,
}

impl FileStore {
    /// Create the store rooted at `<file_store_root>/<user>`, creating the
    /// directory if it doesn't already exist.
    pub fn new(file_store_root: &Path, user: impl Into<String>) -> Result<Self, FileStoreError> {
        let user = user.into();
        let base_dir = file_store_root.join(&user);
        std::fs::create_dir_all(&base_dir)
            .map_err(|source| FileStoreError { path: base_dir.clone(), source })?;
        Ok(Self { base_dir, user, watermark: Arc::new(AtomicU64::new(0)) })
    }

    pub fn directory(&self) -> &Path {
        &self.base_dir
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Opaque token that increases monotonically as distributed files are
    /// received.
    pub fn cache_high_water_mark(&self) -> u64 {
        self.watermark.load(Ordering::SeqCst)
    }

    fn write(&self, payload: &DistributionPayload) -> Result<(), FileStoreError> {
        let target = self.base_dir.join(&payload.relative_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| FileStoreError { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(&target, &payload.contents)
            .map_err(|source| FileStoreError { path: target, source })?;
        self.watermark.fetch_add(1, Ordering::SeqCst);
        info!(
            path = %payload.relative_path.display(),
            watermark = self.cache_high_water_mark(),
            "file store received distribution"
        );
        Ok(())
    }

    /// Register this store as the dispatcher's first-stage handler:
    /// `Distribution` messages are consumed here; anything else falls
    /// through to a tee of `listener` and the live worker fan-out sender
    /// (wrapped so worker-side `Shutdown` is swallowed rather than leaking
    /// out of the file-store pipeline — SPEC_FULL.md §4.2/§9).
    ///
    /// A write failure is fatal for the session (§4.2, §7): it clears
    /// `alive`, mirroring what `spawn_pump` does on a read error, so
    /// `ConsoleCommunication::is_dead` reports true and `DRAINING` tears the
    /// session down instead of silently continuing with a store that
    /// dropped a distributed file.
    pub fn register_message_handlers(
        &self,
        dispatcher: &mut Dispatcher<ConsoleMessage>,
        listener: ConsoleListener,
        fanout: Option<crate::console_communication::FanoutSender>,
        alive: Arc<AtomicBool>,
    ) {
        let store = self.clone();
        dispatcher.register(move |message: &ConsoleMessage| match message {
            ConsoleMessage::Distribution(payload) => {
                if let Err(err) = store.write(payload) {
                    error!(error = %err, "file store write failed, killing session");
                    alive.store(false, Ordering::SeqCst);
                }
                HandlerOutcome::Consumed
            }
            _ => HandlerOutcome::Fallthrough,
        });

        dispatcher.set_fallback(move |message: &ConsoleMessage| {
            listener.ingest(message);
            if let Some(fanout) = &fanout {
                if !matches!(message, ConsoleMessage::Shutdown) {
                    fanout.forward(message.clone());
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
