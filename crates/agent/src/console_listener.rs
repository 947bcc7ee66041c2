// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffers inbound console messages the control loop cannot handle inline,
//! classified by [`ConsoleMessageFlags`] bit.
//!
//! Backed by a `parking_lot::Mutex`-guarded flag word plus last-start
//! payload, and a `tokio::sync::Notify` for waking blocked waiters — the
//! "condition + flag bits" pattern from SPEC_FULL.md §9, generalized from
//! the workspace's `oj-core::event::dispatch` enum-of-kinds dispatch into
//! an explicit bitset because `received(mask)` needs set-intersection
//! semantics rather than a single discriminant.
//!
//! `received` is non-consuming; `check_for_message` is the consuming
//! variant. This is the open question SPEC_FULL.md §9 calls out — the two
//! contracts are kept distinct on purpose rather than collapsed into one.

use std::sync::Arc;

use parking_lot::Mutex;
use swarmload_core::ConsoleMessageFlags;
use swarmload_wire::{ConsoleMessage, Dispatcher, HandlerOutcome, StartGrinder};
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    flags: ConsoleMessageFlags,
    last_start: Option<StartGrinder>,
    shutdown: bool,
}

/// Shared listener state, cloneable so the inbound pump and the control loop
/// can each hold a handle.
#[derive(Clone)]
pub struct ConsoleListener {
    state: Arc<Mutex<State>>,
    notify: Arc<Notify>,
}

impl Default for ConsoleListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State::default())), notify: Arc::new(Notify::new()) }
    }

    /// True iff any buffered message class intersects `mask`. Does not
    /// clear anything.
    pub fn received(&self, mask: ConsoleMessageFlags) -> bool {
        self.state.lock().flags.intersects(mask)
    }

    /// Consuming variant: returns true iff intersecting bits were pending,
    /// and clears them (only the bits in `mask`, leaving any others set).
    pub fn check_for_message(&self, mask: ConsoleMessageFlags) -> bool {
        let mut state = self.state.lock();
        !state.flags.remove(mask).is_empty()
    }

    /// Block until any message arrives, the listener is shut down, or a
    /// message is already pending. Returns immediately if `shutdown()` was
    /// already called.
    pub async fn wait_for_message(&self) {
        loop {
            {
                let state = self.state.lock();
                if state.shutdown || !state.flags.is_empty() {
                    return;
                }
            }
            self.notify.notified().await;
        }
    }

    /// The most recently received `StartGrinder` payload, clearing the
    /// `START` flag. Returns `None` if no start message is pending.
    pub fn take_last_start_grinder_message(&self) -> Option<StartGrinder> {
        let mut state = self.state.lock();
        state.flags.remove(ConsoleMessageFlags::START);
        state.last_start.take()
    }

    /// Clear the given bits without consuming any payload they carried.
    pub fn discard_messages(&self, mask: ConsoleMessageFlags) {
        self.state.lock().flags.remove(mask);
    }

    /// Set a terminal flag; subsequent `wait_for_message` calls return
    /// immediately with `SHUTDOWN` raised.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.flags.insert(ConsoleMessageFlags::SHUTDOWN);
        drop(state);
        self.notify.notify_waiters();
    }

    /// Record an inbound console message: set its flag bit, stash the
    /// payload for `StartGrinder`, and wake any waiter.
    ///
    /// Public within the crate because the file store's dispatch tee
    /// (§4.2) feeds messages here directly as one arm of its fallback,
    /// rather than through a registered `Dispatcher` handler.
    pub(crate) fn ingest(&self, message: &ConsoleMessage) {
        let flag = match message {
            ConsoleMessage::StartGrinder(_) => ConsoleMessageFlags::START,
            ConsoleMessage::Stop => ConsoleMessageFlags::STOP,
            ConsoleMessage::Shutdown => ConsoleMessageFlags::SHUTDOWN,
            ConsoleMessage::Reset => ConsoleMessageFlags::RESET,
            ConsoleMessage::Distribution(_) => ConsoleMessageFlags::NONE,
        };
        if flag.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock();
            state.flags.insert(flag);
            if let ConsoleMessage::StartGrinder(start) = message {
                state.last_start = Some(StartGrinder {
                    properties: start.properties.clone(),
                    agent_number: start.agent_number,
                });
            }
        }
        self.notify.notify_waiters();
    }

    /// Install handlers on `dispatcher` that record `Stop`/`Shutdown`/
    /// `Reset`/`StartGrinder` arrivals. `Distribution` is left to the file
    /// store (it carries no flag bit of its own — see
    /// [`swarmload_wire::ConsoleMessage::flag`]).
    pub fn register_message_handlers(&self, dispatcher: &mut Dispatcher<ConsoleMessage>) {
        let listener = self.clone();
        dispatcher.register(move |message: &ConsoleMessage| {
            if message.is_distribution() {
                return HandlerOutcome::Fallthrough;
            }
            listener.ingest(message);
            HandlerOutcome::Consumed
        });
    }
}

#[cfg(test)]
#[path = "console_listener_tests.rs"]
mod tests;
