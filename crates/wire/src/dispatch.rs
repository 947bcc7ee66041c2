// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A small ordered handler chain for routing inbound messages.
//!
//! `ConsoleCommunication` wires one `Dispatcher<ConsoleMessage>` per session:
//! the file store claims distribution messages, everything else falls
//! through to the console listener's tee (which itself forwards a filtered
//! copy to the live worker fan-out sender). Handlers run in registration
//! order; the first one that claims a message stops the chain.

/// What a handler did with the message it was offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler claimed the message; no further handler or fallback runs.
    Consumed,
    /// The handler declined; try the next handler (or the fallback).
    Fallthrough,
}

/// An ordered chain of message handlers with an optional fallback.
pub struct Dispatcher<T> {
    handlers: Vec<Box<dyn FnMut(&T) -> HandlerOutcome + Send>>,
    fallback: Option<Box<dyn FnMut(&T) + Send>>,
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Self { handlers: Vec::new(), fallback: None }
    }

    /// Register a handler. Handlers are tried in the order they were
    /// registered; the first to return [`HandlerOutcome::Consumed`] stops
    /// the chain for that message.
    pub fn register(&mut self, handler: impl FnMut(&T) -> HandlerOutcome + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Install the tee invoked when no registered handler claims a message.
    pub fn set_fallback(&mut self, fallback: impl FnMut(&T) + Send + 'static) {
        self.fallback = Some(Box::new(fallback));
    }

    /// Run `message` through the chain, then the fallback if nothing claimed it.
    pub fn dispatch(&mut self, message: &T) {
        for handler in &mut self.handlers {
            if handler(message) == HandlerOutcome::Consumed {
                return;
            }
        }
        if let Some(fallback) = &mut self.fallback {
            fallback(message);
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
