//! Outbound queue.
//!
//! Holds messages accepted while the connection was not open. A message
//! stays queued until it is handed to an open transport; it is removed the
//! moment the hand-off succeeds (no delivery acknowledgment is awaited).

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::SystemTime;

use tracing::{trace, warn};

use crate::error::Error;
use crate::protocol::OutboundMessage;
use crate::transport::Transport;

// ============================================================================
// QueuedMessage
// ============================================================================

/// A message waiting for an open transport.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    /// The caller's message.
    pub message: OutboundMessage,
    /// When it was accepted.
    pub enqueued_at: SystemTime,
}

// ============================================================================
// FlushReport
// ============================================================================

/// Outcome of draining the queue into a transport.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Messages handed to the transport.
    pub delivered: usize,
    /// Messages still queued.
    pub remaining: usize,
    /// Transport error that stopped the flush early.
    pub error: Option<Error>,
}

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of messages accepted while offline.
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<QueuedMessage>,
    enabled: bool,
}

impl OutboundQueue {
    /// Creates an empty queue.
    ///
    /// A disabled queue never accepts messages.
    #[inline]
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            messages: VecDeque::new(),
            enabled,
        }
    }

    /// Returns `true` if the queue accepts messages.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of queued messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message at the tail.
    ///
    /// Returns `false` (and drops the message) if the queue is disabled.
    pub fn push(&mut self, message: OutboundMessage) -> bool {
        if !self.enabled {
            return false;
        }
        self.messages.push_back(QueuedMessage {
            message,
            enqueued_at: SystemTime::now(),
        });
        true
    }

    /// Iterates queued messages from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.messages.iter()
    }

    /// Drops every queued message and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.messages.len();
        self.messages.clear();
        count
    }

    /// Hands queued messages to `transport` in FIFO order.
    ///
    /// Each message is stamped at hand-off. Stops at the first transport
    /// failure and puts that message back at the head.
    pub fn flush(&mut self, transport: &dyn Transport) -> FlushReport {
        let mut report = FlushReport::default();

        while let Some(queued) = self.messages.pop_front() {
            let text = match queued.message.to_envelope().to_text() {
                Ok(text) => text,
                Err(e) => {
                    warn!(kind = %queued.message.kind, error = %e, "Dropping unserializable message");
                    continue;
                }
            };

            match transport.send(text) {
                Ok(()) => {
                    trace!(kind = %queued.message.kind, "Flushed queued message");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(kind = %queued.message.kind, error = %e, "Flush interrupted");
                    self.messages.push_front(queued);
                    report.error = Some(e);
                    break;
                }
            }
        }

        report.remaining = self.messages.len();
        report
    }
}

// ============================================================================
// Tests
// ============================================================================
