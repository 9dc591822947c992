//! Transport events and the sink transports report them through.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

// ============================================================================
// TransportEvent
// ============================================================================

/// Low-level event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Channel is open and accepts sends.
    Open,
    /// Text frame received.
    Message(String),
    /// Channel closed. Reported at most once per transport.
    Close {
        /// Close code (1000 = normal, 1006 = abnormal).
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
    /// Low-level error. A `Close` usually follows.
    Error(String),
}

// ============================================================================
// EventSink
// ============================================================================

/// Receiving end paired with an [`EventSink`].
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Where a transport reports its events.
///
/// Each transport instance gets its own sink. Reports never block; they
/// return `false` once the client stopped listening.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    /// Creates a sink and the stream it feeds.
    #[must_use]
    pub fn channel() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports an arbitrary event.
    #[inline]
    pub fn report(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Reports that the channel opened.
    #[inline]
    pub fn open(&self) -> bool {
        self.report(TransportEvent::Open)
    }

    /// Reports an inbound text frame.
    #[inline]
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.report(TransportEvent::Message(text.into()))
    }

    /// Reports that the channel closed.
    #[inline]
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.report(TransportEvent::Close {
            code,
            reason: reason.into(),
        })
    }

    /// Reports a low-level error.
    #[inline]
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.report(TransportEvent::Error(message.into()))
    }

    /// Returns `true` if nobody listens anymore.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================
