//! In-process transport.
//!
//! [`MemoryTransportFactory`] hands out transports that never touch the
//! network. The paired [`MemoryRemote`] plays the server: it opens and
//! drops connections, delivers frames, and records what the client sent.
//!
//! # Example
//!
//! ```ignore
//! let factory = MemoryTransportFactory::new();
//! let remote = factory.remote();
//! let client = SocketClient::new(ClientConfig::default(), factory);
//!
//! client.connect();
//! remote.open();
//! remote.deliver_envelope("kpi-update", Some(json!({"id": "mrr"})));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::{EventSink, Transport, TransportFactory};

// ============================================================================
// ConnectMode
// ============================================================================

/// How new connections behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectMode {
    /// Connections stay pending until [`MemoryRemote::open`].
    #[default]
    Manual,
    /// Connections open immediately.
    AutoOpen,
    /// Connections report an error and close with 1006.
    Refuse,
    /// Construction fails synchronously.
    FailConstruction,
}

// ============================================================================
// Shared State
// ============================================================================

struct MemoryConnection {
    sink: EventSink,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    mode: ConnectMode,
    connect_calls: usize,
    connections: Vec<MemoryConnection>,
    sent: Vec<String>,
    rejected_kinds: FxHashSet<String>,
}

impl Shared {
    fn latest(&self) -> Option<&MemoryConnection> {
        self.connections.last()
    }
}

// ============================================================================
// MemoryTransportFactory
// ============================================================================

/// Factory for in-process transports.
#[derive(Clone, Default)]
pub struct MemoryTransportFactory {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransportFactory {
    /// Creates a factory whose connections wait for [`MemoryRemote::open`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with the given connect mode.
    #[must_use]
    pub fn with_mode(mode: ConnectMode) -> Self {
        let factory = Self::default();
        factory.shared.lock().mode = mode;
        factory
    }

    /// Returns the server-side handle.
    #[inline]
    #[must_use]
    pub fn remote(&self) -> MemoryRemote {
        MemoryRemote {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl TransportFactory for MemoryTransportFactory {
    fn connect(&self, url: &Url, events: EventSink) -> Result<Box<dyn Transport>> {
        let mut shared = self.shared.lock();
        shared.connect_calls += 1;

        match shared.mode {
            ConnectMode::FailConstruction => {
                return Err(Error::connection(format!("memory transport refused {url}")));
            }
            ConnectMode::Refuse => {
                events.error("connection refused");
                events.close(1006, "connection refused");
            }
            ConnectMode::AutoOpen => {
                events.open();
            }
            ConnectMode::Manual => {}
        }

        let index = shared.connections.len();
        let closed = shared.mode == ConnectMode::Refuse;
        shared.connections.push(MemoryConnection {
            sink: events,
            closed,
        });
        trace!(index, %url, "Memory transport created");

        Ok(Box::new(MemoryTransport {
            shared: Arc::clone(&self.shared),
            index,
        }))
    }
}

// ============================================================================
// MemoryTransport
// ============================================================================

struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
    index: usize,
}

impl Transport for MemoryTransport {
    fn send(&self, text: String) -> Result<()> {
        let mut shared = self.shared.lock();

        if shared.connections[self.index].closed {
            return Err(Error::ConnectionClosed);
        }

        if !shared.rejected_kinds.is_empty()
            && let Ok(envelope) = Envelope::from_text(&text)
            && shared.rejected_kinds.contains(&envelope.kind)
        {
            return Err(Error::transport(format!("rejected kind '{}'", envelope.kind)));
        }

        shared.sent.push(text);
        Ok(())
    }

    fn close(&self) {
        let mut shared = self.shared.lock();
        let connection = &mut shared.connections[self.index];
        if !connection.closed {
            connection.closed = true;
            connection.sink.close(1000, "closed by client");
        }
    }
}

// ============================================================================
// MemoryRemote
// ============================================================================

/// Server side of a [`MemoryTransportFactory`].
///
/// Lifecycle calls act on the most recently created connection and
/// return `false` when there is none (or it is already closed).
#[derive(Clone)]
pub struct MemoryRemote {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryRemote {
    /// Changes how subsequent connections behave.
    pub fn set_mode(&self, mode: ConnectMode) {
        self.shared.lock().mode = mode;
    }

    /// Number of times the factory was asked to connect.
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.shared.lock().connect_calls
    }

    /// Number of transports actually constructed.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.lock().connections.len()
    }

    /// Returns `true` if the latest connection was closed by the client.
    #[must_use]
    pub fn closed_by_client(&self) -> bool {
        self.shared.lock().latest().is_some_and(|c| c.closed)
    }

    /// Opens the latest connection.
    pub fn open(&self) -> bool {
        self.with_live(|sink| sink.open())
    }

    /// Delivers a raw text frame on the latest connection.
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.with_live(|sink| sink.message(text))
    }

    /// Delivers an envelope on the latest connection.
    pub fn deliver_envelope(&self, kind: &str, payload: Option<Value>) -> bool {
        match Envelope::new(kind, payload).to_text() {
            Ok(text) => self.deliver(text),
            Err(_) => false,
        }
    }

    /// Reports a low-level error on the latest connection.
    pub fn error(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.with_live(|sink| sink.error(message))
    }

    /// Drops the latest connection from the server side.
    pub fn drop_connection(&self, code: u16, reason: &str) -> bool {
        let mut shared = self.shared.lock();
        match shared.connections.last_mut() {
            Some(connection) if !connection.closed => {
                connection.closed = true;
                connection.sink.close(code, reason)
            }
            _ => false,
        }
    }

    /// Makes sends of the given kind fail synchronously.
    pub fn reject_kind(&self, kind: impl Into<String>) {
        self.shared.lock().rejected_kinds.insert(kind.into());
    }

    /// Returns every frame handed over so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.shared.lock().sent.clone()
    }

    /// Returns every frame handed over so far, parsed.
    ///
    /// Frames that are not envelopes are skipped.
    #[must_use]
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.shared
            .lock()
            .sent
            .iter()
            .filter_map(|text| Envelope::from_text(text).ok())
            .collect()
    }

    /// Returns the kinds of every frame handed over so far, in order.
    #[must_use]
    pub fn sent_kinds(&self) -> Vec<String> {
        self.sent_envelopes().into_iter().map(|e| e.kind).collect()
    }

    fn with_live(&self, report: impl FnOnce(&EventSink) -> bool) -> bool {
        let shared = self.shared.lock();
        match shared.latest() {
            Some(connection) if !connection.closed => report(&connection.sink),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
