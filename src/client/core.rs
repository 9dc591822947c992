//! Socket client: connection lifecycle, outbound delivery, and event dispatch.
//!
//! # Event Loop
//!
//! Every transport gets a pump task that feeds its events back into the
//! client. Events are tagged with the connection generation they belong
//! to; once the client moves on (reconnect, `disconnect()`), events from
//! the superseded transport are dropped.
//!
//! Handlers run on the pump task, synchronously and in registration order.
//! No client lock is held while a handler runs, so handlers may call back
//! into the client.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::error::{BatchFailure, Error, Result};
use crate::identifiers::{ClientId, SubscriptionId};
use crate::protocol::{
    ClientEvent, DisconnectInfo, Envelope, ErrorEvent, EventName, OutboundMessage,
};
use crate::transport::websocket::CLOSE_NORMAL;
use crate::transport::{
    EventSink, EventStream, Transport, TransportEvent, TransportFactory, WebSocketTransportFactory,
};

use super::options::ClientConfig;
use super::queue::OutboundQueue;
use super::reconnect::ReconnectPolicy;
use super::registry::{Handler, Subscription, SubscriptionRegistry};
use super::state::ConnectionState;
use super::stats::ClientStats;

// ============================================================================
// Delivery
// ============================================================================

/// Accepted outcome of a send.
///
/// `Queued` means "accepted for eventual delivery", not delivered. Callers
/// that need confirmation must run their own acknowledgment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open transport.
    Sent,
    /// Stored in the outbound queue until the next open.
    Queued,
}

// ============================================================================
// Inner State
// ============================================================================

/// Mutable connection state, guarded by one lock.
struct ConnectionCore {
    state: ConnectionState,
    /// Bumped on every connect and disconnect.
    generation: u64,
    reconnect_attempts: u32,
    manually_disconnected: bool,
    transport: Option<Box<dyn Transport>>,
    queue: OutboundQueue,
}

struct Inner {
    id: ClientId,
    config: ClientConfig,
    policy: ReconnectPolicy,
    factory: Box<dyn TransportFactory>,
    core: Mutex<ConnectionCore>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(transport) = self.core.get_mut().transport.take() {
            transport.close();
        }
    }
}

// ============================================================================
// SocketClient
// ============================================================================

/// One logical connection with auto-reconnect and offline queuing.
///
/// `SocketClient` is a cheap handle; clones share the same connection.
/// Timers and pump tasks hold weak references, so dropping the last handle
/// tears the connection down.
///
/// Requires a tokio runtime for `connect()`. Without one, the failure is
/// reported as an `error` event.
///
/// # Example
///
/// ```no_run
/// use resilient_socket::{ClientConfig, ClientEvent, SocketClient};
///
/// # async fn example() -> resilient_socket::Result<()> {
/// let client = SocketClient::with_websocket(ClientConfig::new("ws://localhost:3001"));
///
/// client.on("kpi-update", |event: &ClientEvent| {
///     println!("kpi: {:?}", event.payload());
/// });
///
/// client.connect();
/// client.send("subscribe", Some(serde_json::json!({"channel": "kpi"})))?;
/// let latency = client.ping().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SocketClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketClient")
            .field("id", &self.inner.id)
            .field("server_url", &self.inner.config.server_url)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// SocketClient - Constructors
// ============================================================================

impl SocketClient {
    /// Creates a client that builds transports with `factory`.
    ///
    /// Nothing connects until [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(config: ClientConfig, factory: impl TransportFactory) -> Self {
        let policy = ReconnectPolicy::from_config(&config);
        let queue = OutboundQueue::new(config.message_queue_enabled);

        Self {
            inner: Arc::new(Inner {
                id: ClientId::generate(),
                config,
                policy,
                factory: Box::new(factory),
                core: Mutex::new(ConnectionCore {
                    state: ConnectionState::Idle,
                    generation: 0,
                    reconnect_attempts: 0,
                    manually_disconnected: false,
                    transport: None,
                    queue,
                }),
                registry: Arc::new(Mutex::new(SubscriptionRegistry::default())),
            }),
        }
    }

    /// Creates a client over tokio-tungstenite WebSockets.
    #[must_use]
    pub fn with_websocket(config: ClientConfig) -> Self {
        Self::new(config, WebSocketTransportFactory::new())
    }
}

// ============================================================================
// SocketClient - Accessors
// ============================================================================

impl SocketClient {
    /// Returns the client ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    /// Returns `true` if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> ClientStats {
        let (state, reconnect_attempts, queued_messages) = {
            let core = self.inner.core.lock();
            (core.state, core.reconnect_attempts, core.queue.len())
        };
        let registry = self.inner.registry.lock();

        ClientStats {
            state,
            is_connected: state.is_open(),
            reconnect_attempts,
            queued_messages,
            event_count: registry.event_count(),
            total_handlers: registry.total_handlers(),
        }
    }
}

// ============================================================================
// SocketClient - Lifecycle
// ============================================================================

impl SocketClient {
    /// Opens the connection.
    ///
    /// No-op while `Connecting` or `Open`. Failures are reported through
    /// the `error` event and handed to the reconnect policy.
    pub fn connect(&self) {
        let failure = {
            let mut core = self.inner.core.lock();
            if matches!(
                core.state,
                ConnectionState::Open | ConnectionState::Connecting
            ) {
                trace!(client_id = %self.inner.id, state = %core.state, "connect() ignored");
                return;
            }

            if let Some(stale) = core.transport.take() {
                stale.close();
            }

            core.manually_disconnected = false;
            core.state = ConnectionState::Connecting;
            core.generation += 1;

            match self.open_transport(core.generation) {
                Ok(transport) => {
                    core.transport = Some(transport);
                    None
                }
                Err(e) => {
                    core.state = ConnectionState::Closed;
                    Some(e)
                }
            }
        };

        match failure {
            None => {
                debug!(client_id = %self.inner.id, url = %self.inner.config.server_url, "Connecting");
            }
            Some(e) => {
                warn!(client_id = %self.inner.id, error = %e, "Failed to create transport");
                self.emit(ClientEvent::Error(ErrorEvent::construction(e.to_string())));
                self.schedule_reconnect();
            }
        }
    }

    /// Closes the connection and stops automatic reconnection.
    ///
    /// Resets the attempt counter. A pending reconnect timer becomes a
    /// no-op. Idempotent.
    pub fn disconnect(&self) {
        let transport = {
            let mut core = self.inner.core.lock();
            if core.state == ConnectionState::Disconnected {
                return;
            }
            core.manually_disconnected = true;
            core.reconnect_attempts = 0;
            core.generation += 1;
            core.state = ConnectionState::Disconnected;
            core.transport.take()
        };

        info!(client_id = %self.inner.id, "Disconnected by caller");

        if let Some(transport) = transport {
            transport.close();
            self.emit(ClientEvent::Disconnect(DisconnectInfo::new(
                CLOSE_NORMAL,
                "client disconnect",
            )));
        }
    }

    /// Builds a transport and its pump task. Called with the core locked.
    fn open_transport(&self, generation: u64) -> Result<Box<dyn Transport>> {
        let handle = Handle::try_current()
            .map_err(|e| Error::runtime(format!("connect() needs a tokio runtime: {e}")))?;
        let url = self.inner.config.parse_url()?;

        let (sink, stream) = EventSink::channel();
        let transport = self.inner.factory.connect(&url, sink)?;

        handle.spawn(Self::run_pump(
            Arc::downgrade(&self.inner),
            generation,
            stream,
        ));

        Ok(transport)
    }

    /// Feeds one transport's events into the client until it closes.
    async fn run_pump(inner: Weak<Inner>, generation: u64, mut stream: EventStream) {
        while let Some(event) = stream.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !(SocketClient { inner }).handle_event(generation, event) {
                break;
            }
        }
        trace!(generation, "Pump terminated");
    }
}

// ============================================================================
// SocketClient - Transport Events
// ============================================================================

impl SocketClient {
    /// Dispatches one transport event. Returns `false` to stop the pump.
    fn handle_event(&self, generation: u64, event: TransportEvent) -> bool {
        if self.inner.core.lock().generation != generation {
            trace!(client_id = %self.inner.id, generation, "Dropping event from superseded transport");
            return false;
        }

        match event {
            TransportEvent::Open => self.handle_open(generation),
            TransportEvent::Message(text) => self.handle_message(text),
            TransportEvent::Error(message) => self.handle_transport_error(message),
            TransportEvent::Close { code, reason } => {
                self.handle_close(generation, code, reason);
                return false;
            }
        }
        true
    }

    fn handle_open(&self, generation: u64) {
        let report = {
            let mut core = self.inner.core.lock();
            if core.generation != generation || core.state != ConnectionState::Connecting {
                return;
            }
            core.state = ConnectionState::Open;
            core.reconnect_attempts = 0;

            let ConnectionCore {
                transport, queue, ..
            } = &mut *core;
            transport.as_deref().map(|t| queue.flush(t))
        };

        if let Some(report) = report {
            info!(
                client_id = %self.inner.id,
                flushed = report.delivered,
                remaining = report.remaining,
                "Connected"
            );
        }
        self.emit(ClientEvent::Connect);
    }

    fn handle_message(&self, text: String) {
        match Envelope::from_text(&text) {
            Ok(envelope) => {
                trace!(client_id = %self.inner.id, kind = %envelope.kind, "Message received");
                self.emit(ClientEvent::Message(envelope.clone()));
                self.emit(ClientEvent::for_envelope(envelope));
            }
            Err(e) => {
                warn!(client_id = %self.inner.id, error = %e, raw = %text, "Failed to parse inbound message");
                self.emit(ClientEvent::Error(ErrorEvent::parse(e.to_string(), text)));
            }
        }
    }

    fn handle_transport_error(&self, message: String) {
        warn!(client_id = %self.inner.id, error = %message, "Transport error");
        self.emit(ClientEvent::Error(ErrorEvent::transport(message)));
    }

    fn handle_close(&self, generation: u64, code: u16, reason: String) {
        {
            let mut core = self.inner.core.lock();
            if core.generation != generation {
                return;
            }
            core.transport = None;
            core.state = ConnectionState::Closed;
        }

        info!(client_id = %self.inner.id, code, reason = %reason, "Connection closed");
        self.emit(ClientEvent::Disconnect(DisconnectInfo::new(code, reason)));
        self.schedule_reconnect();
    }
}

// ============================================================================
// SocketClient - Reconnect
// ============================================================================

impl SocketClient {
    /// Applies the reconnect policy after an unexpected close.
    fn schedule_reconnect(&self) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(client_id = %self.inner.id, error = %e, "Cannot schedule reconnect without a runtime");
                return;
            }
        };

        let (delay, generation, attempt) = {
            let mut core = self.inner.core.lock();
            if core.manually_disconnected || core.state != ConnectionState::Closed {
                return;
            }

            let Some(delay) = self.inner.policy.next_delay(core.reconnect_attempts) else {
                if self.inner.policy.enabled {
                    warn!(
                        client_id = %self.inner.id,
                        attempts = core.reconnect_attempts,
                        "Reconnect attempts exhausted"
                    );
                }
                return;
            };

            core.reconnect_attempts += 1;
            core.state = ConnectionState::Reconnecting;
            (delay, core.generation, core.reconnect_attempts)
        };

        info!(
            client_id = %self.inner.id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let inner = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            sleep(delay).await;

            let Some(inner) = inner.upgrade() else {
                return;
            };
            let client = SocketClient { inner };
            if client.reconnect_due(generation) {
                client.connect();
            } else {
                debug!(client_id = %client.inner.id, attempt, "Reconnect timer superseded");
            }
        });
    }

    /// A fired timer only proceeds if nothing happened since it was armed.
    fn reconnect_due(&self, generation: u64) -> bool {
        let core = self.inner.core.lock();
        core.state == ConnectionState::Reconnecting
            && core.generation == generation
            && !core.manually_disconnected
    }
}

// ============================================================================
// SocketClient - Sending
// ============================================================================

impl SocketClient {
    /// Sends a message, or queues it while not connected.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if offline and queuing is disabled
    /// - the transport's error if an open transport rejects the frame
    pub fn send(&self, kind: impl Into<String>, payload: Option<Value>) -> Result<Delivery> {
        self.send_message(OutboundMessage {
            kind: kind.into(),
            payload,
        })
    }

    /// Sends a message with a serialized payload.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`Error::Json`] if `payload` cannot be
    /// serialized.
    pub fn send_json<T: Serialize + ?Sized>(
        &self,
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Delivery> {
        self.send_message(OutboundMessage::json(kind, payload)?)
    }

    /// Sends a prepared message.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send).
    pub fn send_message(&self, message: OutboundMessage) -> Result<Delivery> {
        let mut core = self.inner.core.lock();

        if core.state.is_open()
            && let Some(transport) = core.transport.as_deref()
        {
            let text = message.to_envelope().to_text()?;
            transport.send(text)?;
            trace!(client_id = %self.inner.id, kind = %message.kind, "Message sent");
            return Ok(Delivery::Sent);
        }

        if core.queue.push(message) {
            debug!(client_id = %self.inner.id, queued = core.queue.len(), "Message queued while offline");
            Ok(Delivery::Queued)
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Sends every message, in order, and reports failures together.
    ///
    /// Accepted messages are not rolled back when others fail.
    ///
    /// # Errors
    ///
    /// [`Error::BatchFailed`] naming each rejected message.
    pub fn send_batch<I>(&self, messages: I) -> Result<Vec<Delivery>>
    where
        I: IntoIterator<Item = OutboundMessage>,
    {
        let mut deliveries = Vec::new();
        let mut failures = Vec::new();
        let mut total = 0;

        for (index, message) in messages.into_iter().enumerate() {
            total += 1;
            let kind = message.kind.clone();
            match self.send_message(message) {
                Ok(delivery) => deliveries.push(delivery),
                Err(e) => failures.push(BatchFailure {
                    index,
                    kind,
                    reason: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(deliveries)
        } else {
            warn!(client_id = %self.inner.id, failed = failures.len(), total, "Batch partially rejected");
            Err(Error::batch_failed(total, failures))
        }
    }

    /// Hands a message to the open transport, never queuing it.
    ///
    /// The open check and the hand-off happen under one lock.
    fn send_now(&self, message: &OutboundMessage) -> Result<()> {
        let core = self.inner.core.lock();
        match core.transport.as_deref() {
            Some(transport) if core.state.is_open() => {
                transport.send(message.to_envelope().to_text()?)?;
                trace!(client_id = %self.inner.id, kind = %message.kind, "Message sent");
                Ok(())
            }
            _ => Err(Error::NotConnected),
        }
    }

    /// Drops every queued message and returns how many there were.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.inner.core.lock().queue.clear();
        if dropped > 0 {
            debug!(client_id = %self.inner.id, dropped, "Outbound queue cleared");
        }
        dropped
    }

    /// Measures a `ping` → `pong` round trip.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the transport is not open
    /// - [`Error::Timeout`] if no `pong` arrives within the ping timeout
    /// - the send error if the `ping` frame is rejected
    pub async fn ping(&self) -> Result<Duration> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let (pong_tx, pong_rx) = oneshot::channel();
        let pong_tx = Mutex::new(Some(pong_tx));
        let _listener = self
            .on(EventName::Pong, move |_: &ClientEvent| {
                if let Some(tx) = pong_tx.lock().take() {
                    let _ = tx.send(());
                }
            })
            .guard();

        let started = Instant::now();
        self.send_now(&OutboundMessage::new("ping"))?;

        let ping_timeout = self.inner.config.ping_timeout();
        match timeout(ping_timeout, pong_rx).await {
            Ok(Ok(())) => {
                let latency = started.elapsed();
                debug!(client_id = %self.inner.id, latency_ms = latency.as_millis() as u64, "Pong received");
                Ok(latency)
            }
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::timeout("ping", ping_timeout.as_millis() as u64)),
        }
    }
}

// ============================================================================
// SocketClient - Subscriptions
// ============================================================================

impl SocketClient {
    /// Registers a handler for one event.
    ///
    /// `name` accepts an [`EventName`] or a string (`"connect"`,
    /// `"disconnect"`, `"message"`, `"error"`, `"pong"`, or a message kind).
    pub fn on<N, F>(&self, name: N, handler: F) -> Subscription
    where
        N: Into<EventName>,
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.subscribe([name], handler)
    }

    /// Registers one handler for several events.
    ///
    /// A name listed more than once is registered once.
    pub fn subscribe<I, N, F>(&self, names: I, handler: F) -> Subscription
    where
        I: IntoIterator<Item = N>,
        N: Into<EventName>,
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let mut seen = FxHashSet::default();
        let entries = {
            let mut registry = self.inner.registry.lock();
            names
                .into_iter()
                .map(Into::<EventName>::into)
                .filter(|name| seen.insert(name.clone()))
                .map(|name| {
                    let id = registry.insert(name.clone(), Arc::clone(&handler));
                    (name, id)
                })
                .collect()
        };
        Subscription::new(&self.inner.registry, entries)
    }

    /// Removes one handler. Returns `false` if it was not registered.
    pub fn off(&self, name: &EventName, id: SubscriptionId) -> bool {
        self.inner.registry.lock().remove(name, id)
    }

    /// Invokes the handlers for `event`, isolating panics.
    fn emit(&self, event: ClientEvent) {
        let name = event.name();
        let handlers = self.inner.registry.lock().handlers_for(&name);

        if handlers.is_empty() {
            if let ClientEvent::Error(error) = &event {
                debug!(client_id = %self.inner.id, error = %error, "No error subscriber");
            }
            return;
        }

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                error!(
                    client_id = %self.inner.id,
                    event = %name,
                    panic = panic_message(panic.as_ref()),
                    "Event handler panicked"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
