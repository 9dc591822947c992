//! Resilient Socket - WebSocket client that survives its network.
//!
//! This library wraps one logical WebSocket connection with automatic
//! reconnection, an outbound queue for messages sent while offline, and
//! typed events for subscribers.
//!
//! # Architecture
//!
//! - **Client**: [`SocketClient`] owns the state machine, the queue, and
//!   the subscriber registry
//! - **Transport**: pluggable through [`TransportFactory`]; WebSocket by
//!   default, in-process for tests
//!
//! Key design principles:
//!
//! - Sends never block: delivered, queued, or rejected immediately
//! - Queued messages leave in FIFO order before any post-connect send
//! - A failing subscriber never affects the connection or other subscribers
//! - Events from a superseded transport are ignored
//!
//! # Quick Start
//!
//! ```no_run
//! use resilient_socket::{ClientConfig, ClientEvent, Result, SocketClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = SocketClient::with_websocket(
//!         ClientConfig::new("ws://localhost:3001").with_max_reconnect_attempts(5),
//!     );
//!
//!     client.on("connect", |_: &ClientEvent| println!("connected"));
//!     client.on("kpi-update", |event: &ClientEvent| {
//!         println!("kpi: {:?}", event.payload());
//!     });
//!
//!     // Queued until the transport opens.
//!     client.send("subscribe", Some(json!({"channel": "kpi"})))?;
//!     client.connect();
//!
//!     let latency = client.ping().await?;
//!     println!("round trip: {latency:?}");
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`SocketClient`], configuration, queue, reconnect policy |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire envelope and client events |
//! | [`transport`] | Transport seam, WebSocket and in-process transports |

// ============================================================================
// Modules
// ============================================================================

/// Socket client and its supporting types.
///
/// Use [`SocketClient::new`] or [`SocketClient::with_websocket`] to create
/// a client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire envelope and client event types.
pub mod protocol;

/// Transport layer.
///
/// The seam between the client and the network.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Backoff, ClientConfig, ClientStats, ConnectionState, Delivery, Handler, ReconnectPolicy,
    SocketClient, Subscription, SubscriptionGuard, global,
};

// Error types
pub use error::{BatchFailure, Error, Result};

// Identifier types
pub use identifiers::{ClientId, SubscriptionId};

// Protocol types
pub use protocol::{
    ClientEvent, DisconnectInfo, Envelope, ErrorEvent, ErrorKind, EventName, OutboundMessage,
};

// Transport types
pub use transport::{
    ConnectMode, EventSink, MemoryRemote, MemoryTransportFactory, Transport, TransportEvent,
    TransportFactory, WebSocketTransportFactory,
};
