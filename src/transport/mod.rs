//! Transport layer.
//!
//! The client depends on transports only through [`TransportFactory`] and
//! [`Transport`]. Any text-message channel can satisfy the seam.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   connect(url, sink)   ┌──────────────────┐
//! │  SocketClient   │───────────────────────►│ TransportFactory │
//! │                 │                        └────────┬─────────┘
//! │  pump task  ◄───┼──── TransportEvent ────┐        │ creates
//! │                 │                        │ ┌──────▼─────────┐
//! │  send(text) ────┼────────────────────────┼►│   Transport    │
//! └─────────────────┘                        └─┤  (EventSink)   │
//!                                              └────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Transport events and the sink that carries them |
//! | `factory` | `Transport` and `TransportFactory` traits |
//! | `memory` | In-process transport for tests and loopback |
//! | `websocket` | tokio-tungstenite client transport |

// ============================================================================
// Submodules
// ============================================================================

/// Transport events and the sink that carries them.
pub mod event;

/// `Transport` and `TransportFactory` traits.
pub mod factory;

/// In-process transport.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{EventSink, EventStream, TransportEvent};
pub use factory::{Transport, TransportFactory};
pub use memory::{ConnectMode, MemoryRemote, MemoryTransportFactory};
pub use websocket::{WebSocketTransport, WebSocketTransportFactory};
