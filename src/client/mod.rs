//! Resilient socket client.
//!
//! # Connection Lifecycle
//!
//! 1. [`SocketClient::connect`] - build a transport (`Connecting`)
//! 2. Transport opens - attempts reset, queue flushed, `connect` emitted (`Open`)
//! 3. Transport closes - `disconnect` emitted (`Closed`)
//! 4. [`ReconnectPolicy`] - wait, then back to 1 (`Reconnecting`)
//! 5. [`SocketClient::disconnect`] - stop for good (`Disconnected`)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | `SocketClient` state machine, delivery, dispatch |
//! | `global` | Process-wide default client |
//! | `options` | `ClientConfig` |
//! | `queue` | Outbound FIFO |
//! | `reconnect` | Retry policy and backoff |
//! | `registry` | Handler registry and `Subscription` disposers |
//! | `state` | `ConnectionState` |
//! | `stats` | `ClientStats` snapshot |

// ============================================================================
// Submodules
// ============================================================================

/// `SocketClient` state machine, delivery, and dispatch.
pub mod core;

/// Process-wide default client.
pub mod global;

/// Client configuration.
pub mod options;

/// Outbound FIFO.
pub mod queue;

/// Retry policy and backoff.
pub mod reconnect;

/// Handler registry and subscription disposers.
pub mod registry;

/// Connection states.
pub mod state;

/// Statistics snapshot.
pub mod stats;

#[cfg(test)]
mod tests;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Delivery, SocketClient};
pub use global::global;
pub use options::{ClientConfig, DEFAULT_SERVER_URL, SERVER_URL_ENV};
pub use queue::{FlushReport, OutboundQueue, QueuedMessage};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use registry::{Handler, Subscription, SubscriptionGuard};
pub use state::ConnectionState;
pub use stats::ClientStats;
