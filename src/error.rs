//! Error types for the resilient socket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible calls return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use resilient_socket::{Delivery, Result, SocketClient};
//!
//! fn notify(client: &SocketClient) -> Result<()> {
//!     match client.send("kpi-update", None)? {
//!         Delivery::Sent => {}
//!         Delivery::Queued => tracing::debug!("offline, queued for later"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Runtime`] |
//! | Connection | [`Error::Connection`], [`Error::NotConnected`], [`Error::ConnectionClosed`], [`Error::Transport`] |
//! | Per-call | [`Error::Timeout`], [`Error::BatchFailed`] |
//! | External | [`Error::Json`], [`Error::Url`] |
//!
//! Connection-wide failures (construction errors, transport errors,
//! malformed inbound messages) are never returned from the public API.
//! They are broadcast as [`ClientEvent::Error`](crate::ClientEvent::Error).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;
use url::ParseError as UrlError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a config document or server URL is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No async runtime available.
    ///
    /// Returned when a transport or timer must be spawned outside tokio.
    #[error("Runtime unavailable: {message}")]
    Runtime {
        /// Description of the runtime error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport could not be constructed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Client is not connected and the call cannot be queued.
    #[error("Not connected")]
    NotConnected,

    /// Transport closed while a message was being handed over.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Synchronous transport send failure.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Per-call Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// One or more messages of a batch were rejected.
    ///
    /// Messages that were accepted are not rolled back.
    #[error("Failed to send {failed} of {total} messages")]
    BatchFailed {
        /// Number of rejected messages.
        failed: usize,
        /// Number of messages in the batch.
        total: usize,
        /// Detail for each rejected message, in batch order.
        failures: Vec<BatchFailure>,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),
}

// ============================================================================
// BatchFailure
// ============================================================================

/// A single rejected message inside [`Error::BatchFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Position of the message in the submitted batch.
    pub index: usize,
    /// Message kind.
    pub kind: String,
    /// Why the message was rejected.
    pub reason: String,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({}): {}", self.index, self.kind, self.reason)
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a runtime error.
    #[inline]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a batch failure error from the rejected entries.
    #[inline]
    pub fn batch_failed(total: usize, failures: Vec<BatchFailure>) -> Self {
        Self::BatchFailed {
            failed: failures.len(),
            total,
            failures,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::Transport { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
