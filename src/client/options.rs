//! Client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use resilient_socket::ClientConfig;
//!
//! let config = ClientConfig::new("ws://localhost:3001")
//!     .with_reconnect_interval(Duration::from_secs(3))
//!     .with_max_reconnect_attempts(20);
//!
//! assert!(config.auto_reconnect);
//! assert_eq!(config.reconnect_interval(), Duration::from_secs(3));
//! ```
//!
//! Config documents use camelCase keys. Missing keys fall back to the
//! defaults below and unknown keys are ignored:
//!
//! ```json
//! {
//!   "serverUrl": "ws://finance.internal:3001",
//!   "autoReconnect": true,
//!   "reconnectIntervalMs": 5000,
//!   "maxReconnectAttempts": 10,
//!   "messageQueueEnabled": true,
//!   "pingTimeoutMs": 5000,
//!   "backoff": { "strategy": "fixed" }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

use super::reconnect::Backoff;

// ============================================================================
// Constants
// ============================================================================

/// Server URL used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3001";

/// Environment variable read by [`ClientConfig::from_env`].
pub const SERVER_URL_ENV: &str = "RESILIENT_SOCKET_URL";

/// Fixed delay between reconnect attempts.
const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Reconnect attempts before giving up.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Time to wait for a `pong`.
const DEFAULT_PING_TIMEOUT_MS: u64 = 5_000;

/// Process-default tuning used by [`ClientConfig::from_env`].
const ENV_RECONNECT_INTERVAL_MS: u64 = 3_000;
const ENV_MAX_RECONNECT_ATTEMPTS: u32 = 20;

// ============================================================================
// ClientConfig
// ============================================================================

/// Configuration of a [`SocketClient`](crate::SocketClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Endpoint the transport connects to.
    pub server_url: String,

    /// Retry automatically after an unexpected close.
    pub auto_reconnect: bool,

    /// Base delay between reconnect attempts, in milliseconds.
    #[serde(alias = "reconnectInterval")]
    pub reconnect_interval_ms: u64,

    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Queue sends while not connected instead of rejecting them.
    #[serde(alias = "messageQueue")]
    pub message_queue_enabled: bool,

    /// Time to wait for a `pong`, in milliseconds.
    pub ping_timeout_ms: u64,

    /// Delay growth between attempts.
    pub backoff: Backoff,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            auto_reconnect: true,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            message_queue_enabled: true,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            backoff: Backoff::Fixed,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientConfig {
    /// Creates a config with default settings for `server_url`.
    #[inline]
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Parses a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the document is not
    /// valid JSON or a recognized key has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Creates the process-default config.
    ///
    /// Reads the server URL from `RESILIENT_SOCKET_URL` (falling back to
    /// `ws://localhost:3001`) and retries every 3s up to 20 times.
    #[must_use]
    pub fn from_env() -> Self {
        let server_url = env::var(SERVER_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        Self {
            server_url,
            reconnect_interval_ms: ENV_RECONNECT_INTERVAL_MS,
            max_reconnect_attempts: ENV_MAX_RECONNECT_ATTEMPTS,
            ..Default::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientConfig {
    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the base delay between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the reconnect attempt bound.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enables or disables queuing while offline.
    #[inline]
    #[must_use]
    pub fn with_message_queue(mut self, enabled: bool) -> Self {
        self.message_queue_enabled = enabled;
        self
    }

    /// Sets the ping timeout.
    #[inline]
    #[must_use]
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the backoff strategy.
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientConfig {
    /// Base delay between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Time to wait for a `pong`.
    #[inline]
    #[must_use]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Parses the server URL.
    pub(crate) fn parse_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.server_url)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
