//! Connection state machine states.

use std::fmt;

use serde::Serialize;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the client's single logical connection.
///
/// ```text
/// Idle ─► Connecting ─► Open ─► Closed ─► Reconnecting ─► Connecting ...
///                                  │
///            disconnect() from any state ─► Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Transport constructed, waiting for open.
    Connecting,
    /// Transport open, sends go straight through.
    Open,
    /// Transport closed or failed. Stays here once retries are exhausted.
    Closed,
    /// Waiting for the reconnect timer.
    Reconnecting,
    /// Caller disconnected. No automatic retries.
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` in the `Open` state.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Maps the state to a WebSocket `readyState` value.
    ///
    /// `0` connecting, `1` open, `3` closed.
    #[inline]
    #[must_use]
    pub const fn ready_state(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Idle | Self::Closed | Self::Reconnecting | Self::Disconnected => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}
