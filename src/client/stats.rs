//! Connection statistics snapshot.

use serde::Serialize;

use super::state::ConnectionState;

/// Point-in-time view of a client, computed from live state on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    /// Current connection state.
    pub state: ConnectionState,
    /// `true` when the state is `Open`.
    pub is_connected: bool,
    /// Retries made since the last successful open.
    pub reconnect_attempts: u32,
    /// Messages waiting in the outbound queue.
    pub queued_messages: usize,
    /// Distinct event names with at least one handler.
    pub event_count: usize,
    /// Handlers across all event names.
    pub total_handlers: usize,
}

impl ClientStats {
    /// WebSocket `readyState` equivalent of [`state`](Self::state).
    #[inline]
    #[must_use]
    pub const fn ready_state(&self) -> u8 {
        self.state.ready_state()
    }
}
