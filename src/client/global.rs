//! Process-wide default client.
//!
//! Prefer constructing a [`SocketClient`] at the application's composition
//! root and passing it down. The global exists for call sites that have no
//! such wiring; it follows exactly the same lifecycle rules.

use std::sync::OnceLock;

use super::core::SocketClient;
use super::options::ClientConfig;

static GLOBAL: OnceLock<SocketClient> = OnceLock::new();

/// Returns the process-wide client, creating it on first use.
///
/// Built from [`ClientConfig::from_env`] over WebSocket. It is not
/// connected automatically.
pub fn global() -> &'static SocketClient {
    GLOBAL.get_or_init(|| SocketClient::with_websocket(ClientConfig::from_env()))
}
