//! WebSocket transport over tokio-tungstenite.
//!
//! # Event Loop
//!
//! Each transport spawns one tokio task that:
//!
//! - Performs the client handshake and reports `Open`
//! - Forwards inbound text frames as `Message`
//! - Writes outbound frames queued by [`Transport::send`]
//! - Reports exactly one `Close` when the socket ends for any reason

// ============================================================================
// Imports
// ============================================================================

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{EventSink, Transport, TransportFactory};

// ============================================================================
// Constants
// ============================================================================

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Closed without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Peer sent a close frame without a status code.
const CLOSE_NO_STATUS: u16 = 1005;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsWrite = SplitSink<WsStream, Message>;

/// Commands for the event loop.
enum Outgoing {
    /// Write a text frame.
    Text(String),
    /// Close the socket.
    Close,
}

// ============================================================================
// WebSocketTransportFactory
// ============================================================================

/// Creates tokio-tungstenite client transports.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransportFactory;

impl WebSocketTransportFactory {
    /// Creates a new factory.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransportFactory for WebSocketTransportFactory {
    fn connect(&self, url: &Url, events: EventSink) -> Result<Box<dyn Transport>> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::config(format!(
                    "Unsupported URL scheme '{other}' (expected ws or wss)"
                )));
            }
        }

        let handle = Handle::try_current()
            .map_err(|e| Error::runtime(format!("WebSocket transport needs tokio: {e}")))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        handle.spawn(run_event_loop(url.clone(), command_rx, events));

        debug!(%url, "WebSocket transport created");

        Ok(Box::new(WebSocketTransport { command_tx }))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Handle to a spawned WebSocket event loop.
///
/// Dropping the handle closes the socket.
pub struct WebSocketTransport {
    command_tx: mpsc::UnboundedSender<Outgoing>,
}

impl Transport for WebSocketTransport {
    fn send(&self, text: String) -> Result<()> {
        self.command_tx
            .send(Outgoing::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(Outgoing::Close);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Drives one socket from handshake to close.
async fn run_event_loop(
    url: Url,
    mut command_rx: mpsc::UnboundedReceiver<Outgoing>,
    events: EventSink,
) {
    let ws_stream = tokio::select! {
        connected = connect_async(url.as_str()) => match connected {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!(%url, error = %e, "WebSocket handshake failed");
                events.error(e.to_string());
                events.close(CLOSE_ABNORMAL, e.to_string());
                return;
            }
        },
        _ = wait_for_close(&mut command_rx) => {
            debug!(%url, "Closed before handshake completed");
            events.close(CLOSE_NORMAL, "closed before open");
            return;
        }
    };

    events.open();
    debug!(%url, "WebSocket connection established");

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (code, reason) = loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Frame received");
                        events.message(text.as_str());
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!("WebSocket closed by remote");
                        break close_parts(frame);
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        events.error(e.to_string());
                        break (CLOSE_ABNORMAL, e.to_string());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break (CLOSE_ABNORMAL, String::from("stream ended"));
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames and commands from the client
            command = command_rx.recv() => {
                match command {
                    Some(Outgoing::Text(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to write frame");
                            events.error(e.to_string());
                            break (CLOSE_ABNORMAL, e.to_string());
                        }
                    }

                    Some(Outgoing::Close) | None => {
                        close_write(&mut ws_write).await;
                        break (CLOSE_NORMAL, String::from("closed by client"));
                    }
                }
            }
        }
    };

    events.close(code, reason);
    debug!("Event loop terminated");
}

/// Resolves once the client asks to close (or drops the transport).
async fn wait_for_close(command_rx: &mut mpsc::UnboundedReceiver<Outgoing>) {
    loop {
        match command_rx.recv().await {
            Some(Outgoing::Close) | None => return,
            // Frames are never handed over before Open
            Some(Outgoing::Text(_)) => continue,
        }
    }
}

async fn close_write(ws_write: &mut WsWrite) {
    if let Err(e) = ws_write.close().await {
        debug!(error = %e, "Close handshake failed");
    }
}

fn close_parts(frame: Option<CloseFrame>) -> (u16, String) {
    match frame {
        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_string()),
        None => (CLOSE_NO_STATUS, String::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================
