//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - A local WebSocket server to connect to

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use resilient_socket::{Envelope, Result};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "resilient_socket=debug"
    } else {
        "resilient_socket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Starts a local server on a random port and returns its `ws://` URL.
///
/// Answers `ping` with `pong` and echoes every other envelope.
pub async fn spawn_echo_server() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| resilient_socket::Error::connection(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| resilient_socket::Error::connection(e.to_string()))?
        .port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(Message::Text(text))) = ws.next().await {
                    let reply = match Envelope::from_text(text.as_str()) {
                        Ok(envelope) if envelope.kind == "ping" => Envelope::new("pong", None),
                        Ok(envelope) => Envelope::new(envelope.kind, envelope.payload),
                        Err(_) => continue,
                    };
                    let Ok(reply) = reply.to_text() else {
                        continue;
                    };
                    if ws.send(Message::Text(reply.into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    Ok(format!("ws://127.0.0.1:{port}"))
}
