//! Basic connect, send, and ping.
//!
//! Demonstrates:
//! - Creating a client over WebSocket
//! - Queuing a message before the connection opens
//! - Receiving kind-specific events
//! - Measuring a ping round trip
//! - Reading stats and disconnecting
//!
//! Usage:
//!   cargo run --example 001_basic_connect
//!   cargo run --example 001_basic_connect -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use resilient_socket::{ClientConfig, ClientEvent, Delivery, Result, SocketClient};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Constants
// ============================================================================

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 001: Basic Connect ===\n");

    // ========================================================================
    // Start Server
    // ========================================================================

    println!("[1] Starting local echo server...");
    let url = common::spawn_echo_server().await?;
    println!("    ✓ Listening on {url}\n");

    // ========================================================================
    // Create Client
    // ========================================================================

    println!("[2] Creating client...");
    let client = SocketClient::with_websocket(
        ClientConfig::new(url)
            .with_reconnect_interval(Duration::from_secs(1))
            .with_max_reconnect_attempts(3),
    );
    println!("    Client: {}", client.id());

    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
    let _connect = client.on("connect", move |_: &ClientEvent| {
        let _ = connected_tx.send(());
    });

    let (kpi_tx, mut kpi_rx) = mpsc::unbounded_channel();
    let _kpi = client.on("kpi-update", move |event: &ClientEvent| {
        let _ = kpi_tx.send(event.payload().cloned());
    });
    println!("    ✓ Handlers registered\n");

    // ========================================================================
    // Queue Before Connect
    // ========================================================================

    println!("[3] Sending while offline...");
    let delivery = client.send("kpi-update", Some(json!({"id": "mrr", "value": 42})))?;
    assert_eq!(delivery, Delivery::Queued);
    println!("    ✓ {delivery:?} ({} in queue)\n", client.stats().queued_messages);

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[4] Connecting...");
    client.connect();
    wait(connected_rx.recv(), "connect").await?;
    println!("    ✓ State: {}", client.state());

    let echoed = wait(kpi_rx.recv(), "kpi-update echo").await?;
    println!("    ✓ Queued message echoed: {echoed:?}\n");

    // ========================================================================
    // Ping
    // ========================================================================

    println!("[5] Pinging...");
    let latency = client.ping().await?;
    println!("    ✓ Round trip: {latency:?}\n");

    // ========================================================================
    // Stats
    // ========================================================================

    println!("[6] Stats...");
    let stats = client.stats();
    println!("    State:      {}", stats.state);
    println!("    Attempts:   {}", stats.reconnect_attempts);
    println!("    Queued:     {}", stats.queued_messages);
    println!("    Handlers:   {}\n", stats.total_handlers);

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("[Cleanup] Disconnecting...");
    client.disconnect();
    println!("          ✓ State: {}", client.state());

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

async fn wait<T>(future: impl Future<Output = Option<T>>, what: &str) -> Result<T> {
    timeout(STEP_TIMEOUT, future)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| resilient_socket::Error::timeout(what, STEP_TIMEOUT.as_millis() as u64))
}
