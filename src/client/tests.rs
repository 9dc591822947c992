//! Client behavior over the in-process transport.
//!
//! Runs on a paused clock; reconnect timers fire as soon as the runtime
//! goes idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::json;
use tokio::task::yield_now;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

use crate::error::Error;
use crate::protocol::{ClientEvent, DisconnectInfo, ErrorKind, EventName, OutboundMessage};
use crate::transport::{ConnectMode, MemoryRemote, MemoryTransportFactory};

use super::{ClientConfig, ConnectionState, Delivery, SocketClient};

// ============================================================================
// Helpers
// ============================================================================

const INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> ClientConfig {
    ClientConfig::new("ws://memory.test/socket")
        .with_reconnect_interval(INTERVAL)
        .with_max_reconnect_attempts(3)
        .with_ping_timeout(Duration::from_millis(500))
}

fn client_with(config: ClientConfig, mode: ConnectMode) -> (SocketClient, MemoryRemote) {
    let factory = MemoryTransportFactory::with_mode(mode);
    let remote = factory.remote();
    (SocketClient::new(config, factory), remote)
}

/// Lets pump tasks drain their channels without moving the clock.
async fn settle() {
    for _ in 0..8 {
        yield_now().await;
    }
}

type Recorded = Arc<Mutex<Vec<ClientEvent>>>;

fn record<'a>(client: &SocketClient, names: impl IntoIterator<Item = &'a str>) -> Recorded {
    let events: Recorded = Arc::default();
    let sink = Arc::clone(&events);
    // Kept registered for the client's lifetime.
    let _ = client.subscribe(names, move |event: &ClientEvent| {
        sink.lock().push(event.clone());
    });
    events
}

fn count(events: &Recorded, name: &EventName) -> usize {
    events.lock().iter().filter(|e| &e.name() == name).count()
}

fn kinds(messages: &[&str]) -> Vec<String> {
    messages.iter().map(|kind| kind.to_string()).collect()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_open_emits_connect() {
    init_tracing();
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    let events = record(&client, ["connect"]);

    assert_eq!(client.state(), ConnectionState::Idle);
    client.connect();
    assert_eq!(client.state(), ConnectionState::Connecting);

    assert!(remote.open());
    settle().await;

    assert_eq!(client.state(), ConnectionState::Open);
    assert!(client.is_connected());
    assert_eq!(count(&events, &EventName::Connect), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);

    client.connect();
    client.connect();
    assert_eq!(remote.connect_calls(), 1);

    remote.open();
    settle().await;
    client.connect();
    assert_eq!(remote.connect_calls(), 1);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_is_idempotent() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["disconnect"]);

    client.connect();
    settle().await;

    client.disconnect();
    client.disconnect();
    settle().await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(remote.closed_by_client());
    assert_eq!(
        *events.lock(),
        vec![ClientEvent::Disconnect(DisconnectInfo::new(
            1000,
            "client disconnect"
        ))]
    );

    sleep(INTERVAL * 10).await;
    assert_eq!(remote.connect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_before_connect_emits_nothing() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["disconnect"]);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(events.lock().is_empty());
    assert_eq!(remote.connect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_disconnect_reconnects() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);

    client.connect();
    settle().await;
    client.disconnect();
    client.connect();
    settle().await;

    assert_eq!(remote.connect_calls(), 2);
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_closes_transport() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;

    let clone = client.clone();
    drop(client);
    assert!(!remote.closed_by_client());

    drop(clone);
    assert!(remote.closed_by_client());
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_server_close_schedules_reconnect() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["disconnect", "connect"]);

    client.connect();
    settle().await;
    assert!(remote.drop_connection(1001, "going away"));
    settle().await;

    assert_eq!(client.state(), ConnectionState::Reconnecting);
    assert_eq!(client.stats().reconnect_attempts, 1);
    assert!(
        events
            .lock()
            .contains(&ClientEvent::Disconnect(DisconnectInfo::new(1001, "going away")))
    );

    sleep(INTERVAL * 2).await;
    settle().await;

    assert_eq!(remote.connect_calls(), 2);
    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(client.stats().reconnect_attempts, 0);
    assert_eq!(count(&events, &EventName::Connect), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_bounded_when_refused() {
    init_tracing();
    let (client, remote) = client_with(config(), ConnectMode::Refuse);

    client.connect();
    sleep(INTERVAL * 20).await;
    settle().await;

    assert_eq!(remote.connect_calls(), 4);
    assert_eq!(client.stats().reconnect_attempts, 3);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_bounded_when_construction_fails() {
    let (client, remote) = client_with(config(), ConnectMode::FailConstruction);
    let events = record(&client, ["error"]);

    client.connect();
    sleep(INTERVAL * 20).await;
    settle().await;

    assert_eq!(remote.connect_calls(), 4);
    assert_eq!(client.stats().reconnect_attempts, 3);
    assert_eq!(client.state(), ConnectionState::Closed);

    let errors = events.lock();
    assert_eq!(errors.len(), 4);
    assert!(errors.iter().all(|e| matches!(
        e,
        ClientEvent::Error(error) if error.kind == ErrorKind::Construction
    )));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_counter_resets_on_open() {
    let config = config().with_max_reconnect_attempts(10);
    let (client, remote) = client_with(config, ConnectMode::Refuse);

    client.connect();
    // Initial failure plus retries at 100ms and 200ms.
    sleep(INTERVAL * 5 / 2).await;
    settle().await;
    assert_eq!(client.stats().reconnect_attempts, 3);
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    remote.set_mode(ConnectMode::AutoOpen);
    sleep(INTERVAL).await;
    settle().await;

    assert_eq!(client.state(), ConnectionState::Open);
    assert_eq!(client.stats().reconnect_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let (client, remote) = client_with(config(), ConnectMode::Refuse);

    client.connect();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    client.disconnect();
    sleep(INTERVAL * 10).await;
    settle().await;

    assert_eq!(remote.connect_calls(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.stats().reconnect_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_reconnect_disabled() {
    let config = config().with_auto_reconnect(false);
    let (client, remote) = client_with(config, ConnectMode::AutoOpen);

    client.connect();
    settle().await;
    remote.drop_connection(1006, "");
    sleep(INTERVAL * 10).await;
    settle().await;

    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(remote.connect_calls(), 1);
    assert_eq!(client.stats().reconnect_attempts, 0);
}

#[test]
fn test_connect_without_runtime_reports_error() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["error"]);

    client.connect();

    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(remote.connect_calls(), 0);
    assert_eq!(client.stats().reconnect_attempts, 0);
    assert!(matches!(
        events.lock().as_slice(),
        [ClientEvent::Error(error)] if error.kind == ErrorKind::Construction
    ));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_url_reports_construction_error() {
    let config = ClientConfig {
        server_url: "not a url".into(),
        ..config().with_auto_reconnect(false)
    };
    let (client, remote) = client_with(config, ConnectMode::AutoOpen);
    let events = record(&client, ["error"]);

    client.connect();

    assert_eq!(remote.connect_calls(), 0);
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(count(&events, &EventName::Error), 1);
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_while_open() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;

    let delivery = assert_ok!(client.send("subscribe", Some(json!({"channel": "kpi"}))));
    assert_eq!(delivery, Delivery::Sent);

    let sent = remote.sent_envelopes();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, "subscribe");
    assert_eq!(sent[0].payload, Some(json!({"channel": "kpi"})));
    assert!(sent[0].timestamp > 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_json_serializes_payload() {
    #[derive(serde::Serialize)]
    struct Filter {
        region: &'static str,
    }

    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;

    assert_ok!(client.send_json("filter", &Filter { region: "emea" }));
    assert_eq!(
        remote.sent_envelopes()[0].payload,
        Some(json!({"region": "emea"}))
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_offline_queues() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);

    assert_eq!(assert_ok!(client.send("a", None)), Delivery::Queued);
    client.connect();
    assert_eq!(assert_ok!(client.send("b", None)), Delivery::Queued);

    assert_eq!(client.stats().queued_messages, 2);
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_offline_without_queue_fails() {
    let config = config().with_message_queue(false);
    let (client, remote) = client_with(config, ConnectMode::Manual);

    let err = assert_err!(client.send("a", None));
    assert!(matches!(err, Error::NotConnected));

    client.connect();
    remote.open();
    settle().await;

    assert!(remote.sent().is_empty());
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_rejected_by_open_transport() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    remote.reject_kind("bad");
    client.connect();
    settle().await;

    let err = assert_err!(client.send("bad", None));
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_queue_flushes_in_order_on_open() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);

    assert_ok!(client.send("a", None));
    assert_ok!(client.send("b", Some(json!({"id": "mrr", "value": 42}))));
    assert_ok!(client.send("c", Some(json!([1, 2, 3]))));
    client.connect();
    remote.open();
    settle().await;

    let sent: Vec<_> = remote
        .sent_envelopes()
        .into_iter()
        .map(|envelope| (envelope.kind, envelope.payload))
        .collect();
    assert_eq!(
        sent,
        vec![
            ("a".to_string(), None),
            ("b".to_string(), Some(json!({"id": "mrr", "value": 42}))),
            ("c".to_string(), Some(json!([1, 2, 3]))),
        ]
    );
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_queue_flushed_before_connect_handlers() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    let queued_at_connect = Arc::new(AtomicUsize::new(usize::MAX));

    let handle = client.clone();
    let seen = Arc::clone(&queued_at_connect);
    let _subscription = client.on("connect", move |_: &ClientEvent| {
        seen.store(handle.stats().queued_messages, Ordering::SeqCst);
        let _ = handle.send("hello", None);
    });

    assert_ok!(client.send("q1", None));
    assert_ok!(client.send("q2", None));
    client.connect();
    remote.open();
    settle().await;

    assert_eq!(queued_at_connect.load(Ordering::SeqCst), 0);
    assert_eq!(remote.sent_kinds(), kinds(&["q1", "q2", "hello"]));
}

#[tokio::test(start_paused = true)]
async fn test_partial_flush_keeps_remainder() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    remote.reject_kind("b");

    for kind in ["a", "b", "c"] {
        assert_ok!(client.send(kind, None));
    }
    client.connect();
    remote.open();
    settle().await;

    assert_eq!(remote.sent_kinds(), kinds(&["a"]));
    assert_eq!(client.stats().queued_messages, 2);
    assert!(client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_clear_queue() {
    let (client, _remote) = client_with(config(), ConnectMode::Manual);
    assert_ok!(client.send("a", None));
    assert_ok!(client.send("b", None));

    assert_eq!(client.clear_queue(), 2);
    assert_eq!(client.clear_queue(), 0);
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_reports_each_failure() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    remote.reject_kind("b");
    client.connect();
    settle().await;

    let batch = ["a", "b", "c"].map(OutboundMessage::new);
    let err = assert_err!(client.send_batch(batch));

    match err {
        Error::BatchFailed {
            failed,
            total,
            failures,
        } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 1);
            assert_eq!(failures[0].kind, "b");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(remote.sent_kinds(), kinds(&["a", "c"]));
}

#[tokio::test(start_paused = true)]
async fn test_batch_offline_is_queued() {
    let (client, _remote) = client_with(config(), ConnectMode::Manual);

    let batch = vec![
        OutboundMessage::new("a"),
        OutboundMessage::new("b").with_payload(json!(2)),
    ];
    let deliveries = assert_ok!(client.send_batch(batch));

    assert_eq!(deliveries, vec![Delivery::Queued, Delivery::Queued]);
    assert_eq!(client.stats().queued_messages, 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_offline_without_queue_fails_every_message() {
    let config = config().with_message_queue(false);
    let (client, _remote) = client_with(config, ConnectMode::Manual);

    let err = assert_err!(client.send_batch(["a", "b"].map(OutboundMessage::new)));
    assert!(matches!(
        err,
        Error::BatchFailed {
            failed: 2,
            total: 2,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch() {
    let (client, _remote) = client_with(config(), ConnectMode::Manual);
    assert!(assert_ok!(client.send_batch(Vec::new())).is_empty());
}

// ============================================================================
// Inbound Messages
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_message_dispatched_under_message_and_kind() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["message", "kpi-update"]);
    client.connect();
    settle().await;

    remote.deliver_envelope("kpi-update", Some(json!({"id": "mrr", "value": 42})));
    settle().await;

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], ClientEvent::Message(envelope) if envelope.kind == "kpi-update"));
    assert_eq!(
        events[1],
        ClientEvent::Kind {
            kind: "kpi-update".into(),
            payload: Some(json!({"id": "mrr", "value": 42})),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_legacy_type_field_accepted() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["alert"]);
    client.connect();
    settle().await;

    remote.deliver(r#"{"type":"alert","payload":{"level":"high"}}"#);
    settle().await;

    assert_eq!(count(&events, &EventName::Kind("alert".into())), 1);
}

#[tokio::test(start_paused = true)]
async fn test_parse_failure_is_isolated() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["error", "disconnect", "message"]);
    client.connect();
    settle().await;

    remote.deliver("not json");
    remote.deliver_envelope("after", None);
    settle().await;

    assert!(client.is_connected());
    assert_eq!(count(&events, &EventName::Disconnect), 0);
    assert_eq!(count(&events, &EventName::Message), 1);

    let events = events.lock();
    assert!(matches!(
        &events[0],
        ClientEvent::Error(error)
            if error.kind == ErrorKind::Parse && error.raw.as_deref() == Some("not json")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_keeps_connection() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["error"]);
    client.connect();
    settle().await;

    remote.error("frame too large");
    settle().await;

    assert!(client.is_connected());
    assert_eq!(remote.connect_calls(), 1);
    assert!(matches!(
        events.lock().as_slice(),
        [ClientEvent::Error(error)] if error.kind == ErrorKind::Transport
    ));
}

#[tokio::test(start_paused = true)]
async fn test_events_from_superseded_transport_are_dropped() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    let events = record(&client, ["connect"]);

    client.connect();
    client.disconnect();
    // The old transport is closed; open() targets nothing live.
    assert!(!remote.open());
    client.connect();
    remote.open();
    settle().await;

    assert_eq!(count(&events, &EventName::Connect), 1);
    assert_eq!(remote.connect_calls(), 2);
}

// ============================================================================
// Ping
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ping_round_trip() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;
    let baseline = client.stats().total_handlers;

    let pinger = client.clone();
    let ping = tokio::spawn(async move { pinger.ping().await });
    settle().await;

    assert_eq!(remote.sent_kinds(), kinds(&["ping"]));
    assert_eq!(client.stats().total_handlers, baseline + 1);

    sleep(Duration::from_millis(10)).await;
    remote.deliver_envelope("pong", None);

    let latency = assert_ok!(ping.await.unwrap());
    assert!(latency >= Duration::from_millis(10));
    assert_eq!(client.stats().total_handlers, baseline);
}

#[tokio::test(start_paused = true)]
async fn test_ping_timeout_removes_listener() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;
    let baseline = client.stats().total_handlers;

    let err = assert_err!(client.ping().await);

    assert!(err.is_timeout());
    assert_eq!(client.stats().total_handlers, baseline);
    assert_eq!(remote.sent_kinds(), kinds(&["ping"]));
}

#[tokio::test(start_paused = true)]
async fn test_ping_never_queues() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    client.connect();
    settle().await;
    let baseline = client.stats().total_handlers;

    // Transport is gone but the close has not been processed yet.
    remote.drop_connection(1006, "");
    let err = assert_err!(client.ping().await);

    assert!(err.is_connection_error());
    assert!(remote.sent().is_empty());
    assert_eq!(client.stats().queued_messages, 0);
    assert_eq!(client.stats().total_handlers, baseline);

    settle().await;
    let err = assert_err!(client.ping().await);
    assert!(matches!(err, Error::NotConnected));
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_ping_requires_connection() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    client.connect();

    let err = assert_err!(client.ping().await);
    assert!(matches!(err, Error::NotConnected));
    assert!(remote.sent().is_empty());
    assert_eq!(client.stats().queued_messages, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pong_payload_reaches_subscribers() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let events = record(&client, ["pong"]);
    client.connect();
    settle().await;

    remote.deliver_envelope("pong", Some(json!({"serverTime": 1})));
    settle().await;

    assert_eq!(
        *events.lock(),
        vec![ClientEvent::Pong(Some(json!({"serverTime": 1})))]
    );
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_is_isolated() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let calls = Arc::new(AtomicUsize::new(0));

    let _first = client.on("connect", |_: &ClientEvent| panic!("handler failure"));
    let counter = Arc::clone(&calls);
    let _second = client.on("connect", move |_: &ClientEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.connect();
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(client.is_connected());

    remote.drop_connection(1001, "restart");
    sleep(INTERVAL * 2).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_repeated_name_registers_once() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let subscription = client.subscribe(["alert", "alert", "connect"], move |_: &ClientEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(subscription.names(), vec![EventName::Kind("alert".into()), EventName::Connect]);
    assert_eq!(client.stats().total_handlers, 2);

    client.connect();
    settle().await;
    remote.deliver_envelope("alert", None);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    subscription.unsubscribe();
    assert_eq!(client.stats().total_handlers, 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_many_and_unsubscribe() {
    let (client, _remote) = client_with(config(), ConnectMode::Manual);
    let _other = client.on("connect", |_: &ClientEvent| {});

    let subscription = client.subscribe(["kpi-update", "alert", "connect"], |_: &ClientEvent| {});
    let stats = client.stats();
    assert_eq!(stats.event_count, 3);
    assert_eq!(stats.total_handlers, 4);
    assert_eq!(subscription.ids().len(), 3);

    subscription.unsubscribe();
    let stats = client.stats();
    assert_eq!(stats.event_count, 1);
    assert_eq!(stats.total_handlers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_off_removes_single_handler() {
    let (client, remote) = client_with(config(), ConnectMode::AutoOpen);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let subscription = client.on("connect", move |_: &ClientEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let id = subscription.ids()[0];

    assert!(client.off(&EventName::Connect, id));
    assert!(!client.off(&EventName::Connect, id));

    client.connect();
    settle().await;
    assert!(client.is_connected());
    assert_eq!(remote.connect_calls(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_guard_scopes_handler() {
    let (client, _remote) = client_with(config(), ConnectMode::Manual);
    {
        let _guard = client.on("alert", |_: &ClientEvent| {}).guard();
        assert_eq!(client.stats().total_handlers, 1);
    }
    assert_eq!(client.stats().total_handlers, 0);

    drop(client.on("alert", |_: &ClientEvent| {}));
    assert_eq!(client.stats().total_handlers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stats_snapshot() {
    let (client, remote) = client_with(config(), ConnectMode::Manual);
    let _sub = client.subscribe(["connect", "error"], |_: &ClientEvent| {});
    assert_ok!(client.send("a", None));

    let stats = client.stats();
    assert_eq!(stats.state, ConnectionState::Idle);
    assert!(!stats.is_connected);
    assert_eq!(stats.ready_state(), 3);
    assert_eq!(stats.queued_messages, 1);
    assert_eq!(stats.event_count, 2);
    assert_eq!(stats.total_handlers, 2);

    client.connect();
    assert_eq!(client.stats().ready_state(), 0);
    remote.open();
    settle().await;

    let stats = client.stats();
    assert!(stats.is_connected);
    assert_eq!(stats.ready_state(), 1);
    assert_eq!(stats.queued_messages, 0);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_offline_sends_flush_in_order(
        messages in prop::collection::vec(
            (
                "[a-z]{1,8}",
                prop::option::of(any::<i64>().prop_map(|n| json!({"n": n}))),
            ),
            0..24,
        )
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let sent = runtime.block_on(async {
            let (client, remote) = client_with(config(), ConnectMode::Manual);
            for (kind, payload) in &messages {
                client.send(kind.as_str(), payload.clone()).unwrap();
            }
            client.connect();
            remote.open();
            settle().await;
            remote
                .sent_envelopes()
                .into_iter()
                .map(|envelope| (envelope.kind, envelope.payload))
                .collect::<Vec<_>>()
        });

        prop_assert_eq!(sent, messages);
    }
}
