//! Stream Lifecycle Integration Tests
//!
//! Drives `StreamClient` end to end over a scripted in-memory transport:
//! frames are injected on the server side and everything the client writes
//! back is captured.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;

use aggtrade_stream::infrastructure::binance::{AggTradeCodec, FixedDelayPolicy, PongResponder};
use aggtrade_stream::{
    CloseInfo, Connection, ConnectionState, Connector, DecodeError, DecodeErrorKind, EventSink,
    Frame, StreamClient, StreamClientConfig, StreamComponents, TradeEvent, TransportError,
};

const ENDPOINT: &str = "wss://stream.test/ws";
const WAIT: Duration = Duration::from_secs(2);

// =============================================================================
// Scripted Transport
// =============================================================================

/// What the connector does on the next `connect` call.
#[derive(Debug, Clone, Copy)]
enum Plan {
    Accept,
    Refuse,
    Hang,
}

/// Server side of one accepted connection.
struct ServerEnd {
    url: String,
    to_client: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl ServerEnd {
    fn send(&self, frame: Frame) {
        self.to_client.send(Ok(frame)).unwrap();
    }
}

struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    outbound: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Io("peer gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.send(Frame::Close(Some(CloseInfo::new(1000, "")))).await
    }
}

struct ScriptedConnector {
    plan: Mutex<VecDeque<Plan>>,
    attempts: Mutex<Vec<String>>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedConnector {
    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.attempts.lock().push(url.to_string());
        let plan = self.plan.lock().pop_front().unwrap_or(Plan::Accept);

        match plan {
            Plan::Refuse => Err(TransportError::ConnectFailed(
                "connection refused".to_string(),
            )),
            Plan::Hang => std::future::pending().await,
            Plan::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let _ = self.accepted.send(ServerEnd {
                    url: url.to_string(),
                    to_client,
                    from_client,
                });
                Ok(Box::new(ScriptedConnection { inbound, outbound }))
            }
        }
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recorded {
    Trade(TradeEvent),
    State(ConnectionState),
    DecodeError(DecodeError),
}

struct RecordingSink {
    tx: mpsc::UnboundedSender<Recorded>,
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: TradeEvent) {
        let _ = self.tx.send(Recorded::Trade(event));
    }

    fn on_status_change(&self, state: ConnectionState) {
        let _ = self.tx.send(Recorded::State(state));
    }

    fn on_decode_error(&self, error: DecodeError) {
        let _ = self.tx.send(Recorded::DecodeError(error));
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    client: StreamClient,
    connector: Arc<ScriptedConnector>,
    connections: mpsc::UnboundedReceiver<ServerEnd>,
    events: mpsc::UnboundedReceiver<Recorded>,
}

impl Harness {
    fn new(plan: &[Plan], reconnect_delay: Duration, idle_timeout: Option<Duration>) -> Self {
        let (accepted, connections) = mpsc::unbounded_channel();
        let (tx, events) = mpsc::unbounded_channel();

        let connector = Arc::new(ScriptedConnector {
            plan: Mutex::new(plan.iter().copied().collect()),
            attempts: Mutex::new(Vec::new()),
            accepted,
        });

        let components = StreamComponents {
            connector: Arc::clone(&connector) as Arc<dyn Connector>,
            decoder: Arc::new(AggTradeCodec::new()),
            responder: Arc::new(PongResponder::new()),
            policy: Arc::new(FixedDelayPolicy::new(reconnect_delay).unwrap()),
            sink: Arc::new(RecordingSink { tx }),
        };

        let config = StreamClientConfig {
            endpoint: ENDPOINT.to_string(),
            idle_timeout,
            close_timeout: Duration::from_millis(200),
        };

        Self {
            client: StreamClient::new(config, components),
            connector,
            connections,
            events,
        }
    }

    fn with_defaults() -> Self {
        Self::new(&[], Duration::from_millis(20), None)
    }

    async fn next_connection(&mut self) -> ServerEnd {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    async fn next_event(&mut self) -> Recorded {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a sink callback")
            .expect("sink dropped")
    }

    async fn expect_states(&mut self, states: &[ConnectionState]) {
        for expected in states {
            assert_eq!(self.next_event().await, Recorded::State(*expected));
        }
    }

    async fn open(&mut self, key: &str) -> ServerEnd {
        self.client.start(key).unwrap();
        let server = self.next_connection().await;
        self.expect_states(&[ConnectionState::Connecting, ConnectionState::Open])
            .await;
        server
    }
}

fn trade_json(price: &str, quantity: &str) -> String {
    format!(
        r#"{{"e":"aggTrade","E":1700000000001,"s":"BTCUSDT","a":7,"p":"{price}","q":"{quantity}","f":100,"l":105,"T":1700000000000,"m":true,"M":true}}"#
    )
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_trade_flows_from_frame_to_sink() {
    let mut h = Harness::with_defaults();
    let server = h.open("BTC").await;

    assert_eq!(server.url, "wss://stream.test/ws/btcusdt@aggTrade");
    assert_eq!(h.client.state(), ConnectionState::Open);

    server.send(Frame::Text(trade_json("65000.10", "0.5")));

    let Recorded::Trade(trade) = h.next_event().await else {
        panic!("expected a trade");
    };
    assert_eq!(trade.symbol, "BTCUSDT");
    assert_eq!(trade.price, "65000.10");
    assert_eq!(trade.quantity, "0.5");
    assert_eq!(trade.trade_time_millis, 1_700_000_000_000);
    assert!(trade.is_buyer_maker);

    h.client.stop().await;
}

#[tokio::test]
async fn test_binary_frames_decode_like_text() {
    let mut h = Harness::with_defaults();
    let server = h.open("btc").await;

    server.send(Frame::Binary(trade_json("1.00", "2").into_bytes()));

    let Recorded::Trade(trade) = h.next_event().await else {
        panic!("expected a trade");
    };
    assert_eq!(trade.price, "1.00");

    h.client.stop().await;
}

#[tokio::test]
async fn test_ping_answered_before_next_frame() {
    let mut h = Harness::with_defaults();
    let mut server = h.open("btc").await;

    server.send(Frame::Ping(vec![0x01, 0x02]));
    server.send(Frame::Text(trade_json("65000.10", "0.5")));

    assert!(matches!(h.next_event().await, Recorded::Trade(_)));
    // The pong was written before the trade frame was read.
    assert_eq!(
        server.from_client.try_recv().unwrap(),
        Frame::Pong(vec![0x01, 0x02])
    );
    assert!(server.from_client.try_recv().is_err());

    h.client.stop().await;
}

#[tokio::test]
async fn test_one_pong_per_ping() {
    let mut h = Harness::with_defaults();
    let mut server = h.open("btc").await;

    for i in 0..3u8 {
        server.send(Frame::Ping(vec![i]));
    }
    server.send(Frame::Text(trade_json("1", "1")));
    assert!(matches!(h.next_event().await, Recorded::Trade(_)));

    for i in 0..3u8 {
        assert_eq!(server.from_client.try_recv().unwrap(), Frame::Pong(vec![i]));
    }
    assert!(server.from_client.try_recv().is_err());

    h.client.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_reported_once_and_stays_open() {
    let mut h = Harness::with_defaults();
    let server = h.open("btc").await;

    server.send(Frame::Text("not json".to_string()));
    server.send(Frame::Text(trade_json("65000.10", "0.5")));

    let Recorded::DecodeError(error) = h.next_event().await else {
        panic!("expected a decode error");
    };
    assert!(matches!(error.kind, DecodeErrorKind::Malformed(_)));
    assert_eq!(error.payload, "not json");

    assert!(matches!(h.next_event().await, Recorded::Trade(_)));
    assert_eq!(h.client.state(), ConnectionState::Open);

    h.client.stop().await;
}

#[tokio::test]
async fn test_remote_close_reconnects_to_same_url() {
    let mut h = Harness::with_defaults();
    let first = h.open("eth").await;

    first.send(Frame::Close(Some(CloseInfo::new(1001, "going away"))));

    h.expect_states(&[
        ConnectionState::Closed,
        ConnectionState::Reconnecting,
        ConnectionState::Connecting,
        ConnectionState::Open,
    ])
    .await;

    let second = h.next_connection().await;
    assert_eq!(second.url, first.url);
    assert_eq!(h.connector.attempts().len(), 2);

    second.send(Frame::Text(trade_json("3000.00", "1")));
    assert!(matches!(h.next_event().await, Recorded::Trade(_)));

    h.client.stop().await;
}

#[tokio::test]
async fn test_dropped_socket_reconnects() {
    let mut h = Harness::with_defaults();
    let server = h.open("btc").await;

    // Stream ends with no close frame: abnormal closure.
    drop(server);

    h.expect_states(&[
        ConnectionState::Closed,
        ConnectionState::Reconnecting,
        ConnectionState::Connecting,
        ConnectionState::Open,
    ])
    .await;
    let _second = h.next_connection().await;

    h.client.stop().await;
}

#[tokio::test]
async fn test_transport_error_reconnects() {
    let mut h = Harness::with_defaults();
    let server = h.open("btc").await;

    server
        .to_client
        .send(Err(TransportError::Io("connection reset".to_string())))
        .unwrap();

    h.expect_states(&[
        ConnectionState::Closed,
        ConnectionState::Reconnecting,
        ConnectionState::Connecting,
        ConnectionState::Open,
    ])
    .await;

    h.client.stop().await;
}

#[tokio::test]
async fn test_refused_connects_retry_one_at_a_time() {
    let mut h = Harness::new(
        &[Plan::Refuse, Plan::Refuse, Plan::Refuse],
        Duration::from_millis(10),
        None,
    );
    h.client.start("btc").unwrap();

    h.expect_states(&[ConnectionState::Connecting]).await;
    for _ in 0..3 {
        h.expect_states(&[
            ConnectionState::Closed,
            ConnectionState::Reconnecting,
            ConnectionState::Connecting,
        ])
        .await;
    }
    h.expect_states(&[ConnectionState::Open]).await;

    let _server = h.next_connection().await;
    let attempts = h.connector.attempts();
    assert_eq!(attempts.len(), 4);
    assert!(attempts.iter().all(|url| url == &attempts[0]));

    h.client.stop().await;
}

#[tokio::test]
async fn test_idle_connection_is_recycled() {
    let mut h = Harness::new(&[], Duration::from_millis(10), Some(Duration::from_millis(50)));
    let _server = h.open("btc").await;

    h.expect_states(&[
        ConnectionState::Closed,
        ConnectionState::Reconnecting,
        ConnectionState::Connecting,
        ConnectionState::Open,
    ])
    .await;

    h.client.stop().await;
}

#[tokio::test]
async fn test_stop_while_open_closes_gracefully() {
    let mut h = Harness::with_defaults();
    let mut server = h.open("btc").await;

    h.client.stop().await;

    h.expect_states(&[ConnectionState::Closing, ConnectionState::Idle])
        .await;
    assert_eq!(h.client.state(), ConnectionState::Idle);
    assert!(matches!(
        server.from_client.try_recv().unwrap(),
        Frame::Close(Some(CloseInfo { code: 1000, .. }))
    ));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = Harness::with_defaults();
    let _server = h.open("btc").await;

    h.client.stop().await;
    h.client.stop().await;

    h.expect_states(&[ConnectionState::Closing, ConnectionState::Idle])
        .await;
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_no_reconnect_after_stop() {
    let mut h = Harness::with_defaults();
    let server = h.open("btc").await;

    h.client.stop().await;
    h.expect_states(&[ConnectionState::Closing, ConnectionState::Idle])
        .await;

    // Frames and closes after stop go nowhere.
    let _ = server.to_client.send(Ok(Frame::Close(None)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.connections.try_recv().is_err());
    assert!(h.events.try_recv().is_err());
    assert_eq!(h.connector.attempts().len(), 1);
}

#[tokio::test]
async fn test_stop_while_connecting() {
    let mut h = Harness::new(&[Plan::Hang], Duration::from_millis(10), None);
    h.client.start("btc").unwrap();
    h.expect_states(&[ConnectionState::Connecting]).await;

    timeout(WAIT, h.client.stop()).await.unwrap();

    h.expect_states(&[ConnectionState::Closing, ConnectionState::Idle])
        .await;
    assert!(h.events.try_recv().is_err());
}

#[tokio::test]
async fn test_stop_cancels_pending_reconnect() {
    let mut h = Harness::new(&[Plan::Refuse], Duration::from_secs(30), None);
    h.client.start("btc").unwrap();
    h.expect_states(&[
        ConnectionState::Connecting,
        ConnectionState::Closed,
        ConnectionState::Reconnecting,
    ])
    .await;

    timeout(WAIT, h.client.stop()).await.unwrap();

    h.expect_states(&[ConnectionState::Idle]).await;
    assert!(h.events.try_recv().is_err());
    assert_eq!(h.connector.attempts().len(), 1);
}

#[tokio::test]
async fn test_start_after_stop_is_rejected() {
    let mut h = Harness::with_defaults();
    let _server = h.open("btc").await;
    h.client.stop().await;

    assert!(h.client.start("btc").is_err());
    assert_eq!(h.connector.attempts().len(), 1);
}
