//! Stream Client Facade
//!
//! Public entry point for a single trade stream: `start(key)` and `stop()`.
//! Owns exactly one lifecycle task, the connection state, and the shutdown
//! flag. Collaborators are injected through [`StreamComponents`] so tests can
//! substitute the transport, decoder, responder, policy, and sink.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::lifecycle::{Lifecycle, StateCell, StreamComponents};
use crate::domain::connection::ConnectionState;
use crate::domain::trade::{SubscriptionKey, SubscriptionKeyError};

/// Default venue endpoint for raw streams.
pub const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443/ws";

// =============================================================================
// Error Type
// =============================================================================

/// Operator errors surfaced synchronously by the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// `start()` was called while a lifecycle task already exists.
    #[error("stream client already started (state: {0})")]
    AlreadyStarted(ConnectionState),

    /// `start()` was called after `stop()`.
    #[error("stream client has been shut down")]
    ShutDown,

    /// `start()` was called after the reconnect policy ended the stream.
    #[error("stream client has finished; create a new client to stream again")]
    Finished,

    /// The subscription key was rejected.
    #[error("invalid subscription key: {0}")]
    InvalidSubscriptionKey(#[from] SubscriptionKeyError),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the stream client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Base WebSocket endpoint; the stream name is appended as a path segment.
    pub endpoint: String,
    /// Close the connection if no frame arrives for this long (`None` disables).
    pub idle_timeout: Option<Duration>,
    /// How long `stop()` waits for the close handshake.
    pub close_timeout: Duration,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            idle_timeout: Some(Duration::from_secs(600)),
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl StreamClientConfig {
    /// Create configuration for a custom endpoint with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// Stream Client
// =============================================================================

/// Resilient client for one aggregate trade stream.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use aggtrade_stream::infrastructure::binance::{
///     AggTradeCodec, FixedDelayPolicy, PongResponder, TungsteniteConnector,
/// };
/// use aggtrade_stream::infrastructure::sink::ChannelSink;
/// use aggtrade_stream::{StreamClient, StreamClientConfig, StreamComponents};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (sink, mut events) = ChannelSink::channel(1024);
/// let components = StreamComponents {
///     connector: Arc::new(TungsteniteConnector::new()),
///     decoder: Arc::new(AggTradeCodec::new()),
///     responder: Arc::new(PongResponder::new()),
///     policy: Arc::new(FixedDelayPolicy::default()),
///     sink: Arc::new(sink),
/// };
///
/// let client = StreamClient::new(StreamClientConfig::default(), components);
/// client.start("btc")?;
///
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
///
/// client.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct StreamClient {
    config: StreamClientConfig,
    components: StreamComponents,
    state: Arc<StateCell>,
    shutdown: CancellationToken,
    worker: Mutex<Option<Worker>>,
    key: Mutex<Option<SubscriptionKey>>,
}

/// The spawned lifecycle task. `finished` flips to `true` after its last
/// sink callback.
struct Worker {
    handle: Option<JoinHandle<()>>,
    finished: watch::Receiver<bool>,
}

impl Worker {
    fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }
}

impl StreamClient {
    /// Create a new, idle client.
    #[must_use]
    pub fn new(config: StreamClientConfig, components: StreamComponents) -> Self {
        let state = Arc::new(StateCell::new(Arc::clone(&components.sink)));
        Self {
            config,
            components,
            state,
            shutdown: CancellationToken::new(),
            worker: Mutex::new(None),
            key: Mutex::new(None),
        }
    }

    /// Start streaming for `key`.
    ///
    /// Moves the client to `Connecting` and spawns the lifecycle task. A
    /// client instance can be started once.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidSubscriptionKey` for an empty or
    /// malformed key, `ClientError::AlreadyStarted` if the client was
    /// already started, `ClientError::ShutDown` after `stop()`, and
    /// `ClientError::Finished` once the reconnect policy has ended the stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self, key: &str) -> Result<(), ClientError> {
        let key = SubscriptionKey::parse(key)?;

        let mut worker = self.worker.lock();
        if self.shutdown.is_cancelled() {
            return Err(ClientError::ShutDown);
        }
        if let Some(existing) = worker.as_ref() {
            if existing.is_finished() {
                return Err(ClientError::Finished);
            }
            return Err(ClientError::AlreadyStarted(self.state.get()));
        }

        let url = key.stream_url(&self.config.endpoint);
        tracing::info!(key = %key, url = %url, "Starting trade stream client");

        self.state.transition(ConnectionState::Connecting);

        let lifecycle = Lifecycle::new(
            url,
            self.components.clone(),
            self.config.clone(),
            Arc::clone(&self.state),
            self.shutdown.clone(),
        );
        let (finished_tx, finished) = watch::channel(false);
        let handle = tokio::spawn(async move {
            lifecycle.run().await;
            let _ = finished_tx.send(true);
        });
        *worker = Some(Worker {
            handle: Some(handle),
            finished,
        });
        *self.key.lock() = Some(key);

        Ok(())
    }

    /// Stop streaming.
    ///
    /// Sets the shutdown flag, closes any open connection, cancels any
    /// pending reconnect, and waits for the lifecycle task to finish. No sink
    /// callbacks fire after this returns, including when several callers stop
    /// concurrently. Calling it again after it has returned is a no-op.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let (handle, mut finished) = {
            let mut worker = self.worker.lock();
            let Some(worker) = worker.as_mut() else {
                return;
            };
            (worker.handle.take(), worker.finished.clone())
        };

        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Trade stream task failed");
                }
                tracing::info!("Trade stream client stopped");
            }
            // Another caller is joining the task; wait for its last callback.
            // A closed channel means the task is gone.
            None => {
                let _ = finished.wait_for(|done| *done).await;
            }
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether `stop()` has been called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// The key passed to `start()`, if started.
    #[must_use]
    pub fn subscription_key(&self) -> Option<SubscriptionKey> {
        self.key.lock().clone()
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::ports::{
        Connection, Connector, EventSink, Frame, KeepaliveResponder, MockReconnectPolicy,
        TransportError, WireDecoder,
    };
    use crate::domain::trade::{DecodeError, DecodeErrorKind, TradeEvent};

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
            Err(TransportError::ConnectFailed(format!("refused: {url}")))
        }
    }

    /// Accepts, never delivers a frame, and takes `close_delay` to close.
    struct SlowCloseConnector {
        close_delay: Duration,
    }

    struct SlowCloseConnection {
        close_delay: Duration,
    }

    #[async_trait]
    impl Connector for SlowCloseConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, TransportError> {
            Ok(Box::new(SlowCloseConnection {
                close_delay: self.close_delay,
            }))
        }
    }

    #[async_trait]
    impl Connection for SlowCloseConnection {
        async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
            std::future::pending().await
        }

        async fn send(&mut self, _frame: Frame) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            tokio::time::sleep(self.close_delay).await;
            Ok(())
        }
    }

    struct NullDecoder;

    impl WireDecoder for NullDecoder {
        fn decode(&self, payload: &[u8]) -> Result<TradeEvent, DecodeError> {
            Err(DecodeError::new(
                payload,
                DecodeErrorKind::Malformed("unused".to_string()),
            ))
        }
    }

    struct EchoResponder;

    impl KeepaliveResponder for EchoResponder {
        fn acknowledge(&self, payload: &[u8]) -> Frame {
            Frame::Pong(payload.to_vec())
        }
    }

    #[derive(Default)]
    struct StateLog(parking_lot::Mutex<Vec<ConnectionState>>);

    impl EventSink for StateLog {
        fn on_event(&self, _event: TradeEvent) {}
        fn on_status_change(&self, state: ConnectionState) {
            self.0.lock().push(state);
        }
        fn on_decode_error(&self, _error: DecodeError) {}
    }

    fn client_with(policy: MockReconnectPolicy, sink: Arc<StateLog>) -> StreamClient {
        client_with_connector(Arc::new(RefusingConnector), policy, sink)
    }

    fn client_with_connector(
        connector: Arc<dyn Connector>,
        policy: MockReconnectPolicy,
        sink: Arc<StateLog>,
    ) -> StreamClient {
        let components = StreamComponents {
            connector,
            decoder: Arc::new(NullDecoder),
            responder: Arc::new(EchoResponder),
            policy: Arc::new(policy),
            sink,
        };
        StreamClient::new(StreamClientConfig::new("wss://example.test/ws"), components)
    }

    async fn wait_for_idle(client: &StreamClient) {
        for _ in 0..100 {
            if client.state() == ConnectionState::Idle {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("client never became idle, state = {}", client.state());
    }

    #[test]
    fn default_config_values() {
        let config = StreamClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.close_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn start_rejects_empty_key() {
        let client = client_with(MockReconnectPolicy::new(), Arc::default());
        let err = client.start("  ").unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidSubscriptionKey(SubscriptionKeyError::Empty)
        );
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(client.subscription_key().is_none());
    }

    #[tokio::test]
    async fn policy_decline_ends_in_idle() {
        let mut policy = MockReconnectPolicy::new();
        policy
            .expect_next_delay()
            .withf(|code, _reason, shutdown| *code == 1006 && !*shutdown)
            .times(1)
            .return_const(None);

        let sink = Arc::new(StateLog::default());
        let client = client_with(policy, Arc::clone(&sink));
        client.start("BTC").unwrap();
        wait_for_idle(&client).await;

        assert_eq!(
            *sink.0.lock(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Closed,
                ConnectionState::Idle,
            ]
        );
        assert_eq!(client.subscription_key().unwrap().as_str(), "btc");
    }

    async fn wait_for_state(sink: &StateLog, state: ConnectionState) {
        for _ in 0..100 {
            if sink.0.lock().last() == Some(&state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never reached {state}, log = {:?}", *sink.0.lock());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let mut policy = MockReconnectPolicy::new();
        policy.expect_next_delay().return_const(None);

        let client = client_with_connector(
            Arc::new(SlowCloseConnector {
                close_delay: Duration::ZERO,
            }),
            policy,
            Arc::default(),
        );
        client.start("btc").unwrap();
        assert!(matches!(
            client.start("eth"),
            Err(ClientError::AlreadyStarted(_))
        ));
        client.stop().await;
    }

    #[tokio::test]
    async fn start_after_stop_is_rejected() {
        let client = client_with(MockReconnectPolicy::new(), Arc::default());
        client.stop().await;
        assert_eq!(client.start("btc"), Err(ClientError::ShutDown));
        assert!(client.is_shutdown_requested());
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let sink = Arc::new(StateLog::default());
        let client = client_with(MockReconnectPolicy::new(), Arc::clone(&sink));
        client.stop().await;
        client.stop().await;
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(sink.0.lock().is_empty());
    }

    #[tokio::test]
    async fn start_after_policy_decline_reports_finished() {
        let mut policy = MockReconnectPolicy::new();
        policy.expect_next_delay().return_const(None);

        let client = client_with(policy, Arc::default());
        client.start("btc").unwrap();
        wait_for_idle(&client).await;

        assert_eq!(client.start("btc"), Err(ClientError::Finished));
        client.stop().await;
    }

    #[tokio::test]
    async fn concurrent_stops_both_wait_for_idle() {
        let mut policy = MockReconnectPolicy::new();
        policy.expect_next_delay().return_const(None);

        let sink = Arc::new(StateLog::default());
        let client = client_with_connector(
            Arc::new(SlowCloseConnector {
                close_delay: Duration::from_millis(100),
            }),
            policy,
            Arc::clone(&sink),
        );
        client.start("btc").unwrap();
        wait_for_state(&sink, ConnectionState::Open).await;

        let (first, second) = tokio::join!(
            async {
                client.stop().await;
                sink.0.lock().clone()
            },
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                client.stop().await;
                sink.0.lock().clone()
            },
        );

        let expected = vec![
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Idle,
        ];
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }
}
