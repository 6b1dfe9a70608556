//! Connection Lifecycle State Machine
//!
//! Owns the physical connection for one stream client and drives it through
//! `Connecting → Open → Closed → Reconnecting → Connecting ...` until the
//! reconnect policy declines or shutdown is requested.
//!
//! The lifecycle runs as a single task. Frames are handled strictly in
//! arrival order, and a keepalive acknowledgment is written before the next
//! frame is read. Every failure (connect error, socket error, remote close,
//! idle timeout, failed acknowledgment) ends the session through the same
//! close path, where the policy decides what happens next.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::client::StreamClientConfig;
use crate::application::ports::{
    Connection, Connector, EventSink, Frame, KeepaliveResponder, ReconnectPolicy, TransportError,
    WireDecoder,
};
use crate::domain::connection::{CloseInfo, ConnectionState};

// =============================================================================
// Components
// =============================================================================

/// Collaborators injected into a stream client.
#[derive(Clone)]
pub struct StreamComponents {
    /// Opens physical connections.
    pub connector: Arc<dyn Connector>,
    /// Decodes data frames.
    pub decoder: Arc<dyn WireDecoder>,
    /// Answers liveness probes.
    pub responder: Arc<dyn KeepaliveResponder>,
    /// Decides reconnect delays.
    pub policy: Arc<dyn ReconnectPolicy>,
    /// Receives events and state changes.
    pub sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StreamComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamComponents").finish_non_exhaustive()
    }
}

// =============================================================================
// State Cell
// =============================================================================

/// The single connection state value of a client, plus the sink that is
/// told about every change.
pub(crate) struct StateCell {
    state: RwLock<ConnectionState>,
    sink: Arc<dyn EventSink>,
}

impl StateCell {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Idle),
            sink,
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn transition(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);

        if !previous.can_transition_to(next) {
            tracing::warn!(from = %previous, to = %next, "Unexpected connection state transition");
        }
        tracing::debug!(from = %previous, to = %next, "Connection state changed");

        self.sink.on_status_change(next);
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// How a single connection session ended.
enum SessionEnd {
    /// Shutdown was requested; the connection (if any) has been closed.
    Stopped,
    /// The connection ended on its own.
    Closed(CloseInfo),
}

pub(crate) struct Lifecycle {
    url: String,
    components: StreamComponents,
    config: StreamClientConfig,
    state: Arc<StateCell>,
    shutdown: CancellationToken,
}

impl Lifecycle {
    pub(crate) const fn new(
        url: String,
        components: StreamComponents,
        config: StreamClientConfig,
        state: Arc<StateCell>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            url,
            components,
            config,
            state,
            shutdown,
        }
    }

    /// Run sessions until the policy declines to reconnect or shutdown is
    /// requested. Expects the state to already be `Connecting`.
    pub(crate) async fn run(self) {
        loop {
            let close = match self.run_session().await {
                SessionEnd::Stopped => break,
                SessionEnd::Closed(close) => close,
            };

            tracing::info!(code = close.code, reason = %close.reason, "Trade stream closed");
            self.state.transition(ConnectionState::Closed);

            let shutdown_requested = self.shutdown.is_cancelled();
            let Some(delay) =
                self.components
                    .policy
                    .next_delay(close.code, &close.reason, shutdown_requested)
            else {
                tracing::info!(shutdown_requested, "Not reconnecting to trade stream");
                break;
            };

            tracing::info!(
                delay_ms = delay.as_millis(),
                url = %self.url,
                "Reconnecting to trade stream"
            );
            self.state.transition(ConnectionState::Reconnecting);

            let cancelled = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => true,
                () = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                tracing::info!("Reconnect cancelled by shutdown");
                break;
            }

            self.state.transition(ConnectionState::Connecting);
        }

        self.state.transition(ConnectionState::Idle);
    }

    /// Connect, then process frames until the connection ends or shutdown
    /// is requested.
    async fn run_session(&self) -> SessionEnd {
        tracing::info!(url = %self.url, "Connecting to trade stream");

        let connected = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => None,
            result = self.components.connector.connect(&self.url) => Some(result),
        };

        let mut connection = match connected {
            None => {
                // Dropping the pending connect future aborts the attempt.
                self.state.transition(ConnectionState::Closing);
                return SessionEnd::Stopped;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Trade stream connection failed");
                return SessionEnd::Closed(CloseInfo::abnormal(e.to_string()));
            }
            Some(Ok(connection)) => connection,
        };

        self.state.transition(ConnectionState::Open);
        tracing::info!("Connected to trade stream");

        loop {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => None,
                next = self.next_frame(connection.as_mut()) => Some(next),
            };

            let Some(next) = next else {
                self.state.transition(ConnectionState::Closing);
                self.close_gracefully(connection.as_mut()).await;
                return SessionEnd::Stopped;
            };

            match next {
                Ok(frame) => {
                    if let Some(close) = self.handle_frame(connection.as_mut(), frame).await {
                        return SessionEnd::Closed(close);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Trade stream transport error");
                    return SessionEnd::Closed(CloseInfo::abnormal(e.to_string()));
                }
            }
        }
    }

    /// Receive the next frame, enforcing the idle timeout.
    async fn next_frame(&self, connection: &mut dyn Connection) -> Result<Frame, TransportError> {
        let received = match self.config.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, connection.recv())
                .await
                .map_err(|_| TransportError::IdleTimeout(limit))?,
            None => connection.recv().await,
        };

        received.unwrap_or_else(|| {
            Err(TransportError::Io(
                "stream ended without close frame".to_string(),
            ))
        })
    }

    /// Handle one inbound frame. Returns close info if the frame ended the
    /// connection.
    async fn handle_frame(
        &self,
        connection: &mut dyn Connection,
        frame: Frame,
    ) -> Option<CloseInfo> {
        match frame {
            Frame::Text(text) => {
                self.dispatch(text.as_bytes());
                None
            }
            Frame::Binary(data) => {
                self.dispatch(&data);
                None
            }
            Frame::Ping(payload) => {
                let ack = self.components.responder.acknowledge(&payload);
                match connection.send(ack).await {
                    Ok(()) => {
                        tracing::debug!(len = payload.len(), "Received ping, sent pong");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to acknowledge ping");
                        Some(CloseInfo::abnormal(e.to_string()))
                    }
                }
            }
            Frame::Pong(_) => None,
            Frame::Close(close) => {
                tracing::info!("Server sent close frame");
                Some(close.unwrap_or_else(CloseInfo::no_status))
            }
        }
    }

    fn dispatch(&self, payload: &[u8]) {
        match self.components.decoder.decode(payload) {
            Ok(event) => self.components.sink.on_event(event),
            Err(error) => {
                tracing::warn!(error = %error, "Dropping undecodable frame");
                self.components.sink.on_decode_error(error);
            }
        }
    }

    async fn close_gracefully(&self, connection: &mut dyn Connection) {
        let limit = self.config.close_timeout;
        match tokio::time::timeout(limit, connection.close()).await {
            Ok(Ok(())) => tracing::info!("Trade stream close handshake complete"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Trade stream close handshake failed"),
            Err(_) => {
                let e = TransportError::CloseTimeout(limit);
                tracing::warn!(error = %e, "Trade stream close handshake abandoned");
            }
        }
    }
}
