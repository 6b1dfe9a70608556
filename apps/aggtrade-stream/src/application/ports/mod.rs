//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Connector` / `Connection`: duplex WebSocket transport to the venue
//! - `WireDecoder`: turns a data frame payload into a `TradeEvent`
//! - `KeepaliveResponder`: answers liveness probes
//! - `ReconnectPolicy`: decides whether and when to reconnect
//! - `EventSink`: receives decoded events and lifecycle notifications

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::connection::{CloseInfo, ConnectionState};
use crate::domain::trade::{DecodeError, TradeEvent};

// =============================================================================
// Transport
// =============================================================================

/// A frame delivered by, or sent to, the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame.
    Text(String),
    /// Binary data frame.
    Binary(Vec<u8>),
    /// Liveness probe.
    Ping(Vec<u8>),
    /// Liveness acknowledgment.
    Pong(Vec<u8>),
    /// Close frame, with code and reason when the peer supplied one.
    Close(Option<CloseInfo>),
}

/// Transport-level failure.
///
/// Every variant is recoverable: the lifecycle routes it into the same
/// close path as a remote-initiated close.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established (DNS, TCP, TLS, handshake).
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    /// Socket or protocol failure on an established connection.
    #[error("transport error: {0}")]
    Io(String),
    /// No frame arrived within the idle timeout.
    #[error("no frames received for {0:?}")]
    IdleTimeout(Duration),
    /// Close handshake did not finish in time.
    #[error("close handshake timed out after {0:?}")]
    CloseTimeout(Duration),
}

/// Opens physical connections to the venue.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectFailed` if the connection cannot be
    /// established.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// A single established duplex connection.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next frame.
    ///
    /// Returns `None` when the stream has ended.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Send a frame and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Start the close handshake and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame cannot be written.
    async fn close(&mut self) -> Result<(), TransportError>;
}

// =============================================================================
// Frame Handling
// =============================================================================

/// Decodes a data frame payload into a trade.
pub trait WireDecoder: Send + Sync {
    /// Decode `payload`. Must not panic on arbitrary input.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` carrying the truncated payload and cause.
    fn decode(&self, payload: &[u8]) -> Result<TradeEvent, DecodeError>;
}

/// Answers transport liveness probes.
pub trait KeepaliveResponder: Send + Sync {
    /// Build the acknowledgment frame for a probe carrying `payload`.
    fn acknowledge(&self, payload: &[u8]) -> Frame;
}

/// Decides whether, and after what delay, to reconnect.
#[cfg_attr(test, mockall::automock)]
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before the next connection attempt, or `None` to stop.
    ///
    /// Implementations must return `None` whenever `shutdown_requested` is
    /// true and must never return a zero delay.
    fn next_delay(&self, code: u16, reason: &str, shutdown_requested: bool) -> Option<Duration>;
}

// =============================================================================
// Event Sink
// =============================================================================

/// Consumer of decoded events and lifecycle notifications.
///
/// Called synchronously, in arrival order, from the task that owns the
/// connection. Implementations must not block; expensive work should be
/// handed off (see `ChannelSink`).
pub trait EventSink: Send + Sync {
    /// A trade was decoded.
    fn on_event(&self, event: TradeEvent);

    /// The connection state changed.
    fn on_status_change(&self, state: ConnectionState);

    /// A data frame could not be decoded and was dropped.
    fn on_decode_error(&self, error: DecodeError);
}
