//! Channel Sink
//!
//! Hands lifecycle callbacks off to a bounded tokio mpsc channel so that
//! rendering and bookkeeping happen on a separate task.
//!
//! Sends use `try_send`: a full channel drops the event (logged and counted)
//! rather than stalling the connection loop, which must keep answering pings.

use chrono::Utc;
use tokio::sync::mpsc;

use crate::application::ports::EventSink;
use crate::domain::connection::ConnectionState;
use crate::domain::trade::{DecodeError, TradeEvent};
use crate::infrastructure::metrics;

// =============================================================================
// Stream Events
// =============================================================================

/// A lifecycle callback, as delivered to the consumer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A decoded trade.
    Trade(TradeEvent),
    /// The connection state changed.
    Status(ConnectionState),
    /// A data frame could not be decoded.
    DecodeFailed(DecodeError),
}

impl StreamEvent {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Trade(_) => "trade",
            Self::Status(_) => "status",
            Self::DecodeFailed(_) => "decode_failed",
        }
    }
}

// =============================================================================
// Channel Sink
// =============================================================================

/// [`EventSink`] that forwards every callback into a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn forward(&self, event: StreamEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(kind = event.kind(), "Event channel full, dropping event");
                metrics::record_events_dropped(1);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::debug!(kind = event.kind(), "Event channel closed, dropping event");
                metrics::record_events_dropped(1);
            }
        }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: TradeEvent) {
        metrics::record_trade_received(&event.symbol);
        let latency_ms = Utc::now().timestamp_millis() - event.trade_time_millis;
        if let Ok(latency_ms) = u64::try_from(latency_ms) {
            metrics::record_trade_latency(std::time::Duration::from_millis(latency_ms));
        }
        self.forward(StreamEvent::Trade(event));
    }

    fn on_status_change(&self, state: ConnectionState) {
        metrics::set_connection_open(state == ConnectionState::Open);
        if state == ConnectionState::Reconnecting {
            metrics::record_reconnect();
        }
        self.forward(StreamEvent::Status(state));
    }

    fn on_decode_error(&self, error: DecodeError) {
        metrics::record_decode_error(error.kind.label());
        self.forward(StreamEvent::DecodeFailed(error));
    }
}

// =============================================================================
// Tests
// =============================================================================
