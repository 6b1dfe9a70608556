//! Stream Status
//!
//! Observable snapshot of the trade stream, fed from [`StreamEvent`]s by the
//! consumer task and read by the health endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::connection::ConnectionState;
use crate::domain::trade::TradeEvent;
use crate::infrastructure::sink::StreamEvent;

/// Shared, thread-safe status of one trade stream.
#[derive(Debug)]
pub struct StreamStatus {
    symbol: String,
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    last_trade: RwLock<Option<TradeEvent>>,
    last_decode_error: RwLock<Option<String>>,
    trades_received: AtomicU64,
    decode_errors: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl StreamStatus {
    /// Create status for the stream subscribed with `symbol`.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: RwLock::new(ConnectionState::Idle),
            last_connected_at: RwLock::new(None),
            last_trade: RwLock::new(None),
            last_decode_error: RwLock::new(None),
            trades_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
        }
    }

    /// Fold one event into the status.
    pub fn apply(&self, event: &StreamEvent) {
        match event {
            StreamEvent::Trade(trade) => {
                self.trades_received.fetch_add(1, Ordering::Relaxed);
                *self.last_trade.write() = Some(trade.clone());
            }
            StreamEvent::Status(state) => self.set_state(*state),
            StreamEvent::DecodeFailed(error) => {
                self.decode_errors.fetch_add(1, Ordering::Relaxed);
                *self.last_decode_error.write() = Some(error.to_string());
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        match state {
            ConnectionState::Open => {
                *self.last_connected_at.write() = Some(Utc::now());
            }
            ConnectionState::Reconnecting => {
                self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Current connection state as last reported.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the stream connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Number of trades received.
    #[must_use]
    pub fn trades_received(&self) -> u64 {
        self.trades_received.load(Ordering::Relaxed)
    }

    /// Point-in-time copy for serialization.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            symbol: self.symbol.clone(),
            state: self.state(),
            last_connected_at: *self.last_connected_at.read(),
            trades_received: self.trades_received(),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            last_trade: self.last_trade.read().clone(),
            last_decode_error: self.last_decode_error.read().clone(),
        }
    }
}

/// Serializable view of [`StreamStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Subscription key.
    pub symbol: String,
    /// Connection state.
    pub state: ConnectionState,
    /// When the connection last opened.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Trades received since start.
    pub trades_received: u64,
    /// Undecodable data frames since start.
    pub decode_errors: u64,
    /// Reconnects scheduled since start.
    pub reconnect_attempts: u64,
    /// Most recent trade.
    pub last_trade: Option<TradeEvent>,
    /// Most recent decode failure.
    pub last_decode_error: Option<String>,
}
