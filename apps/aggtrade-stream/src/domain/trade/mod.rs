//! Trade Stream Types
//!
//! Core domain types for the aggregate trade stream: the subscription key
//! that selects a stream, the decoded trade event, and the error produced
//! when a payload cannot be decoded.
//!
//! Prices and quantities stay as the exact strings the venue sent. Numeric
//! coercion belongs to whoever consumes the event.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Quote asset appended to every subscription key.
pub const QUOTE_ASSET: &str = "usdt";

/// Stream channel suffix for aggregate trades.
pub const AGG_TRADE_CHANNEL: &str = "aggTrade";

/// Maximum number of payload bytes retained in a [`DecodeError`].
pub const MAX_ERROR_PAYLOAD_BYTES: usize = 256;

// =============================================================================
// Subscription Key
// =============================================================================

/// Case-normalized identifier selecting which trade stream to receive.
///
/// Built once from operator input and immutable afterwards. The key is the
/// base asset only (`btc`); the quote asset and channel are appended when the
/// stream name is derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Parse and normalize operator input.
    ///
    /// Surrounding whitespace is trimmed and the key is lowercased.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or contains characters that
    /// cannot appear in a stream name.
    pub fn parse(input: &str) -> Result<Self, SubscriptionKeyError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SubscriptionKeyError::Empty);
        }

        if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(SubscriptionKeyError::InvalidCharacter(c));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// The normalized key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stream name for this key, e.g. `btcusdt@aggTrade`.
    #[must_use]
    pub fn stream_name(&self) -> String {
        format!("{}{QUOTE_ASSET}@{AGG_TRADE_CHANNEL}", self.0)
    }

    /// Full stream URL under the given endpoint base.
    #[must_use]
    pub fn stream_url(&self, endpoint: &str) -> String {
        format!("{}/{}", endpoint.trim_end_matches('/'), self.stream_name())
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected subscription key input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionKeyError {
    /// Input was empty or whitespace.
    #[error("subscription key cannot be empty")]
    Empty,
    /// Input contained a character outside `[A-Za-z0-9]`.
    #[error("subscription key contains invalid character {0:?}")]
    InvalidCharacter(char),
}

// =============================================================================
// Trade Event
// =============================================================================

/// A single decoded aggregate trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeEvent {
    /// Trading pair symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Trade price, exactly as sent by the venue.
    pub price: String,
    /// Trade quantity, exactly as sent by the venue.
    pub quantity: String,
    /// Aggregate trade ID.
    pub aggregate_trade_id: u64,
    /// First matched trade ID in this aggregate.
    pub first_trade_id: u64,
    /// Last matched trade ID in this aggregate.
    pub last_trade_id: u64,
    /// Event time (epoch milliseconds).
    pub event_time_millis: i64,
    /// Trade time (epoch milliseconds).
    pub trade_time_millis: i64,
    /// Whether the buyer was the market maker.
    pub is_buyer_maker: bool,
}

impl TradeEvent {
    /// Price as an exact decimal.
    ///
    /// # Errors
    ///
    /// Returns an error if the price string is not a valid decimal.
    pub fn price_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.price.parse()
    }

    /// Quantity as an exact decimal.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity string is not a valid decimal.
    pub fn quantity_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.quantity.parse()
    }

    /// Trade time as a UTC timestamp, if representable.
    #[must_use]
    pub fn trade_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.trade_time_millis)
    }

    /// Event time as a UTC timestamp, if representable.
    #[must_use]
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.event_time_millis)
    }
}

// =============================================================================
// Decode Error
// =============================================================================

/// Reason a payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
    /// Payload was not valid JSON or a required field was missing or mistyped.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Payload decoded but carried an unexpected event type.
    #[error("unexpected event type {0:?}")]
    UnexpectedEventType(String),
}

impl DecodeErrorKind {
    /// Short label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnexpectedEventType(_) => "unexpected_event_type",
        }
    }
}

/// A data frame that could not be turned into a [`TradeEvent`].
///
/// Carries a truncated copy of the offending payload for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} (payload: {payload})")]
pub struct DecodeError {
    /// Offending payload, lossily decoded and truncated.
    pub payload: String,
    /// Human-readable cause.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    /// Build an error from the raw payload bytes.
    #[must_use]
    pub fn new(payload: &[u8], kind: DecodeErrorKind) -> Self {
        let end = payload.len().min(MAX_ERROR_PAYLOAD_BYTES);
        let mut text = String::from_utf8_lossy(&payload[..end]).into_owned();
        if payload.len() > MAX_ERROR_PAYLOAD_BYTES {
            text.push_str("...");
        }

        Self {
            payload: text,
            kind,
        }
    }
}
